//! テスト用の鍵フィクスチャ。RSA鍵生成は重いのでテストバイナリ内で使い回す。

use std::sync::OnceLock;

use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::RsaKeyPair;

/// 2048-bit鍵ペア（署名者・受信者の両方に使う）
pub(crate) fn device_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// `device_keypair` とは別の2048-bit鍵ペア
pub(crate) fn other_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// 4096 bitsを超える4608-bit鍵ペア
pub(crate) fn large_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(4608).unwrap())
}

/// 下限未満の1024-bit公開鍵
pub(crate) fn weak_public_key() -> &'static RsaPublicKey {
    static KEY: OnceLock<RsaPublicKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024)
            .unwrap()
            .to_public_key()
    })
}
