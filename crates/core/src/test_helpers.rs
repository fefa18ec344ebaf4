//! # テスト用共通ヘルパー
//!
//! RSA鍵生成は重いため、鍵はテストバイナリ内で一度だけ生成して使い回す。

use std::sync::OnceLock;

use focusguard_crypto::{public_key_to_pem, RsaKeyPair, RsaPrivateKey};
use focusguard_types::ReportPayload;

/// 学生端末の鍵ペア
pub fn student_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// 教師の鍵ペア
pub fn teacher_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// 学生・教師のどちらとも無関係な第三者の鍵ペア
pub fn stranger_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// 4096 bitsを超える4608-bit鍵ペア
pub fn large_keypair() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(4608).unwrap())
}

/// 下限未満（1024-bit）の公開鍵PEM
pub fn weak_public_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024).unwrap();
        public_key_to_pem(&key.to_public_key()).unwrap()
    })
}

/// 3セッション・75分・注意散漫5回のペイロード
pub fn scenario_payload() -> ReportPayload {
    let mut payload = ReportPayload::new();
    payload.insert("sessions_completed".into(), 3u64.into());
    payload.insert("total_focus_minutes".into(), 75u64.into());
    payload.insert("total_distractions".into(), 5u64.into());
    payload
}
