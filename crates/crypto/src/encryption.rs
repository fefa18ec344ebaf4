//! # RSA-OAEP暗号化・ハイブリッド暗号化
//!
//! ## 直接暗号化
//! 平文をRSA-OAEP-SHA256でそのまま暗号化する。平文の上限は
//! `モジュラス長 - 2 * 32 - 2` バイト（2048-bit鍵で190バイト）。
//! 上限を超えた平文は分割も切り詰めもせず [`CryptoError::PlaintextTooLarge`] で失敗する。
//!
//! ## ハイブリッド暗号化
//! ```text
//! key    = random(32)
//! nonce  = random(12)
//! output = RSA-OAEP-SHA256(recipient, key) || nonce || AES-256-GCM(key, nonce, plaintext)
//! ```
//! ラップ済み鍵の長さは受信者鍵のモジュラス長と等しい。

use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::{aes_gcm_decrypt, aes_gcm_encrypt, CryptoError, SymmetricKey, NONCE_LEN};

/// OAEP-SHA256のパディングオーバーヘッド（2 * hLen + 2）
const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// AES-GCM認証タグ長
const GCM_TAG_LEN: usize = 16;

/// 公開鍵で直接暗号化できる平文の最大バイト数。
pub fn oaep_capacity(public_key: &RsaPublicKey) -> usize {
    public_key.size().saturating_sub(OAEP_SHA256_OVERHEAD)
}

/// RSA-OAEP-SHA256で直接暗号化する。暗号文長はモジュラス長と等しい。
pub fn oaep_encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let capacity = oaep_capacity(public_key);
    if plaintext.len() > capacity {
        return Err(CryptoError::PlaintextTooLarge {
            size: plaintext.len(),
            capacity,
        });
    }
    public_key
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| CryptoError::EncryptError)
}

/// RSA-OAEP-SHA256で復号する。
pub fn oaep_decrypt(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    private_key
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| CryptoError::DecryptError)
}

/// ハイブリッド暗号化。平文サイズの上限はない。
pub fn hybrid_encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut key: SymmetricKey = [0u8; 32];
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let wrapped_key = oaep_encrypt(public_key, &key)?;
    let ciphertext = aes_gcm_encrypt(&key, &nonce, plaintext)?;

    let mut out = Vec::with_capacity(wrapped_key.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&wrapped_key);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// ハイブリッド復号。どの段階の失敗も [`CryptoError::DecryptError`] になる。
pub fn hybrid_decrypt(private_key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let wrapped_len = private_key.size();
    if data.len() < wrapped_len + NONCE_LEN + GCM_TAG_LEN {
        return Err(CryptoError::DecryptError);
    }
    let (wrapped_key, rest) = data.split_at(wrapped_len);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key: SymmetricKey = oaep_decrypt(private_key, wrapped_key)?
        .try_into()
        .map_err(|_| CryptoError::DecryptError)?;
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::DecryptError)?;
    aes_gcm_decrypt(&key, &nonce, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{device_keypair, other_keypair};

    #[test]
    fn test_oaep_capacity_2048() {
        assert_eq!(oaep_capacity(device_keypair().public_key()), 190);
    }

    /// 上限ちょうどは暗号化でき、1バイト超過は PlaintextTooLarge になることを確認
    #[test]
    fn test_oaep_capacity_boundary() {
        let kp = device_keypair();
        let at_limit = vec![0x42u8; 190];
        let ciphertext = oaep_encrypt(kp.public_key(), &at_limit).unwrap();
        assert_eq!(ciphertext.len(), 256);
        assert_eq!(oaep_decrypt(kp.private_key(), &ciphertext).unwrap(), at_limit);

        let over = vec![0x42u8; 191];
        match oaep_encrypt(kp.public_key(), &over) {
            Err(CryptoError::PlaintextTooLarge { size, capacity }) => {
                assert_eq!(size, 191);
                assert_eq!(capacity, 190);
            }
            other => panic!("PlaintextTooLargeを期待しましたが {other:?}"),
        }
    }

    #[test]
    fn test_oaep_wrong_key_fails() {
        let ciphertext = oaep_encrypt(device_keypair().public_key(), b"secret").unwrap();
        assert!(matches!(
            oaep_decrypt(other_keypair().private_key(), &ciphertext),
            Err(CryptoError::DecryptError)
        ));
    }

    /// 鍵の直接暗号化上限を大きく超える平文もハイブリッド方式なら扱えることを確認
    #[test]
    fn test_hybrid_roundtrip_large_plaintext() {
        let kp = device_keypair();
        let plaintext = vec![0x5au8; 4096];
        let sealed = hybrid_encrypt(kp.public_key(), &plaintext).unwrap();
        assert_eq!(sealed.len(), 256 + NONCE_LEN + plaintext.len() + GCM_TAG_LEN);
        assert_eq!(hybrid_decrypt(kp.private_key(), &sealed).unwrap(), plaintext);
    }

    /// ラップ鍵・ノンス・暗号文のどこを改ざんしても復号に失敗することを確認
    #[test]
    fn test_hybrid_detects_tampering() {
        let kp = device_keypair();
        let sealed = hybrid_encrypt(kp.public_key(), b"focus metrics").unwrap();
        for idx in [0, 128, 255, 256, 267, 268, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[idx] ^= 0x80;
            assert!(
                matches!(
                    hybrid_decrypt(kp.private_key(), &tampered),
                    Err(CryptoError::DecryptError)
                ),
                "offset {idx} の改ざんが検出されませんでした"
            );
        }
    }

    #[test]
    fn test_hybrid_rejects_short_input() {
        let kp = device_keypair();
        assert!(matches!(
            hybrid_decrypt(kp.private_key(), &[0u8; 100]),
            Err(CryptoError::DecryptError)
        ));
    }

    #[test]
    fn test_hybrid_wrong_key_fails() {
        let sealed = hybrid_encrypt(device_keypair().public_key(), b"secret").unwrap();
        assert!(matches!(
            hybrid_decrypt(other_keypair().private_key(), &sealed),
            Err(CryptoError::DecryptError)
        ));
    }
}
