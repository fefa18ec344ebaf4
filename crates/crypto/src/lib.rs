//! # FocusGuard 暗号処理
//!
//! 学生レポートの署名・暗号化に使う暗号プリミティブを提供する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 署名 | RSA-PSS (MGF1-SHA256, 最大ソルト長) |
//! | 直接暗号化 | RSA-OAEP-SHA256 |
//! | ハイブリッド暗号化 | RSA-OAEP-SHA256 鍵ラップ + AES-256-GCM |
//! | ハッシュ | SHA-256 |

pub mod encryption;
pub mod keys;
pub mod signature;

#[cfg(test)]
pub(crate) mod test_support;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};

pub use encryption::{
    hybrid_decrypt, hybrid_encrypt, oaep_capacity, oaep_decrypt, oaep_encrypt,
};
pub use keys::{
    key_bits, parse_private_key_pem, parse_public_key_pem, public_key_fingerprint,
    public_key_to_pem, RsaKeyPair, DEFAULT_RSA_BITS, MAX_RSA_BITS, MIN_RSA_BITS,
};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use signature::{pss_max_salt_len, pss_sign, pss_verify};

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 鍵データのパースに失敗
    #[error("鍵の形式が不正です: {0}")]
    KeyFormat(String),
    /// 期待した方式（RSA公開鍵）ではない鍵
    #[error("鍵の種類が不正です: {0}")]
    KeyType(String),
    /// 鍵長が下限未満
    #[error("鍵長が不足しています: {bits} bits (最小: {min})")]
    KeyStrength {
        /// 実際の鍵長
        bits: usize,
        /// 下限
        min: usize,
    },
    /// 鍵生成に失敗
    #[error("鍵生成に失敗しました: {0}")]
    KeyGeneration(String),
    /// 鍵のエンコードに失敗
    #[error("鍵のエンコードに失敗しました: {0}")]
    KeyEncoding(String),
    /// 平文が受信者鍵で直接暗号化できるサイズを超えている
    #[error("平文が鍵の暗号化上限を超えています: {size} bytes (上限: {capacity})")]
    PlaintextTooLarge {
        /// 平文サイズ
        size: usize,
        /// 鍵で暗号化できる最大サイズ
        capacity: usize,
    },
    /// 暗号化に失敗
    #[error("暗号化に失敗しました")]
    EncryptError,
    /// 復号に失敗
    #[error("復号に失敗しました")]
    DecryptError,
    /// 署名生成に失敗
    #[error("署名生成に失敗しました: {0}")]
    SignError(String),
    /// 署名検証に失敗
    #[error("RSA-PSS署名検証に失敗しました")]
    SignatureVerifyError,
}

/// 対称鍵（AES-256用、32バイト）
pub type SymmetricKey = [u8; 32];

/// AES-GCMのノンス長（バイト）
pub const NONCE_LEN: usize = 12;

/// AES-256-GCMによる暗号化。
pub fn aes_gcm_encrypt(
    key: &SymmetricKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptError)?;
    let nonce = Nonce::from_slice(nonce);
    cipher.encrypt(nonce, plaintext).map_err(|_| CryptoError::EncryptError)
}

/// AES-256-GCMによる復号。
pub fn aes_gcm_decrypt(
    key: &SymmetricKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::DecryptError)?;
    let nonce = Nonce::from_slice(nonce);
    cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::DecryptError)
}

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
