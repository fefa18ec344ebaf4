//! # RSA-PSS署名
//!
//! MGF1-SHA256、ソルト長は鍵長から決まる最大値（emLen - hLen - 2）を使う。
//! 署名側・検証側の双方が同じ規則でソルト長を導出する。

use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::{sha256, CryptoError};

/// SHA-256の出力長
const SHA256_LEN: usize = 32;

/// 鍵長に対するPSSの最大ソルト長。
pub fn pss_max_salt_len(key_bits: usize) -> usize {
    let em_len = (key_bits.saturating_sub(1) + 7) / 8;
    em_len.saturating_sub(SHA256_LEN + 2)
}

/// メッセージのSHA-256ダイジェストにRSA-PSS署名する。
/// パディングは確率的なので、同じ入力でも毎回異なる署名になる。
pub fn pss_sign(private_key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let digest = sha256(message);
    let salt_len = pss_max_salt_len(private_key.n().bits());
    private_key
        .sign_with_rng(
            &mut rand::rngs::OsRng,
            Pss::new_with_salt::<Sha256>(salt_len),
            &digest,
        )
        .map_err(|e| CryptoError::SignError(e.to_string()))
}

/// RSA-PSS署名を検証する。
pub fn pss_verify(
    public_key: &RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let digest = sha256(message);
    let salt_len = pss_max_salt_len(public_key.n().bits());
    public_key
        .verify(Pss::new_with_salt::<Sha256>(salt_len), &digest, signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}
