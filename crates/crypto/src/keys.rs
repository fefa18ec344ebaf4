//! # RSA鍵の生成・PEM入出力・検証
//!
//! 秘密鍵はPKCS#8 PEM、公開鍵はSubjectPublicKeyInfo PEMで入出力する。
//! 読み込み時はPKCS#1 PEM（`RSA PRIVATE KEY` / `RSA PUBLIC KEY`）も受け付ける。

use std::ops::Deref;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::der::pem;
use rsa::pkcs8::spki::SubjectPublicKeyInfoRef;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::{sha256, CryptoError};

/// 受け付けるRSA鍵長の下限（bits）
pub const MIN_RSA_BITS: usize = 2048;

/// 受け付けるRSA鍵長の上限（bits）
pub const MAX_RSA_BITS: usize = 16384;

/// 新規生成するRSA鍵長の既定値（bits）
pub const DEFAULT_RSA_BITS: usize = 2048;

/// RSA鍵ペア。秘密鍵と、そこから導出した公開鍵を保持する。
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RsaKeyPair {
    /// 指定した鍵長で新しい鍵ペアを生成する（公開指数 65537）。
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        ensure_strength(bits)?;
        let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    /// 既存の秘密鍵から鍵ペアを構築する。鍵長の下限を検証する。
    pub fn from_private_key(private_key: RsaPrivateKey) -> Result<Self, CryptoError> {
        ensure_strength(private_key.n().bits())?;
        let public_key = private_key.to_public_key();
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// PEM文字列から鍵ペアを読み込む。
    pub fn from_private_key_pem(pem: &str) -> Result<Self, CryptoError> {
        Self::from_private_key(parse_private_key_pem(pem)?)
    }

    /// 秘密鍵
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// 公開鍵
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// モジュラスのビット長
    pub fn bits(&self) -> usize {
        key_bits(&self.public_key)
    }

    /// 秘密鍵をPKCS#8 PEMで出力する。戻り値はドロップ時にゼロ化される。
    pub fn private_key_pem(&self) -> Result<impl Deref<Target = String>, CryptoError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))
    }

    /// 公開鍵をSubjectPublicKeyInfo PEMで出力する。
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        public_key_to_pem(&self.public_key)
    }
}

/// モジュラスのビット長
pub fn key_bits(key: &RsaPublicKey) -> usize {
    key.n().bits()
}

/// 公開鍵をSubjectPublicKeyInfo PEMで出力する。
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, CryptoError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))
}

/// 公開鍵のフィンガープリント。SubjectPublicKeyInfo DERのSHA-256を16進で返す。
pub fn public_key_fingerprint(key: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    Ok(hex::encode(sha256(der.as_bytes())))
}

/// PEM公開鍵をパースし、RSAであること・鍵長を検証する。
///
/// `rsa` の `RsaPublicKey::new` は4096 bitsを超える鍵を拒否するため、
/// DERを直接デコードして [`MAX_RSA_BITS`] までの鍵を受け付ける。
///
/// - パース不能 → [`CryptoError::KeyFormat`]
/// - RSA以外の公開鍵、または秘密鍵 → [`CryptoError::KeyType`]
/// - 2048 bits未満 → [`CryptoError::KeyStrength`]
pub fn parse_public_key_pem(pem_text: &str) -> Result<RsaPublicKey, CryptoError> {
    let label = pem_label(pem_text)
        .ok_or_else(|| CryptoError::KeyFormat("PEMの開始行が見つかりません".to_string()))?;

    match label {
        "PUBLIC KEY" | "RSA PUBLIC KEY" => {}
        l if l.ends_with("PRIVATE KEY") => {
            return Err(CryptoError::KeyType(
                "公開鍵が必要ですが秘密鍵が渡されました".to_string(),
            ))
        }
        other => {
            return Err(CryptoError::KeyFormat(format!("未対応のPEMラベル: {other}")));
        }
    }

    let (_, der) = pem::decode_vec(pem_text.trim_start().as_bytes())
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;

    if label == "RSA PUBLIC KEY" {
        return public_key_from_pkcs1_der(&der);
    }

    let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice())
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
    if spki.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(CryptoError::KeyType(format!(
            "RSA以外の公開鍵です (OID {})",
            spki.algorithm.oid
        )));
    }
    let pkcs1_der = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| CryptoError::KeyFormat("公開鍵のビット列が不正です".to_string()))?;
    public_key_from_pkcs1_der(pkcs1_der)
}

/// PKCS#1 `RSAPublicKey` DERから鍵を組み立てる。
fn public_key_from_pkcs1_der(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let raw = rsa::pkcs1::RsaPublicKey::try_from(der)
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
    let n = BigUint::from_bytes_be(raw.modulus.as_bytes());
    let e = BigUint::from_bytes_be(raw.public_exponent.as_bytes());
    ensure_strength(n.bits())?;
    RsaPublicKey::new_with_max_size(n, e, MAX_RSA_BITS)
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// PEM秘密鍵（PKCS#8 または PKCS#1）をパースする。鍵長の検証は呼び出し側で行う。
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    match pem_label(pem) {
        Some("PRIVATE KEY") => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| match e {
            rsa::pkcs8::Error::PublicKey(rsa::pkcs8::spki::Error::OidUnknown { oid }) => {
                CryptoError::KeyType(format!("RSA以外の秘密鍵です (OID {oid})"))
            }
            other => CryptoError::KeyFormat(other.to_string()),
        }),
        Some("RSA PRIVATE KEY") => RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| CryptoError::KeyFormat(e.to_string())),
        Some("ENCRYPTED PRIVATE KEY") => Err(CryptoError::KeyFormat(
            "パスフレーズ付き秘密鍵には対応していません".to_string(),
        )),
        Some(other) => Err(CryptoError::KeyType(format!("秘密鍵ではありません: {other}"))),
        None => Err(CryptoError::KeyFormat(
            "PEMの開始行が見つかりません".to_string(),
        )),
    }
}

fn ensure_strength(bits: usize) -> Result<(), CryptoError> {
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::KeyStrength {
            bits,
            min: MIN_RSA_BITS,
        });
    }
    if bits > MAX_RSA_BITS {
        return Err(CryptoError::KeyFormat(format!(
            "鍵長が上限を超えています: {bits} bits (上限: {MAX_RSA_BITS})"
        )));
    }
    Ok(())
}

/// `-----BEGIN <label>-----` からラベルを取り出す。
fn pem_label(pem: &str) -> Option<&str> {
    pem.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())?
        .strip_prefix("-----BEGIN ")?
        .strip_suffix("-----")
}
