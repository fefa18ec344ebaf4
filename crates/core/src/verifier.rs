//! # エンベロープ検証
//!
//! 教師側でエンベロープを復号し、埋め込まれた署名を検証してペイロードを取り出す。
//!
//! ## 検証手順
//! 1. アルゴリズムタグの確認（未知のタグは `UnsupportedAlgorithm`）
//! 2. 教師秘密鍵で復号（失敗は `Decryption`）
//! 3. 署名済みレコードとしてパース（失敗は `MalformedRecord`）
//! 4. ペイロードを署名時と同じ関数で正規化
//! 5. 埋め込み公開鍵でRSA-PSS署名を検証（失敗は `SignatureVerification`）
//! 6. 信頼リストが設定されていれば署名者のフィンガープリントを照合（`UntrustedSigner`）
//!
//! 埋め込み公開鍵による検証は「レコードが改ざんされていないこと」を保証するが、
//! 「どの端末が署名したか」は保証しない。署名者を固定する場合は
//! [`EnvelopeVerifier::with_trusted_signers`] を使う。

use std::collections::HashSet;
use std::path::Path;

use base64::Engine;
use focusguard_crypto::{
    hybrid_decrypt, oaep_decrypt, parse_public_key_pem, pss_verify, public_key_fingerprint,
    RsaKeyPair,
};
use focusguard_types::{
    EncryptionAlgorithm, Envelope, ReportPayload, SignatureAlgorithm, SignedRecord,
    MAX_ENVELOPE_FILE_SIZE,
};

use crate::b64;
use crate::canonical::canonical_payload_bytes;
use crate::error::ReportError;
use crate::storage::read_bounded;

/// 検証済みレポート
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedReport {
    /// 署名検証済みのペイロード
    pub payload: ReportPayload,
    /// 署名者公開鍵のフィンガープリント（SubjectPublicKeyInfo DERのSHA-256）
    pub signer_fingerprint: String,
}

/// 教師秘密鍵によるエンベロープ検証器
pub struct EnvelopeVerifier<'a> {
    keypair: &'a RsaKeyPair,
    /// 信頼する署名者のフィンガープリント集合（Noneの場合は全署名者を受け入れ）
    trusted_signers: Option<HashSet<String>>,
}

impl<'a> EnvelopeVerifier<'a> {
    pub fn new(keypair: &'a RsaKeyPair) -> Self {
        Self {
            keypair,
            trusted_signers: None,
        }
    }

    /// 受け入れる署名者をフィンガープリントで限定する。大文字小文字は区別しない。
    pub fn with_trusted_signers<I, S>(mut self, fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trusted_signers = Some(
            fingerprints
                .into_iter()
                .map(|fp| fp.as_ref().trim().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// エンベロープを開いてペイロードを返す。
    pub fn open(&self, envelope: &Envelope) -> Result<ReportPayload, ReportError> {
        self.open_verified(envelope).map(|report| report.payload)
    }

    /// エンベロープを開き、ペイロードと署名者のフィンガープリントを返す。
    pub fn open_verified(&self, envelope: &Envelope) -> Result<VerifiedReport, ReportError> {
        let encryption = EncryptionAlgorithm::from_tag(&envelope.encryption_algorithm_tag)
            .ok_or_else(|| {
                ReportError::UnsupportedAlgorithm(envelope.encryption_algorithm_tag.clone())
            })?;
        SignatureAlgorithm::from_tag(&envelope.signature_algorithm_tag).ok_or_else(|| {
            ReportError::UnsupportedAlgorithm(envelope.signature_algorithm_tag.clone())
        })?;

        let ciphertext = b64()
            .decode(&envelope.encrypted_record)
            .map_err(|_| ReportError::Decryption)?;
        let plaintext = match encryption {
            EncryptionAlgorithm::RsaOaepSha256 => {
                oaep_decrypt(self.keypair.private_key(), &ciphertext)?
            }
            EncryptionAlgorithm::RsaOaepSha256Aes256Gcm => {
                hybrid_decrypt(self.keypair.private_key(), &ciphertext)?
            }
        };
        tracing::debug!(algorithm = encryption.tag(), "エンベロープを復号しました");

        let record: SignedRecord = serde_json::from_slice(&plaintext)
            .map_err(|e| ReportError::MalformedRecord(e.to_string()))?;
        let canonical = canonical_payload_bytes(&record.payload)
            .map_err(|e| ReportError::MalformedRecord(e.to_string()))?;

        let signer_key = parse_public_key_pem(&record.signer_public_key)
            .map_err(|e| ReportError::MalformedRecord(format!("署名者公開鍵: {e}")))?;
        let signature = b64()
            .decode(&record.signature)
            .map_err(|_| ReportError::SignatureVerification)?;
        pss_verify(&signer_key, &canonical, &signature)?;

        let signer_fingerprint = public_key_fingerprint(&signer_key)?;
        if let Some(trusted) = &self.trusted_signers {
            if !trusted.contains(&signer_fingerprint) {
                tracing::warn!(
                    fingerprint = %signer_fingerprint,
                    "信頼リストにない署名者のレポートを拒否しました"
                );
                return Err(ReportError::UntrustedSigner(signer_fingerprint));
            }
        }
        tracing::info!(
            fingerprint = %signer_fingerprint,
            metrics = record.payload.len(),
            "レポートの署名を検証しました"
        );

        Ok(VerifiedReport {
            payload: record.payload,
            signer_fingerprint,
        })
    }
}

/// エンベロープファイルを読み込む。サイズ超過・JSON不正は `MalformedEnvelope`。
pub fn read_envelope(path: &Path) -> Result<Envelope, ReportError> {
    let bytes = read_bounded(path, MAX_ENVELOPE_FILE_SIZE)
        .map_err(|e| ReportError::MalformedEnvelope(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ReportError::MalformedEnvelope(e.to_string()))
}
