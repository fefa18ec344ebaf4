//! # エンベロープ封緘
//!
//! 署名済みレコードを正規化して教師公開鍵で暗号化し、[`Envelope`] にまとめる。
//!
//! | 方式 | `encrypted_record` の中身 |
//! |------|--------------------------|
//! | `RSA-OAEP-SHA256+AES-256-GCM`（既定） | ラップ済み鍵 \|\| ノンス \|\| AES-GCM暗号文 |
//! | `RSA-OAEP-SHA256` | RSA-OAEP暗号文（2048-bit鍵で平文190バイトまで） |

use std::path::{Path, PathBuf};

use base64::Engine;
use focusguard_crypto::{hybrid_encrypt, oaep_encrypt, RsaPublicKey};
use focusguard_types::{EncryptionAlgorithm, Envelope, SignatureAlgorithm, SignedRecord};

use crate::b64;
use crate::canonical::canonical_record_bytes;
use crate::error::ReportError;
use crate::storage::{ensure_dir, write_atomic, FileMode};

/// 受信者公開鍵によるエンベロープ封緘器
pub struct EnvelopeSealer<'a> {
    recipient: &'a RsaPublicKey,
    algorithm: EncryptionAlgorithm,
}

impl<'a> EnvelopeSealer<'a> {
    pub fn new(recipient: &'a RsaPublicKey, algorithm: EncryptionAlgorithm) -> Self {
        Self {
            recipient,
            algorithm,
        }
    }

    /// 暗号化方式
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// レコードを封緘する。
    ///
    /// 直接暗号化で上限を超える場合は [`ReportError::PlaintextTooLargeForKey`] を返す。
    /// 分割や切り詰めは行わない。
    pub fn seal(&self, record: &SignedRecord) -> Result<Envelope, ReportError> {
        let plaintext = canonical_record_bytes(record)?;
        let ciphertext = match self.algorithm {
            EncryptionAlgorithm::RsaOaepSha256 => oaep_encrypt(self.recipient, &plaintext)?,
            EncryptionAlgorithm::RsaOaepSha256Aes256Gcm => {
                hybrid_encrypt(self.recipient, &plaintext)?
            }
        };
        tracing::debug!(
            algorithm = self.algorithm.tag(),
            record_size = plaintext.len(),
            ciphertext_size = ciphertext.len(),
            "レコードを暗号化しました"
        );

        Ok(Envelope {
            encrypted_record: b64().encode(ciphertext),
            encryption_algorithm_tag: self.algorithm.tag().to_string(),
            signature_algorithm_tag: SignatureAlgorithm::RsaPssSha256.tag().to_string(),
        })
    }
}

/// エンベロープのファイル名。`teacher_report_<YYYYmmdd_HHMMSS>_<8桁hex>.json`
pub fn envelope_file_name() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("teacher_report_{timestamp}_{}.json", &suffix[..8])
}

/// エンベロープを整形JSONでディレクトリに書き出し、書き出したパスを返す。
pub fn write_envelope(dir: &Path, envelope: &Envelope) -> Result<PathBuf, ReportError> {
    ensure_dir(dir)?;
    let json = serde_json::to_vec_pretty(envelope)
        .map_err(|e| ReportError::Storage(format!("エンベロープのシリアライズに失敗: {e}")))?;
    let path = dir.join(envelope_file_name());
    write_atomic(&path, &json, FileMode::Public)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::ReportSigner;
    use crate::test_helpers::{scenario_payload, student_keypair, teacher_keypair};
    use focusguard_types::ReportPayload;

    #[test]
    fn test_hybrid_envelope_fields() {
        let record = ReportSigner::new(student_keypair())
            .unwrap()
            .sign(&scenario_payload())
            .unwrap();
        let sealer = EnvelopeSealer::new(
            teacher_keypair().public_key(),
            EncryptionAlgorithm::RsaOaepSha256Aes256Gcm,
        );
        let envelope = sealer.seal(&record).unwrap();

        assert_eq!(envelope.encryption_algorithm_tag, "RSA-OAEP-SHA256+AES-256-GCM");
        assert_eq!(envelope.signature_algorithm_tag, "RSA-PSS-SHA256");
        let ciphertext = b64().decode(&envelope.encrypted_record).unwrap();
        let plaintext_len = canonical_record_bytes(&record).unwrap().len();
        // ラップ済み鍵256 + ノンス12 + 平文 + タグ16
        assert_eq!(ciphertext.len(), 256 + 12 + plaintext_len + 16);
    }

    /// 署名と公開鍵PEMを含むレコードは2048-bit鍵で直接暗号化できないことを確認
    #[test]
    fn test_direct_mode_rejects_oversized_record() {
        let record = ReportSigner::new(student_keypair())
            .unwrap()
            .sign(&ReportPayload::new())
            .unwrap();
        let sealer = EnvelopeSealer::new(
            teacher_keypair().public_key(),
            EncryptionAlgorithm::RsaOaepSha256,
        );
        match sealer.seal(&record) {
            Err(ReportError::PlaintextTooLargeForKey { size, capacity }) => {
                assert_eq!(capacity, 190);
                assert_eq!(size, canonical_record_bytes(&record).unwrap().len());
            }
            other => panic!("PlaintextTooLargeForKeyを期待しましたが {other:?}"),
        }
    }

    #[test]
    fn test_direct_mode_small_record() {
        let record = SignedRecord {
            payload: ReportPayload::new(),
            signature: "c2ln".into(),
            signer_public_key: "pem".into(),
        };
        let sealer = EnvelopeSealer::new(
            teacher_keypair().public_key(),
            EncryptionAlgorithm::RsaOaepSha256,
        );
        let envelope = sealer.seal(&record).unwrap();
        assert_eq!(envelope.encryption_algorithm_tag, "RSA-OAEP-SHA256");
        assert_eq!(b64().decode(&envelope.encrypted_record).unwrap().len(), 256);
    }

    #[test]
    fn test_write_envelope_file() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = Envelope {
            encrypted_record: "AA==".into(),
            encryption_algorithm_tag: "RSA-OAEP-SHA256".into(),
            signature_algorithm_tag: "RSA-PSS-SHA256".into(),
        };
        let path = write_envelope(&dir.path().join("reports"), &envelope).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("teacher_report_"));
        assert!(name.ends_with(".json"));
        // teacher_report_ + 15 + _ + 8 + .json
        assert_eq!(name.len(), "teacher_report_".len() + 15 + 1 + 8 + ".json".len());

        let read: Envelope = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(read, envelope);
    }
}
