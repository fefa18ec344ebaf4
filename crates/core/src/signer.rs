//! # レポート署名
//!
//! ペイロードを正規化し、端末秘密鍵でRSA-PSS-SHA256署名して [`SignedRecord`] を作る。
//! サイズ上限の検査は暗号処理より前に行う。

use base64::Engine;
use focusguard_crypto::pss_sign;
use focusguard_types::{ReportPayload, SignedRecord, MAX_REPORT_PAYLOAD_SIZE};

use crate::b64;
use crate::canonical::canonical_payload_bytes;
use crate::error::ReportError;
use crate::keystore::DeviceKeyPair;

/// 正規化バイト列がサイズ上限以内であることを確認する。
pub fn ensure_payload_size(canonical: &[u8]) -> Result<(), ReportError> {
    if canonical.len() > MAX_REPORT_PAYLOAD_SIZE {
        return Err(ReportError::PayloadTooLarge {
            size: canonical.len(),
            max: MAX_REPORT_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// 端末鍵によるレポート署名器
pub struct ReportSigner<'a> {
    keypair: &'a DeviceKeyPair,
    public_key_pem: String,
}

impl<'a> ReportSigner<'a> {
    /// 署名器を作る。埋め込む公開鍵PEMはここで一度だけ生成する。
    pub fn new(keypair: &'a DeviceKeyPair) -> Result<Self, ReportError> {
        Ok(Self {
            keypair,
            public_key_pem: keypair.public_key_pem()?,
        })
    }

    /// ペイロードに署名する。
    ///
    /// 署名は正規化バイト列に対して行い、レコードには署名者の公開鍵PEMを埋め込む。
    pub fn sign(&self, payload: &ReportPayload) -> Result<SignedRecord, ReportError> {
        let canonical = canonical_payload_bytes(payload)?;
        ensure_payload_size(&canonical)?;

        let signature = pss_sign(self.keypair.private_key(), &canonical)?;
        tracing::debug!(
            payload_size = canonical.len(),
            metrics = payload.len(),
            "ペイロードに署名しました"
        );

        Ok(SignedRecord {
            payload: payload.clone(),
            signature: b64().encode(signature),
            signer_public_key: self.public_key_pem.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{scenario_payload, student_keypair};
    use focusguard_crypto::{parse_public_key_pem, pss_verify};
    use focusguard_types::MetricValue;

    #[test]
    fn test_sign_embeds_verifiable_signature() {
        let signer = ReportSigner::new(student_keypair()).unwrap();
        let payload = scenario_payload();
        let record = signer.sign(&payload).unwrap();

        assert_eq!(record.payload, payload);
        let signer_key = parse_public_key_pem(&record.signer_public_key).unwrap();
        assert_eq!(&signer_key, student_keypair().public_key());

        let signature = b64().decode(&record.signature).unwrap();
        assert_eq!(signature.len(), 256);
        let canonical = canonical_payload_bytes(&payload).unwrap();
        pss_verify(&signer_key, &canonical, &signature).unwrap();
    }

    /// 同じペイロードでも署名は毎回異なることを確認
    #[test]
    fn test_signatures_are_probabilistic() {
        let signer = ReportSigner::new(student_keypair()).unwrap();
        let payload = scenario_payload();
        let a = signer.sign(&payload).unwrap();
        let b = signer.sign(&payload).unwrap();
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn test_empty_payload_is_signable() {
        let signer = ReportSigner::new(student_keypair()).unwrap();
        let record = signer.sign(&ReportPayload::new()).unwrap();
        assert!(record.payload.is_empty());
    }

    /// 正規化後ちょうど上限のペイロードは署名でき、1バイト超過は拒否されることを確認
    #[test]
    fn test_payload_size_boundary() {
        let signer = ReportSigner::new(student_keypair()).unwrap();
        // {"n":"..."} のオーバーヘッドは8バイト
        let at_limit = MAX_REPORT_PAYLOAD_SIZE - 8;

        let mut payload = ReportPayload::new();
        payload.insert("n".into(), MetricValue::Text("a".repeat(at_limit)));
        assert_eq!(
            canonical_payload_bytes(&payload).unwrap().len(),
            MAX_REPORT_PAYLOAD_SIZE
        );
        signer.sign(&payload).unwrap();

        payload.insert("n".into(), MetricValue::Text("a".repeat(at_limit + 1)));
        assert!(matches!(
            signer.sign(&payload),
            Err(ReportError::PayloadTooLarge { size, max })
                if size == MAX_REPORT_PAYLOAD_SIZE + 1 && max == MAX_REPORT_PAYLOAD_SIZE
        ));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let signer = ReportSigner::new(student_keypair()).unwrap();
        let mut payload = ReportPayload::new();
        payload.insert("rate".into(), f64::NAN.into());
        assert!(matches!(
            signer.sign(&payload),
            Err(ReportError::InvalidPayload(_))
        ));
    }
}
