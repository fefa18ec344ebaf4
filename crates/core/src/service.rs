//! # 学生側レポート生成
//!
//! 鍵ストア・署名器・封緘器をまとめ、ペイロードから教師宛てエンベロープファイルを作る。

use std::path::{Path, PathBuf};

use focusguard_types::ReportPayload;

use crate::canonical::canonical_payload_bytes;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::keystore::{KeyStore, TeacherPublicKey};
use crate::sealer::{write_envelope, EnvelopeSealer};
use crate::signer::{ensure_payload_size, ReportSigner};

/// 学生側のレポート生成サービス
#[derive(Debug)]
pub struct ReportService {
    config: ReportConfig,
    key_store: KeyStore,
}

impl ReportService {
    /// 設定に従って鍵ストアを開く。
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let key_store = KeyStore::open(config.keys_dir(), config.rsa_bits)?;
        Ok(Self { config, key_store })
    }

    /// 設定
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// 鍵ストア
    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    /// 教師公開鍵ファイルをインポートする。
    pub fn import_teacher_key_file(&mut self, path: &Path) -> Result<TeacherPublicKey, ReportError> {
        self.key_store.import_counterpart_key_file(path)
    }

    /// レポートを生成し、書き出したエンベロープのパスを返す。
    ///
    /// 教師公開鍵が未読み込みなら何も書かずに [`ReportError::CounterpartKeyMissing`] を返す。
    /// サイズ超過も鍵生成より前に検出する。
    pub fn generate_report(&self, payload: &ReportPayload) -> Result<PathBuf, ReportError> {
        let teacher_key = self
            .key_store
            .counterpart_key()
            .ok_or(ReportError::CounterpartKeyMissing)?;
        ensure_payload_size(&canonical_payload_bytes(payload)?)?;

        let keypair = self.key_store.ensure_device_keypair()?;
        let record = ReportSigner::new(&keypair)?.sign(payload)?;
        let envelope =
            EnvelopeSealer::new(teacher_key.key(), self.config.encryption).seal(&record)?;
        let path = write_envelope(&self.config.reports_dir(), &envelope)?;

        tracing::info!(
            path = %path.display(),
            algorithm = self.config.encryption.tag(),
            "レポートを生成しました"
        );
        Ok(path)
    }
}
