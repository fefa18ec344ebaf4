//! # レポート交換 設定
//!
//! 環境変数からの設定読み込み。CLIフラグで個別に上書きできる。
//!
//! | 環境変数 | 既定値 | 内容 |
//! |---------|-------|------|
//! | `FOCUSGUARD_DATA_DIR` | `data` | `keys/` と `reports/` を置くディレクトリ |
//! | `FOCUSGUARD_RSA_BITS` | `2048` | 端末鍵を新規生成するときの鍵長（2048〜16384） |
//! | `FOCUSGUARD_ENCRYPTION` | `hybrid` | `hybrid` または `direct` |

use std::path::{Path, PathBuf};

use focusguard_crypto::{DEFAULT_RSA_BITS, MAX_RSA_BITS, MIN_RSA_BITS};
use focusguard_types::EncryptionAlgorithm;

use crate::error::ReportError;

/// レポート交換の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// データディレクトリ
    pub data_dir: PathBuf,
    /// 端末鍵の鍵長（bits）
    pub rsa_bits: usize,
    /// エンベロープの暗号化方式
    pub encryption: EncryptionAlgorithm,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl ReportConfig {
    /// データディレクトリだけを指定し、他は既定値にする。
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            rsa_bits: DEFAULT_RSA_BITS,
            encryption: EncryptionAlgorithm::default(),
        }
    }

    /// 環境変数から設定を読み込む。
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::with_data_dir(
            lookup("FOCUSGUARD_DATA_DIR").unwrap_or_else(|| "data".to_string()),
        );

        if let Some(bits) = lookup("FOCUSGUARD_RSA_BITS") {
            let bits: usize = bits
                .trim()
                .parse()
                .map_err(|e| ReportError::Config(format!("FOCUSGUARD_RSA_BITS: {e}")))?;
            if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
                return Err(ReportError::Config(format!(
                    "FOCUSGUARD_RSA_BITS は {MIN_RSA_BITS} 以上 {MAX_RSA_BITS} 以下が必要です: {bits}"
                )));
            }
            config.rsa_bits = bits;
        }

        if let Some(mode) = lookup("FOCUSGUARD_ENCRYPTION") {
            config.encryption = parse_encryption(&mode)?;
        }

        Ok(config)
    }

    /// 鍵ファイルのディレクトリ
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    /// エンベロープの出力ディレクトリ
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// データディレクトリ
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// 暗号化方式の指定文字列を解釈する。短縮名 (`hybrid` / `direct`) とタグ文字列の両方を受け付ける。
pub fn parse_encryption(value: &str) -> Result<EncryptionAlgorithm, ReportError> {
    match value.trim() {
        "hybrid" => Ok(EncryptionAlgorithm::RsaOaepSha256Aes256Gcm),
        "direct" => Ok(EncryptionAlgorithm::RsaOaepSha256),
        other => EncryptionAlgorithm::from_tag(other).ok_or_else(|| {
            ReportError::Config(format!(
                "未知の暗号化方式です: {other} (hybrid / direct のいずれか)"
            ))
        }),
    }
}
