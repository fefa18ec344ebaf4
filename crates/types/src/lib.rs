//! # FocusGuard レポート交換 共有型定義
//!
//! 学生側で生成し、教師側で検証するレポートのデータ構造を提供する。
//!
//! ## エンコーディング規則
//! - Base64 (Standard, パディングあり): バイナリデータ（暗号文、署名）
//! - PEM (SubjectPublicKeyInfo): 公開鍵

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// サイズ上限
// ---------------------------------------------------------------------------

/// ペイロードの正規化バイト列の最大サイズ（10KB）。
pub const MAX_REPORT_PAYLOAD_SIZE: usize = 10 * 1024;

/// インポートする公開鍵ファイルの最大サイズ。
pub const MAX_KEY_FILE_SIZE: u64 = 10_000;

/// エンベロープファイルの最大サイズ（64KB）。
/// ペイロード上限 + 署名 + 公開鍵 + Base64膨張を十分に収める。
pub const MAX_ENVELOPE_FILE_SIZE: u64 = 64 * 1024;

// ---------------------------------------------------------------------------
// ペイロード
// ---------------------------------------------------------------------------

/// メトリクス値。JSONのスカラー値のみを許可する。
///
/// `untagged` のためデシリアライズは宣言順に試行される
/// （bool → i64 → u64 → f64 → 文字列）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// 数値として読める場合は `f64` で返す。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Integer(v) => Some(*v as f64),
            MetricValue::Unsigned(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// 非負整数として読める場合は `u64` で返す。
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetricValue::Integer(v) => u64::try_from(*v).ok(),
            MetricValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Bool(v) => write!(f, "{v}"),
            MetricValue::Integer(v) => write!(f, "{v}"),
            MetricValue::Unsigned(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => MetricValue::Integer(v),
            Err(_) => MetricValue::Unsigned(v),
        }
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Integer(i64::from(v))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// メトリクス名 → 値 のフラットなマップ。
/// `BTreeMap` なのでキーは常にバイト順に並ぶ。
pub type ReportPayload = BTreeMap<String, MetricValue>;

/// 集中セッションの集計値。
/// 外部のメトリクス収集側（タイマー・集中判定）が組み立てる典型的なペイロード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusMetrics {
    /// レポート生成時刻 (`%Y-%m-%d %H:%M:%S`)
    pub timestamp: String,
    /// 完了したセッション数
    pub sessions_completed: u64,
    /// 合計集中時間（分）
    pub total_focus_minutes: u64,
    /// 合計の注意散漫回数
    pub total_distractions: u64,
    /// 直近セッションの注意散漫回数
    pub last_session_distractions: u64,
}

impl FocusMetrics {
    /// ペイロード形式に変換する。
    pub fn into_payload(self) -> ReportPayload {
        let mut payload = ReportPayload::new();
        payload.insert("timestamp".into(), self.timestamp.into());
        payload.insert("sessions_completed".into(), self.sessions_completed.into());
        payload.insert("total_focus_minutes".into(), self.total_focus_minutes.into());
        payload.insert("total_distractions".into(), self.total_distractions.into());
        payload.insert(
            "last_session_distractions".into(),
            self.last_session_distractions.into(),
        );
        payload
    }

    /// 検証済みペイロードから読み取る。欠けているフィールドは既定値になる。
    pub fn from_payload(payload: &ReportPayload) -> Self {
        let count = |key: &str| payload.get(key).and_then(MetricValue::as_u64).unwrap_or(0);
        Self {
            timestamp: payload
                .get("timestamp")
                .map(ToString::to_string)
                .unwrap_or_else(|| "N/A".to_string()),
            sessions_completed: count("sessions_completed"),
            total_focus_minutes: count("total_focus_minutes"),
            total_distractions: count("total_distractions"),
            last_session_distractions: count("last_session_distractions"),
        }
    }

    /// 1時間あたりの注意散漫回数。集中時間が0なら `None`。
    pub fn distraction_rate_per_hour(&self) -> Option<f64> {
        if self.total_focus_minutes == 0 {
            return None;
        }
        Some(self.total_distractions as f64 / self.total_focus_minutes as f64 * 60.0)
    }

    /// 注意散漫率から集中品質を判定する。
    pub fn focus_quality(&self) -> Option<FocusQuality> {
        self.distraction_rate_per_hour().map(FocusQuality::from_rate)
    }
}

/// 集中品質の区分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusQuality {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl FocusQuality {
    /// 1時間あたりの注意散漫回数から区分を決める。
    pub fn from_rate(per_hour: f64) -> Self {
        if per_hour < 3.0 {
            FocusQuality::Excellent
        } else if per_hour < 6.0 {
            FocusQuality::Good
        } else if per_hour < 10.0 {
            FocusQuality::Fair
        } else {
            FocusQuality::NeedsImprovement
        }
    }
}

impl fmt::Display for FocusQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FocusQuality::Excellent => "Excellent",
            FocusQuality::Good => "Good",
            FocusQuality::Fair => "Fair",
            FocusQuality::NeedsImprovement => "Needs Improvement",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// 署名済みレコード・エンベロープ
// ---------------------------------------------------------------------------

/// 署名済みレコード。暗号化前の中間形式。
///
/// フィールドの宣言順はキーのバイト順と一致させている。
/// 正規化シリアライズはこの順序に依存する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedRecord {
    /// 署名対象のペイロード
    pub payload: ReportPayload,
    /// Base64エンコードされたRSA-PSS署名
    pub signature: String,
    /// 署名者のSubjectPublicKeyInfo PEM
    pub signer_public_key: String,
}

/// 教師へ受け渡すエンベロープ。ファイル1つにJSONとして保存される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Base64エンコードされた暗号化済みSignedRecord
    pub encrypted_record: String,
    /// 暗号化アルゴリズム識別子（[`EncryptionAlgorithm::tag`]）
    pub encryption_algorithm_tag: String,
    /// 署名アルゴリズム識別子（[`SignatureAlgorithm::tag`]）
    pub signature_algorithm_tag: String,
}

// ---------------------------------------------------------------------------
// アルゴリズム識別子
// ---------------------------------------------------------------------------

/// エンベロープの暗号化方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionAlgorithm {
    /// RSA-OAEP-SHA256でレコード全体を直接暗号化する。
    /// 鍵長に応じた平文上限があり、超えた場合は失敗する。
    RsaOaepSha256,
    /// ランダムなAES-256鍵をRSA-OAEP-SHA256でラップし、
    /// レコード本体はAES-256-GCMで暗号化する。
    #[default]
    RsaOaepSha256Aes256Gcm,
}

impl EncryptionAlgorithm {
    /// エンベロープに記録するタグ文字列。
    pub fn tag(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::RsaOaepSha256 => "RSA-OAEP-SHA256",
            EncryptionAlgorithm::RsaOaepSha256Aes256Gcm => "RSA-OAEP-SHA256+AES-256-GCM",
        }
    }

    /// タグ文字列から方式を選ぶ。未知のタグは `None`。
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RSA-OAEP-SHA256" => Some(EncryptionAlgorithm::RsaOaepSha256),
            "RSA-OAEP-SHA256+AES-256-GCM" => Some(EncryptionAlgorithm::RsaOaepSha256Aes256Gcm),
            _ => None,
        }
    }
}

/// レコードの署名方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA-PSS (MGF1-SHA256, 最大ソルト長) + SHA-256
    #[default]
    RsaPssSha256,
}

impl SignatureAlgorithm {
    /// エンベロープに記録するタグ文字列。
    pub fn tag(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaPssSha256 => "RSA-PSS-SHA256",
        }
    }

    /// タグ文字列から方式を選ぶ。未知のタグは `None`。
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RSA-PSS-SHA256" => Some(SignatureAlgorithm::RsaPssSha256),
            _ => None,
        }
    }
}
