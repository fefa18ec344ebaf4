//! # 正規化シリアライズ
//!
//! 署名対象のバイト列を決める唯一の関数群。署名側と検証側の両方がここを通る。
//!
//! ## 規則
//! - 区切り文字の前後に空白を入れないコンパクトなJSON
//! - オブジェクトのキーはバイト順（`BTreeMap` の走査順、構造体は宣言順をキー順に揃えている）
//! - 整数は小数部なし、浮動小数点数は往復可能な最短表現
//! - 有限でない浮動小数点数（NaN, ±∞）は表現できないため拒否する

use focusguard_types::{MetricValue, ReportPayload, SignedRecord};

use crate::error::ReportError;

/// ペイロードの正規化バイト列。
pub fn canonical_payload_bytes(payload: &ReportPayload) -> Result<Vec<u8>, ReportError> {
    ensure_finite(payload)?;
    serde_json::to_vec(payload).map_err(|e| ReportError::InvalidPayload(e.to_string()))
}

/// 署名済みレコード全体の正規化バイト列。暗号化の入力になる。
pub fn canonical_record_bytes(record: &SignedRecord) -> Result<Vec<u8>, ReportError> {
    ensure_finite(&record.payload)?;
    serde_json::to_vec(record).map_err(|e| ReportError::InvalidPayload(e.to_string()))
}

fn ensure_finite(payload: &ReportPayload) -> Result<(), ReportError> {
    for (name, value) in payload {
        if let MetricValue::Float(v) = value {
            if !v.is_finite() {
                return Err(ReportError::InvalidPayload(format!(
                    "{name}: 有限でない数値はJSONで表現できません ({v})"
                )));
            }
        }
    }
    Ok(())
}
