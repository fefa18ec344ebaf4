//! # レポート交換 エラー型
//!
//! 署名・暗号化・検証の全経路で共通のエラー型。
//! 暗号処理の失敗は握りつぶさず、必ずいずれかのバリアントとして呼び出し側に返す。

use focusguard_crypto::CryptoError;

/// レポート交換のエラー型。
///
/// - 鍵の読み込み・検証: `KeyFormat` / `KeyType` / `KeyStrength`（正しい鍵を再インポートすれば回復）
/// - サイズ制約: `PayloadTooLarge` / `PlaintextTooLargeForKey`（同じ入力での再試行では回復しない）
/// - 完全性・真正性: `Decryption` / `MalformedRecord` / `SignatureVerification` 等（そのエンベロープは破棄）
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 鍵データのパースに失敗
    #[error("鍵の形式が不正です: {0}")]
    KeyFormat(String),
    /// RSA公開鍵ではない
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
    /// ペイロードの正規化バイト列がサイズ上限を超えた
    #[error("ペイロードが大きすぎます: {size} bytes (上限: {max})")]
    PayloadTooLarge {
        /// 正規化後のサイズ
        size: usize,
        /// 上限
        max: usize,
    },
    /// シリアライズ済みレコードが受信者鍵で直接暗号化できるサイズを超えた
    #[error("レコードが受信者鍵の暗号化上限を超えています: {size} bytes (上限: {capacity})")]
    PlaintextTooLargeForKey {
        /// レコードのサイズ
        size: usize,
        /// 受信者鍵で暗号化できる最大サイズ
        capacity: usize,
    },
    /// 復号に失敗（秘密鍵の誤り、またはエンベロープの破損）
    #[error("復号に失敗しました（秘密鍵の誤り、またはエンベロープの破損）")]
    Decryption,
    /// 復号結果が署名済みレコードの形をしていない
    #[error("署名済みレコードの形式が不正です: {0}")]
    MalformedRecord(String),
    /// 署名検証に失敗
    #[error("署名検証に失敗しました")]
    SignatureVerification,
    /// 信頼リストにない署名者
    #[error("信頼されていない署名者です: {0}")]
    UntrustedSigner(String),
    /// エンベロープファイル自体の形式が不正
    #[error("エンベロープの形式が不正です: {0}")]
    MalformedEnvelope(String),
    /// 未対応のアルゴリズムタグ
    #[error("未対応のアルゴリズムです: {0}")]
    UnsupportedAlgorithm(String),
    /// ペイロードの値がJSONとして表現できない
    #[error("ペイロードが不正です: {0}")]
    InvalidPayload(String),
    /// 教師の公開鍵が未インポート
    #[error("教師の公開鍵が読み込まれていません")]
    CounterpartKeyMissing,
    /// 鍵生成に失敗
    #[error("鍵生成に失敗しました: {0}")]
    KeyGeneration(String),
    /// 署名生成に失敗
    #[error("署名生成に失敗しました: {0}")]
    Signing(String),
    /// 暗号化に失敗
    #[error("暗号化に失敗しました: {0}")]
    Encryption(String),
    /// ファイル操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 設定値が不正
    #[error("設定が不正です: {0}")]
    Config(String),
}

impl ReportError {
    /// エンベロープが信頼できないことを示すエラーか。
    /// これらは自動で再試行せず、新しいレポートを依頼する。
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportError::Decryption
                | ReportError::MalformedRecord(_)
                | ReportError::SignatureVerification
                | ReportError::UntrustedSigner(_)
                | ReportError::MalformedEnvelope(_)
                | ReportError::UnsupportedAlgorithm(_)
        )
    }
}

impl From<CryptoError> for ReportError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyFormat(msg) | CryptoError::KeyEncoding(msg) => ReportError::KeyFormat(msg),
            CryptoError::KeyType(msg) => ReportError::KeyType(msg),
            CryptoError::KeyStrength { bits, min } => ReportError::KeyStrength { bits, min },
            CryptoError::KeyGeneration(msg) => ReportError::KeyGeneration(msg),
            CryptoError::PlaintextTooLarge { size, capacity } => {
                ReportError::PlaintextTooLargeForKey { size, capacity }
            }
            CryptoError::EncryptError => {
                ReportError::Encryption("RSA-OAEP / AES-GCM による暗号化に失敗".to_string())
            }
            CryptoError::DecryptError => ReportError::Decryption,
            CryptoError::SignError(msg) => ReportError::Signing(msg),
            CryptoError::SignatureVerifyError => ReportError::SignatureVerification,
        }
    }
}
