//! # FocusGuard Report Exchange Core
//!
//! 学生端末で集中度メトリクスに署名・暗号化し、教師側で復号・検証する
//! レポート交換プロトコルを実装する。
//!
//! ## 処理フロー
//! 1. 学生側: 教師公開鍵をインポートする（[`keystore::KeyStore::import_counterpart_key`]）
//! 2. 学生側: ペイロードを端末鍵で署名する（[`signer::ReportSigner::sign`]）
//! 3. 学生側: 署名済みレコードを教師公開鍵で暗号化しエンベロープにする（[`sealer::EnvelopeSealer::seal`]）
//! 4. 教師側: エンベロープを復号し署名を検証する（[`verifier::EnvelopeVerifier::open`]）
//!
//! ## モジュール構成
//! - `canonical`: 署名対象バイト列の正規化
//! - `keystore`: 端末鍵ペアと教師公開鍵の管理
//! - `signer` / `sealer` / `verifier`: プロトコル本体
//! - `service`: 学生側のレポート生成
//! - `storage`: アトミック書き込みとサイズ上限付き読み込み

pub mod canonical;
pub mod config;
pub mod error;
pub mod keystore;
pub mod sealer;
pub mod service;
pub mod signer;
pub mod storage;
pub mod verifier;

#[cfg(test)]
mod test_helpers;

pub use config::ReportConfig;
pub use error::ReportError;
pub use keystore::{load_keypair_file, write_keypair, DeviceKeyPair, KeyStore, TeacherPublicKey};
pub use sealer::{write_envelope, EnvelopeSealer};
pub use service::ReportService;
pub use signer::ReportSigner;
pub use verifier::{read_envelope, EnvelopeVerifier, VerifiedReport};

/// Base64エンジン（Standard）
pub(crate) fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}
