//! # 鍵ストア
//!
//! 端末の署名鍵ペアと、レポートの受信者（教師）の公開鍵を管理する。
//!
//! ## ファイル構成（`keys_dir` 配下）
//! | ファイル | 内容 | 権限 |
//! |---------|------|------|
//! | `app_private.pem` | 端末秘密鍵 (PKCS#8) | 0600 |
//! | `app_public.pem` | 端末公開鍵 (SubjectPublicKeyInfo) | 既定 |
//! | `teacher_public.pem` | 教師公開鍵 (SubjectPublicKeyInfo) | 既定 |
//!
//! 端末鍵ペアは初回のレポート生成時に一度だけ作られ、以後は同じ鍵を使い続ける。

use std::path::{Path, PathBuf};

use focusguard_crypto::{
    key_bits, parse_public_key_pem, public_key_fingerprint, public_key_to_pem, RsaKeyPair,
    RsaPublicKey, MIN_RSA_BITS,
};
use focusguard_types::MAX_KEY_FILE_SIZE;

use crate::error::ReportError;
use crate::storage::{ensure_dir, read_bounded, write_atomic, FileMode, ReadLimitError};

/// 端末（学生側）の鍵ペア
pub type DeviceKeyPair = RsaKeyPair;

/// 端末秘密鍵のファイル名
pub const DEVICE_PRIVATE_KEY_FILE: &str = "app_private.pem";
/// 端末公開鍵のファイル名
pub const DEVICE_PUBLIC_KEY_FILE: &str = "app_public.pem";
/// 教師公開鍵のファイル名
pub const TEACHER_PUBLIC_KEY_FILE: &str = "teacher_public.pem";

/// 秘密鍵PEMの読み込み上限（8192-bit鍵でも収まる）
const MAX_PRIVATE_KEY_FILE_SIZE: u64 = 16 * 1024;

/// 検証済みの教師公開鍵。RSAかつ2048 bits以上であることが保証される。
#[derive(Debug, Clone, PartialEq)]
pub struct TeacherPublicKey {
    key: RsaPublicKey,
    fingerprint: String,
}

impl TeacherPublicKey {
    /// PEMバイト列をパースして検証する。
    pub fn from_pem_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.len() as u64 > MAX_KEY_FILE_SIZE {
            return Err(ReportError::KeyFormat(format!(
                "鍵データが大きすぎます: {} bytes (上限: {MAX_KEY_FILE_SIZE})",
                bytes.len()
            )));
        }
        let pem = std::str::from_utf8(bytes)
            .map_err(|_| ReportError::KeyFormat("PEMがUTF-8ではありません".to_string()))?;
        Self::from_public_key(parse_public_key_pem(pem)?)
    }

    /// 公開鍵から構築する。鍵長の下限を検証する。
    pub fn from_public_key(key: RsaPublicKey) -> Result<Self, ReportError> {
        let bits = key_bits(&key);
        if bits < MIN_RSA_BITS {
            return Err(ReportError::KeyStrength {
                bits,
                min: MIN_RSA_BITS,
            });
        }
        let fingerprint = public_key_fingerprint(&key)?;
        Ok(Self { key, fingerprint })
    }

    /// RSA公開鍵
    pub fn key(&self) -> &RsaPublicKey {
        &self.key
    }

    /// モジュラスのビット長
    pub fn bits(&self) -> usize {
        key_bits(&self.key)
    }

    /// SubjectPublicKeyInfo DERのSHA-256（16進）
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// SubjectPublicKeyInfo PEM
    pub fn to_pem(&self) -> Result<String, ReportError> {
        Ok(public_key_to_pem(&self.key)?)
    }
}

/// 鍵ストア。明示的に構築して署名・暗号化側へ渡す。
#[derive(Debug)]
pub struct KeyStore {
    keys_dir: PathBuf,
    rsa_bits: usize,
    counterpart: Option<TeacherPublicKey>,
}

impl KeyStore {
    /// 鍵ディレクトリを開く。保存済みの教師公開鍵があれば読み込む。
    ///
    /// 保存済みの教師公開鍵が壊れている場合は警告を出して未読み込みとして扱う。
    pub fn open(keys_dir: impl Into<PathBuf>, rsa_bits: usize) -> Result<Self, ReportError> {
        let keys_dir = keys_dir.into();
        ensure_dir(&keys_dir)?;

        let mut store = Self {
            keys_dir,
            rsa_bits,
            counterpart: None,
        };
        store.load_persisted_counterpart_key();
        Ok(store)
    }

    /// 鍵ディレクトリ
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    fn device_private_key_path(&self) -> PathBuf {
        self.keys_dir.join(DEVICE_PRIVATE_KEY_FILE)
    }

    fn device_public_key_path(&self) -> PathBuf {
        self.keys_dir.join(DEVICE_PUBLIC_KEY_FILE)
    }

    fn counterpart_key_path(&self) -> PathBuf {
        self.keys_dir.join(TEACHER_PUBLIC_KEY_FILE)
    }

    fn load_persisted_counterpart_key(&mut self) {
        let path = self.counterpart_key_path();
        if !path.exists() {
            return;
        }
        let loaded = read_bounded(&path, MAX_KEY_FILE_SIZE)
            .map_err(|e| ReportError::Storage(e.to_string()))
            .and_then(|bytes| TeacherPublicKey::from_pem_bytes(&bytes));
        match loaded {
            Ok(key) => {
                tracing::debug!(fingerprint = key.fingerprint(), "保存済みの教師公開鍵を読み込みました");
                self.counterpart = Some(key);
            }
            Err(e) => tracing::warn!("保存済みの教師公開鍵の読み込みに失敗: {}", e),
        }
    }

    /// 端末鍵ペアを返す。存在しなければ生成して保存する。
    ///
    /// 秘密鍵だけが残っている場合は公開鍵ファイルを導出し直す。
    pub fn ensure_device_keypair(&self) -> Result<DeviceKeyPair, ReportError> {
        let private_path = self.device_private_key_path();
        let public_path = self.device_public_key_path();

        if private_path.exists() {
            let keypair = load_keypair_file(&private_path)?;
            if !public_path.exists() {
                tracing::warn!("端末公開鍵ファイルが無いため秘密鍵から再生成します");
                write_atomic(&public_path, keypair.public_key_pem()?.as_bytes(), FileMode::Public)?;
            }
            return Ok(keypair);
        }

        tracing::info!(bits = self.rsa_bits, "端末鍵ペアを生成中...");
        let keypair = RsaKeyPair::generate(self.rsa_bits)?;
        write_keypair(&keypair, &private_path, &public_path)?;
        tracing::info!(
            fingerprint = %public_key_fingerprint(keypair.public_key())?,
            "端末鍵ペアを生成しました"
        );
        Ok(keypair)
    }

    /// 教師公開鍵をインポートして保存する。既存の教師公開鍵は置き換えられる。
    pub fn import_counterpart_key(&mut self, bytes: &[u8]) -> Result<TeacherPublicKey, ReportError> {
        let key = match TeacherPublicKey::from_pem_bytes(bytes) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!("教師公開鍵の読み込みに失敗: {}", e);
                return Err(e);
            }
        };

        // 入力PEMの揺れ（PKCS#1、改行コード等）を吸収してSPKI PEMで保存する
        write_atomic(
            &self.counterpart_key_path(),
            key.to_pem()?.as_bytes(),
            FileMode::Public,
        )?;
        tracing::info!(
            fingerprint = key.fingerprint(),
            bits = key.bits(),
            "教師公開鍵を読み込みました"
        );
        self.counterpart = Some(key.clone());
        Ok(key)
    }

    /// ファイルから教師公開鍵をインポートする。
    pub fn import_counterpart_key_file(
        &mut self,
        path: &Path,
    ) -> Result<TeacherPublicKey, ReportError> {
        let bytes = read_bounded(path, MAX_KEY_FILE_SIZE).map_err(|e| match e {
            ReadLimitError::TooLarge { .. } => ReportError::KeyFormat(e.to_string()),
            other => ReportError::Storage(other.to_string()),
        })?;
        self.import_counterpart_key(&bytes)
    }

    /// 教師公開鍵が読み込まれているか
    pub fn counterpart_key_loaded(&self) -> bool {
        self.counterpart.is_some()
    }

    /// 教師公開鍵
    pub fn counterpart_key(&self) -> Option<&TeacherPublicKey> {
        self.counterpart.as_ref()
    }

    /// 端末公開鍵が保存済みであれば読み込む（生成はしない）。
    pub fn device_public_key(&self) -> Result<Option<RsaPublicKey>, ReportError> {
        let path = self.device_public_key_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = read_bounded(&path, MAX_KEY_FILE_SIZE)
            .map_err(|e| ReportError::Storage(e.to_string()))?;
        let pem = std::str::from_utf8(&bytes)
            .map_err(|_| ReportError::KeyFormat("PEMがUTF-8ではありません".to_string()))?;
        Ok(Some(parse_public_key_pem(pem)?))
    }
}

/// 秘密鍵PEMファイルから鍵ペアを読み込む。教師側の復号鍵にも使う。
pub fn load_keypair_file(path: &Path) -> Result<RsaKeyPair, ReportError> {
    let bytes = read_bounded(path, MAX_PRIVATE_KEY_FILE_SIZE).map_err(|e| match e {
        ReadLimitError::TooLarge { .. } => ReportError::KeyFormat(e.to_string()),
        other => ReportError::Storage(other.to_string()),
    })?;
    let pem = std::str::from_utf8(&bytes)
        .map_err(|_| ReportError::KeyFormat("PEMがUTF-8ではありません".to_string()))?;
    Ok(RsaKeyPair::from_private_key_pem(pem)?)
}

/// 鍵ペアを秘密鍵（0600）・公開鍵の2ファイルに保存する。
pub fn write_keypair(
    keypair: &RsaKeyPair,
    private_path: &Path,
    public_path: &Path,
) -> Result<(), ReportError> {
    let private_pem = keypair.private_key_pem()?;
    write_atomic(private_path, private_pem.as_bytes(), FileMode::Private)?;
    write_atomic(public_path, keypair.public_key_pem()?.as_bytes(), FileMode::Public)?;
    Ok(())
}
