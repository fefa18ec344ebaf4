//! # ファイル保存
//!
//! 鍵とエンベロープの書き込みは全て [`write_atomic`] を通す。
//! 一時ファイルに書き切ってから最終名にリネームするため、
//! 途中でクラッシュしても書きかけのファイルが最終名で見えることはない。

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::ReportError;

/// 書き込むファイルの公開範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// 所有者のみ読み書き可（0600）。秘密鍵用。
    Private,
    /// 通常の権限（umaskに従う）。
    Public,
}

/// サイズ上限付き読み込みのエラー
#[derive(Debug, thiserror::Error)]
pub enum ReadLimitError {
    /// ファイルが存在しない、または読み込めない
    #[error("{} の読み込みに失敗: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    /// 通常ファイルではない
    #[error("{} はファイルではありません", .0.display())]
    NotAFile(PathBuf),
    /// サイズ上限超過
    #[error("ファイルが大きすぎます: {size} bytes (上限: {max})")]
    TooLarge {
        /// 実際のサイズ
        size: u64,
        /// 上限
        max: u64,
    },
}

/// ディレクトリを作成する（既存なら何もしない）。
pub fn ensure_dir(dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ReportError::Storage(format!("{} の作成に失敗: {e}", dir.display())))
}

/// 一時ファイル経由でアトミックに書き込む。既存ファイルは置き換えられる。
pub fn write_atomic(path: &Path, bytes: &[u8], mode: FileMode) -> Result<(), ReportError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| ReportError::Storage(format!("ファイル名がありません: {}", path.display())))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(
        ".{file_name}.{}.tmp",
        uuid::Uuid::new_v4().simple()
    ));

    let result = write_new_file(&tmp_path, bytes, mode)
        .and_then(|()| std::fs::rename(&tmp_path, path));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ReportError::Storage(format!(
            "{} の書き込みに失敗: {e}",
            path.display()
        )));
    }
    Ok(())
}

fn write_new_file(path: &Path, bytes: &[u8], mode: FileMode) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if mode == FileMode::Private {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// サイズ上限付きでファイルを読み込む。ハンドルはどの経路でもスコープ終了時に閉じる。
pub fn read_bounded(path: &Path, max: u64) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(|e| ReadLimitError::Io(path.to_path_buf(), e))?;
    let metadata = file
        .metadata()
        .map_err(|e| ReadLimitError::Io(path.to_path_buf(), e))?;
    if !metadata.is_file() {
        return Err(ReadLimitError::NotAFile(path.to_path_buf()));
    }
    if metadata.len() > max {
        return Err(ReadLimitError::TooLarge {
            size: metadata.len(),
            max,
        });
    }

    // 読み込み中にファイルが伸びた場合に備えて上限+1で打ち切る
    let mut buf = Vec::with_capacity(metadata.len() as usize);
    file.take(max + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ReadLimitError::Io(path.to_path_buf(), e))?;
    if buf.len() as u64 > max {
        return Err(ReadLimitError::TooLarge {
            size: buf.len() as u64,
            max,
        });
    }
    Ok(buf)
}
