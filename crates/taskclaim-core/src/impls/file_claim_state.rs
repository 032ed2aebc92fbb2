//! FileClaimStateStore - JSON ファイル 1 つに claim 状態を保存
//!
//! # 学習ポイント
//! - 一時ファイルに書いてから rename することで、読み手が半端な JSON を見ない
//! - clear は冪等（ファイルがなくても成功）
//! - 親ディレクトリは save 時に作成

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::domain::claim::ClaimState;
use crate::ports::{ClaimStateError, ClaimStateStore};

pub struct FileClaimStateStore {
    path: PathBuf,
}

impl FileClaimStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn io_error(&self, source: std::io::Error) -> ClaimStateError {
        ClaimStateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl ClaimStateStore for FileClaimStateStore {
    async fn load(&self) -> Result<Option<ClaimState>, ClaimStateError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let state = serde_json::from_slice(&bytes).map_err(|source| {
            tracing::warn!(path = %self.path.display(), error = %source, "claim state unreadable");
            ClaimStateError::Corrupt {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ClaimState) -> Result<(), ClaimStateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(state).map_err(|source| ClaimStateError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, &json).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), task_id = %state.task_id, "claim state saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClaimStateError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "claim state cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
