//! ClaimStateStore port - ローカルの claim 状態（1 スロット）
//!
//! プロセスが再起動しても lock token を取り戻せるように、
//! 現在保持している claim を 1 件だけ永続化します。
//!
//! # ライフサイクル
//! - claim で作成
//! - heartbeat で期限を更新
//! - review / block / cancel(InProgress) / complete で削除
//!
//! 削除はリモートの遷移が成功した後に限ります。
//! 先に消すと、まだ有効な lease の唯一の証拠を失うためです。

use async_trait::async_trait;

use crate::domain::claim::ClaimState;

#[derive(Debug, thiserror::Error)]
pub enum ClaimStateError {
    #[error("claim state I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("claim state at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// ClaimStateStore は単一スロットの claim 状態を保存
///
/// ハンドルは明示的に渡します（グローバルな singleton にはしない）。
/// これにより並行するテスト同士が衝突しません。
#[async_trait]
pub trait ClaimStateStore: Send + Sync {
    /// `None` when no claim is held.
    async fn load(&self) -> Result<Option<ClaimState>, ClaimStateError>;

    /// Replaces the slot atomically.
    async fn save(&self, state: &ClaimState) -> Result<(), ClaimStateError>;

    /// Empties the slot. Clearing an empty slot succeeds.
    async fn clear(&self) -> Result<(), ClaimStateError>;
}
