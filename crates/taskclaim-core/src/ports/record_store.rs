//! RecordStore port - 共有リモートレコードストア（正本）
//!
//! RecordStore はタスクの正本（source of truth）です。
//! claim プロトコルはこの port の 5 操作だけで成り立っています：
//! - query（フィルタ検索）
//! - get（ID で取得）
//! - update（プロパティの一括更新）
//! - create（レコード作成）
//! - add_comment（コメント追加）
//!
//! # 設計原則
//! - 条件付き書き込み（CAS）は提供されない前提
//! - 書き込みの成功は所有の証明にならない。必ず読み直して検証する
//! - 1 遷移 = 1 回の update（レコード単位で atomic と仮定）

use async_trait::async_trait;

use crate::domain::ids::{RecordId, TaskId};
use crate::domain::property::{PropertyChanges, Record};
use crate::domain::status::TaskStatus;

/// Placeholder substituted for credentials in error text.
pub const REDACTED: &str = "[REDACTED]";

/// Replaces every occurrence of `secret` in `text`.
///
/// Empty secrets leave the text untouched.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, REDACTED)
    }
}

/// Query predicate. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: Option<TaskStatus>,
    pub task_id: Option<TaskId>,
    /// Upper bound on returned records; `None` means all.
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn by_task_id(task_id: &TaskId) -> Self {
        Self {
            task_id: Some(task_id.clone()),
            limit: Some(1),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Store failures. Messages must already be free of credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store (or its transport) rejected the call.
    #[error("{0}")]
    Api(String),

    /// The client used to reach the store is not installed or not runnable.
    #[error("{0}")]
    ClientMissing(String),

    /// The store answered with something that could not be understood.
    #[error("malformed store response: {0}")]
    Malformed(String),

    #[error("record '{0}' not found")]
    NotFound(String),
}

/// RecordStore は共有ストアへの抽象インターフェース
///
/// # Thread Safety
/// - `Send + Sync` を要求（Arc で共有される）
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching `filter`, in store order.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError>;

    /// Fresh read of one record.
    async fn get(&self, id: &RecordId) -> Result<Record, StoreError>;

    /// One batched property update. `Empty` values clear the property.
    async fn update(&self, id: &RecordId, changes: &PropertyChanges) -> Result<(), StoreError>;

    async fn create(&self, properties: &PropertyChanges) -> Result<Record, StoreError>;

    async fn add_comment(&self, id: &RecordId, text: &str) -> Result<(), StoreError>;
}
