//! TaskService - コマンド層の共通部分
//!
//! ライフサイクル遷移ごとの操作は `claim.rs`, `review.rs` などに分けて
//! `impl TaskService` を追加しています。このファイルは全操作が共有する手順を持ちます：
//! 1. task id をレコードに解決（失敗は NotFound）
//! 2. 期待する lock token を決める（ローカル状態 or 呼び出し側）
//! 3. 読み直したレコードに対して lock を検証
//! 4. リモート遷移が成功した後にだけローカル状態を消す
//!
//! # 学習ポイント
//! - ports は `Arc<dyn Trait>` で保持（実装を差し替え可能）
//! - 事前条件のチェックはすべて store への書き込みより前

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{LockToken, RecordId, TaskId};
use crate::domain::record::TaskRecord;
use crate::domain::status::TaskStatus;
use crate::error::TaskError;
use crate::policy::lock::{LockVerdict, verify_lock};
use crate::ports::{ClaimStateStore, Clock, IdGenerator, RecordFilter, RecordStore};

/// Tunables of the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Lease length written by `claim`.
    pub lease_minutes: u32,
    /// Extension written by `heartbeat`.
    pub heartbeat_minutes: u32,
    /// Written to the `Agent` property on claim when set.
    pub agent_name: Option<String>,
    /// Default page size for `list`.
    pub list_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lease_minutes: 15,
            heartbeat_minutes: 15,
            agent_name: None,
            list_limit: 50,
        }
    }
}

/// Where a lock-requiring operation takes its expected token from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockSource {
    /// Trust the local claim state, which must belong to the task.
    LocalState,
    /// Trust the token the caller passed in.
    Supplied(LockToken),
}

impl LockSource {
    /// `Supplied` when a token is given, `LocalState` otherwise.
    pub fn from_option(token: Option<LockToken>) -> Self {
        token.map_or(LockSource::LocalState, LockSource::Supplied)
    }
}

/// TaskService は claim プロトコルとライフサイクル遷移を実装
///
/// 構築は [`TaskServiceBuilder`](crate::app::TaskServiceBuilder) で行います。
pub struct TaskService {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) claims: Arc<dyn ClaimStateStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) config: ServiceConfig,
}

impl TaskService {
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolves a task id to its current record.
    ///
    /// A store may match on the numeric part only (`BUG-42` finds `TASK-42`),
    /// so the decoded id must equal the requested one.
    pub(crate) async fn resolve(&self, task_id: &TaskId) -> Result<TaskRecord, TaskError> {
        let found = self.store.query(&RecordFilter::by_task_id(task_id)).await?;
        let task = found
            .iter()
            .map(TaskRecord::from_record)
            .find(|task| {
                task.task_id
                    .as_ref()
                    .is_some_and(|found| same_task_id(found, task_id))
            });
        match task {
            Some(task) => {
                tracing::debug!(record_id = %task.record_id, "resolved task");
                Ok(task)
            }
            None => {
                if !found.is_empty() {
                    tracing::debug!(candidates = found.len(), "no candidate matched the task id");
                }
                Err(TaskError::NotFound(task_id.to_string()))
            }
        }
    }

    /// Fresh read after a write.
    pub(crate) async fn reread(&self, record_id: &RecordId) -> Result<TaskRecord, TaskError> {
        let record = self.store.get(record_id).await?;
        Ok(TaskRecord::from_record(&record))
    }

    /// Fails with Misconfigured unless the task is in `expected`.
    pub(crate) fn require_status(
        &self,
        task: &TaskRecord,
        expected: TaskStatus,
        action: &str,
    ) -> Result<(), TaskError> {
        if task.status == Some(expected) {
            return Ok(());
        }
        Err(TaskError::misconfigured_for(
            format!(
                "Cannot {action} task {}: status is {}, expected {expected}",
                task.display_id(),
                task.status_label(),
            ),
            task,
        ))
    }

    async fn expected_token(
        &self,
        task_id: &TaskId,
        source: &LockSource,
    ) -> Result<LockToken, TaskError> {
        match source {
            LockSource::Supplied(token) => Ok(token.clone()),
            LockSource::LocalState => match self.claims.load().await? {
                None => Err(TaskError::misconfigured(
                    "No active task claim. Run 'claim' first.",
                )),
                Some(state) if !state.is_for(task_id) => Err(TaskError::misconfigured(format!(
                    "Claim state is for {}, not {task_id}",
                    state.task_id
                ))),
                Some(state) => Ok(state.lock_token),
            },
        }
    }

    /// Status must be InProgress and the expected lease must still be valid.
    ///
    /// Returns the verified token.
    pub(crate) async fn require_lock(
        &self,
        task_id: &TaskId,
        task: &TaskRecord,
        source: &LockSource,
        action: &str,
    ) -> Result<LockToken, TaskError> {
        self.require_status(task, TaskStatus::InProgress, action)?;
        let token = self.expected_token(task_id, source).await?;
        match verify_lock(task, &token, self.now()) {
            LockVerdict::Success => Ok(token),
            _ => {
                tracing::warn!(action, "lock verification failed");
                Err(TaskError::lost_lock(
                    "Lock token does not match; lock was stolen or expired",
                    task,
                ))
            }
        }
    }

    /// Clears local claim state if it refers to `task_id`.
    ///
    /// Only called after the remote transition succeeded.
    pub(crate) async fn release_local(&self, task_id: &TaskId) -> Result<(), TaskError> {
        if let Some(state) = self.claims.load().await?
            && state.is_for(task_id)
        {
            self.claims.clear().await?;
        }
        Ok(())
    }
}

/// Task ids compare trimmed and ASCII case-insensitively.
fn same_task_id(found: &TaskId, requested: &TaskId) -> bool {
    found
        .as_str()
        .trim()
        .eq_ignore_ascii_case(requested.as_str().trim())
}
