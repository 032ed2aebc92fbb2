//! block / unblock

use chrono::{DateTime, Utc};

use crate::app::service::{LockSource, TaskService};
use crate::domain::ids::TaskId;
use crate::domain::lease::format_timestamp;
use crate::domain::property::{Field, PropertyChanges, PropertyValue};
use crate::domain::record::TaskRecord;
use crate::domain::status::TaskStatus;
use crate::error::TaskError;

/// Why a task is blocked and what unblocks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReason {
    pub reason: String,
    pub unblock_action: String,
    pub next_check_at: Option<DateTime<Utc>>,
}

impl TaskService {
    /// InProgress -> Blocked. Requires a valid lease; releases it.
    #[tracing::instrument(skip(self, source, block), fields(task_id = %task_id))]
    pub async fn block(
        &self,
        task_id: &TaskId,
        source: LockSource,
        block: &BlockReason,
    ) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        if block.reason.trim().is_empty() {
            return Err(TaskError::misconfigured_for("A blocker reason is required", &task));
        }
        self.require_lock(task_id, &task, &source, "block").await?;

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::Blocked.to_string()))
            .set(Field::BlockerReason, PropertyValue::Text(block.reason.clone()))
            .set(Field::UnblockAction, PropertyValue::Text(block.unblock_action.clone()))
            .set_opt(
                Field::NextCheckAt,
                block
                    .next_check_at
                    .map(|at| PropertyValue::Date(format_timestamp(at))),
            )
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;
        self.release_local(task_id).await?;

        tracing::info!(reason = %block.reason, "task blocked");
        self.reread(&task.record_id).await
    }

    /// Blocked -> InProgress, unlocked.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn unblock(&self, task_id: &TaskId) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        self.require_status(&task, TaskStatus::Blocked, "unblock")?;

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::InProgress.to_string()))
            .clear(Field::NextCheckAt)
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;

        tracing::info!("task unblocked");
        self.reread(&task.record_id).await
    }
}
