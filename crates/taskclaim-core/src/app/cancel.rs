//! cancel / complete

use crate::app::service::{LockSource, TaskService};
use crate::domain::ids::TaskId;
use crate::domain::lease::format_timestamp;
use crate::domain::property::{Field, PropertyChanges, PropertyValue};
use crate::domain::record::TaskRecord;
use crate::domain::status::TaskStatus;
use crate::error::TaskError;

/// Result of `cancel`.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub task: TaskRecord,
    /// False when the task was already Done or Canceled.
    pub changed: bool,
}

impl TaskService {
    /// Cancels a task.
    ///
    /// The lock requirement is derived from the status read now:
    /// - Done / Canceled: no-op, returns the current record
    /// - InProgress: valid lease required, local state cleared afterwards
    /// - anything else: lock-free
    #[tracing::instrument(skip(self, source, reason), fields(task_id = %task_id))]
    pub async fn cancel(
        &self,
        task_id: &TaskId,
        source: LockSource,
        reason: &str,
    ) -> Result<CancelOutcome, TaskError> {
        let task = self.resolve(task_id).await?;

        let held = match task.status {
            Some(status) if status.is_terminal() => {
                tracing::info!(status = %status, "cancel is a no-op");
                return Ok(CancelOutcome {
                    task,
                    changed: false,
                });
            }
            Some(TaskStatus::InProgress) => {
                self.require_lock(task_id, &task, &source, "cancel").await?;
                true
            }
            Some(_) => false,
            None => {
                return Err(TaskError::misconfigured_for(
                    format!("Cannot cancel task with status {}", task.status_label()),
                    &task,
                ));
            }
        };

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::Canceled.to_string()))
            .set(Field::BlockerReason, PropertyValue::Text(reason.to_string()))
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;
        if held {
            self.release_local(task_id).await?;
        }

        tracing::info!(reason, "task canceled");
        Ok(CancelOutcome {
            task: self.reread(&task.record_id).await?,
            changed: true,
        })
    }

    /// InProgress -> Done. Requires a valid lease; releases it.
    #[tracing::instrument(skip(self, source, artifacts), fields(task_id = %task_id))]
    pub async fn complete(
        &self,
        task_id: &TaskId,
        source: LockSource,
        artifacts: &str,
    ) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        self.require_lock(task_id, &task, &source, "complete").await?;

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::Done.to_string()))
            .set(Field::Artifacts, PropertyValue::Text(artifacts.to_string()))
            .set(Field::DoneAt, PropertyValue::Date(format_timestamp(self.now())))
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;
        self.release_local(task_id).await?;

        tracing::info!("task completed");
        self.reread(&task.record_id).await
    }
}
