//! review / approve / rework

use crate::app::service::{LockSource, TaskService};
use crate::domain::ids::TaskId;
use crate::domain::lease::format_timestamp;
use crate::domain::property::{Field, PropertyChanges, PropertyValue};
use crate::domain::record::TaskRecord;
use crate::domain::status::TaskStatus;
use crate::error::TaskError;

impl TaskService {
    /// InProgress -> Review. Requires a valid lease and no open sub-tasks.
    ///
    /// The summary is posted as a comment before the status write.
    #[tracing::instrument(skip(self, source, summary, artifacts), fields(task_id = %task_id))]
    pub async fn review(
        &self,
        task_id: &TaskId,
        source: LockSource,
        summary: &str,
        artifacts: Option<&str>,
    ) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        self.require_lock(task_id, &task, &source, "review").await?;

        if let Some((open, total)) = task.open_subtasks()
            && open > 0
        {
            tracing::warn!(open, total, "review refused: sub-tasks still open");
            return Err(TaskError::IncompleteSubtasks {
                open,
                total,
                task: Box::new(task),
            });
        }

        if !summary.trim().is_empty() {
            self.store.add_comment(&task.record_id, summary).await?;
        }

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::Review.to_string()))
            .set_opt(
                Field::Artifacts,
                artifacts.map(|a| PropertyValue::Text(a.to_string())),
            )
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;
        self.release_local(task_id).await?;

        tracing::info!("task moved to review");
        self.reread(&task.record_id).await
    }

    /// Review -> Done. Status check only; clearing an already clear lock is a no-op.
    ///
    /// The summary comment goes first so a failed comment leaves the task in Review.
    #[tracing::instrument(skip(self, summary), fields(task_id = %task_id))]
    pub async fn approve(
        &self,
        task_id: &TaskId,
        summary: Option<&str>,
    ) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        self.require_status(&task, TaskStatus::Review, "approve")?;

        if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
            self.store.add_comment(&task.record_id, summary).await?;
        }

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::Done.to_string()))
            .set(Field::DoneAt, PropertyValue::Date(format_timestamp(self.now())))
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;

        tracing::info!("task approved");
        self.reread(&task.record_id).await
    }

    /// Review -> InProgress, unlocked. The next claim re-acquires the lease.
    #[tracing::instrument(skip(self, reason), fields(task_id = %task_id))]
    pub async fn rework(&self, task_id: &TaskId, reason: &str) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        self.require_status(&task, TaskStatus::Review, "rework")?;

        if !reason.trim().is_empty() {
            self.store
                .add_comment(&task.record_id, &format!("Rework requested: {reason}"))
                .await?;
        }

        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select(TaskStatus::InProgress.to_string()))
            .release_lock();
        self.store.update(&task.record_id, &changes).await?;

        tracing::info!("task sent back for rework");
        self.reread(&task.record_id).await
    }
}
