//! next / list / get / create / comment / update
//!
//! 読み取り系と、lock を必要としない管理操作。

use crate::app::service::TaskService;
use crate::domain::ids::TaskId;
use crate::domain::property::{Field, PropertyChanges, PropertyValue};
use crate::domain::record::TaskRecord;
use crate::domain::status::{ClassOfService, TaskStatus};
use crate::error::TaskError;
use crate::policy::pull;
use crate::ports::RecordFilter;

/// Input of `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub priority: i64,
    pub class_of_service: ClassOfService,
    /// Backlog or Ready.
    pub status: TaskStatus,
    pub parent: Option<TaskId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            priority: 5,
            class_of_service: ClassOfService::Standard,
            status: TaskStatus::Ready,
            parent: None,
        }
    }
}

/// Input of `update`. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub priority: Option<i64>,
    pub class_of_service: Option<ClassOfService>,
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.class_of_service.is_none() && self.status.is_none()
    }
}

impl TaskService {
    /// The task an agent should claim next, if any.
    #[tracing::instrument(skip(self))]
    pub async fn next(&self) -> Result<Option<TaskRecord>, TaskError> {
        let ready = self
            .store
            .query(&RecordFilter::by_status(TaskStatus::Ready))
            .await?;
        let candidates = ready.iter().map(TaskRecord::from_record);
        let picked = pull::next(candidates, self.now());
        match &picked {
            Some(task) => tracing::info!(task_id = task.display_id(), ready = ready.len(), "next task selected"),
            None => tracing::info!(ready = ready.len(), "no eligible task"),
        }
        Ok(picked)
    }

    /// Tasks in store order, optionally filtered by status.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>, TaskError> {
        let filter = RecordFilter {
            status,
            task_id: None,
            limit: Some(limit.unwrap_or(self.config.list_limit)),
        };
        let records = self.store.query(&filter).await?;
        Ok(records.iter().map(TaskRecord::from_record).collect())
    }

    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn get(&self, task_id: &TaskId) -> Result<TaskRecord, TaskError> {
        self.resolve(task_id).await
    }

    /// Creates a task. A parent, when given, must already exist.
    #[tracing::instrument(skip(self, task), fields(title = %task.title))]
    pub async fn create(&self, task: &NewTask) -> Result<TaskRecord, TaskError> {
        if task.title.trim().is_empty() {
            return Err(TaskError::misconfigured("Task title must not be empty"));
        }
        if !matches!(task.status, TaskStatus::Backlog | TaskStatus::Ready) {
            return Err(TaskError::misconfigured(format!(
                "Initial status must be Backlog or Ready, got '{}'",
                task.status
            )));
        }
        if let Some(parent) = &task.parent {
            self.resolve(parent).await?;
        }

        let properties = PropertyChanges::new()
            .set(Field::Title, PropertyValue::Text(task.title.clone()))
            .set(Field::Status, PropertyValue::Select(task.status.to_string()))
            .set(Field::Priority, PropertyValue::Number(task.priority))
            .set(Field::Class, PropertyValue::Select(task.class_of_service.to_string()))
            .set_opt(
                Field::Parent,
                task.parent.as_ref().map(|p| PropertyValue::Text(p.to_string())),
            );
        let record = self.store.create(&properties).await?;
        let created = TaskRecord::from_record(&record);

        tracing::info!(task_id = created.display_id(), "task created");
        Ok(created)
    }

    #[tracing::instrument(skip(self, text), fields(task_id = %task_id))]
    pub async fn comment(&self, task_id: &TaskId, text: &str) -> Result<TaskRecord, TaskError> {
        if text.trim().is_empty() {
            return Err(TaskError::misconfigured("Comment text must not be empty"));
        }
        let task = self.resolve(task_id).await?;
        self.store.add_comment(&task.record_id, text).await?;
        Ok(task)
    }

    /// Edits priority, class or status outside the claim protocol.
    ///
    /// Done and InProgress are refused: they have dedicated, lock-checked
    /// operations (`complete`, `claim`).
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn update(
        &self,
        task_id: &TaskId,
        update: &TaskUpdate,
    ) -> Result<TaskRecord, TaskError> {
        if update.is_empty() {
            return Err(TaskError::misconfigured(
                "At least one property must be specified (priority, class of service, status)",
            ));
        }
        match update.status {
            Some(TaskStatus::Done) => {
                return Err(TaskError::misconfigured(
                    "Cannot set status to Done via update; use 'complete' instead",
                ));
            }
            Some(TaskStatus::InProgress) => {
                return Err(TaskError::misconfigured(
                    "Cannot set status to In Progress via update; use 'claim' instead",
                ));
            }
            _ => {}
        }

        let task = self.resolve(task_id).await?;
        let changes = PropertyChanges::new()
            .set_opt(Field::Priority, update.priority.map(PropertyValue::Number))
            .set_opt(
                Field::Class,
                update
                    .class_of_service
                    .map(|c| PropertyValue::Select(c.to_string())),
            )
            .set_opt(
                Field::Status,
                update.status.map(|s| PropertyValue::Select(s.to_string())),
            );
        self.store.update(&task.record_id, &changes).await?;

        tracing::info!("task updated");
        self.reread(&task.record_id).await
    }
}
