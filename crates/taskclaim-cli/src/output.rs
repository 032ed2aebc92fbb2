//! JSON written to stdout.
//!
//! Every command prints exactly one object with an `ok` flag. Task summaries
//! use snake_case keys and leave out absent fields.

use serde::Serialize;

use taskclaim_core::TaskError;
use taskclaim_core::domain::{TaskRecord, format_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_run: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unblock_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_check_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies_total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies_completed: Option<i64>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(task: &TaskRecord) -> Self {
        let ts = |at: Option<chrono::DateTime<chrono::Utc>>| at.map(format_timestamp);
        Self {
            record_id: task.record_id.to_string(),
            task_id: task.task_id.as_ref().map(ToString::to_string),
            title: task.title.clone(),
            status: task
                .status
                .map(|s| s.to_string())
                .or_else(|| task.raw_status.clone()),
            priority: task.priority,
            class_of_service: task.class_of_service.map(|c| c.to_string()),
            claimed_by: task.claimed_by.clone(),
            agent_run: task.run_id.as_ref().map(ToString::to_string),
            agent: task.agent_name.clone(),
            lock_token: task.lock_token.as_ref().map(ToString::to_string),
            lock_expires: ts(task.lock_expires),
            started_at: ts(task.started_at),
            done_at: ts(task.done_at),
            blocker_reason: task.blocker_reason.clone(),
            unblock_action: task.unblock_action.clone(),
            next_check_at: ts(task.next_check_at),
            artifacts: task.artifacts.clone(),
            parent_task_id: task.parent_task_id.as_ref().map(ToString::to_string),
            dependencies_total: task.dependencies_total,
            dependencies_completed: task.dependencies_completed,
        }
    }
}

/// `{"ok": true, "task": ..., "message"?: ...}`. `task` is `null` when nothing matched.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub ok: bool,
    pub task: Option<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskResponse {
    pub fn task(task: &TaskRecord) -> Self {
        Self {
            ok: true,
            task: Some(task.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            task: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub ok: bool,
    pub tasks: Vec<TaskSummary>,
    pub count: usize,
}

impl ListResponse {
    pub fn new(tasks: &[TaskRecord]) -> Self {
        Self {
            ok: true,
            tasks: tasks.iter().map(TaskSummary::from).collect(),
            count: tasks.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub ok: bool,
    pub task_id: String,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub ok: bool,
    pub version: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskSummary>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: ErrorPayload {
                code: code.into(),
                message: message.into(),
            },
            task: None,
        }
    }
}

impl From<&TaskError> for ErrorResponse {
    fn from(err: &TaskError) -> Self {
        Self {
            task: err.task().map(TaskSummary::from),
            ..Self::new(err.code(), err.to_string())
        }
    }
}

/// Pretty-printed with sorted keys.
pub fn render(value: &impl Serialize) -> String {
    match serde_json::to_value(value).and_then(|v| serde_json::to_string_pretty(&v)) {
        Ok(text) => text,
        Err(e) => {
            let fallback = ErrorResponse::new("API_ERROR", format!("failed to encode output: {e}"));
            serde_json::to_string(&fallback).unwrap_or_else(|_| r#"{"ok":false}"#.to_string())
        }
    }
}

/// Parsed form of [`render`] output, for assertions.
#[cfg(test)]
pub fn to_json(value: &impl Serialize) -> serde_json::Value {
    serde_json::from_str(&render(value)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use taskclaim_core::domain::{Field, PropertyValue, Record, RecordId};

    fn task() -> TaskRecord {
        let record = Record::new(RecordId::new("page-1"))
            .with(Field::TaskId, PropertyValue::Text("TASK-1".into()))
            .with(Field::Status, PropertyValue::Select("In Progress".into()))
            .with(Field::Priority, PropertyValue::Number(4))
            .with(Field::LockToken, PropertyValue::Text("lock-abc".into()))
            .with(
                Field::LockExpires,
                PropertyValue::Date("2025-03-01T12:15:00Z".into()),
            );
        TaskRecord::from_record(&record)
    }

    #[test]
    fn summary_omits_absent_fields() {
        let value = to_json(&TaskResponse::task(&task()));

        assert_eq!(
            value,
            json!({
                "ok": true,
                "task": {
                    "record_id": "page-1",
                    "task_id": "TASK-1",
                    "status": "In Progress",
                    "priority": 4,
                    "lock_token": "lock-abc",
                    "lock_expires": "2025-03-01T12:15:00Z",
                }
            })
        );
    }

    #[test]
    fn unknown_status_keeps_raw_text() {
        let record = Record::new(RecordId::new("p"))
            .with(Field::Status, PropertyValue::Select("Someday".into()));
        let summary = TaskSummary::from(&TaskRecord::from_record(&record));
        assert_eq!(summary.status.as_deref(), Some("Someday"));
    }

    #[test]
    fn empty_next_has_null_task() {
        let value = to_json(&TaskResponse::empty("No ready tasks found"));
        assert_eq!(
            value,
            json!({ "ok": true, "task": null, "message": "No ready tasks found" })
        );
    }

    #[test]
    fn error_carries_observed_task() {
        let err = TaskError::conflict("Task was claimed by another agent", &task());
        let value = to_json(&ErrorResponse::from(&err));

        assert_eq!(value["ok"], json!(false));
        assert_eq!(
            value["error"],
            json!({ "code": "CONFLICT", "message": "Task was claimed by another agent" })
        );
        assert_eq!(value["task"]["lock_token"], json!("lock-abc"));
    }

    #[test]
    fn error_without_task() {
        let err = TaskError::misconfigured("No active task claim. Run 'claim' first.");
        let value = to_json(&ErrorResponse::from(&err));
        assert!(value.get("task").is_none());
        assert_eq!(value["error"]["code"], json!("MISCONFIGURED"));
    }

    #[test]
    fn list_counts() {
        let tasks = vec![task(), task()];
        let value = to_json(&ListResponse::new(&tasks));
        assert_eq!(value["count"], json!(2));
        assert_eq!(value["tasks"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn timestamps_are_utc_seconds() {
        let mut t = task();
        t.done_at = Some(Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap());
        assert_eq!(
            TaskSummary::from(&t).done_at.as_deref(),
            Some("2025-03-01T13:00:00Z")
        );
    }
}
