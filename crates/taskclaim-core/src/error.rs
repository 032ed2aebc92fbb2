use thiserror::Error;

use crate::domain::record::TaskRecord;
use crate::ports::{ClaimStateError, StoreError};

/// Failures of a command-layer operation. All are terminal for the call.
///
/// Variants that arise after a record was read carry that record so callers
/// can report what was actually observed.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{0}' not found")]
    NotFound(String),

    /// A concurrent claimant won the race, or the task is already held.
    #[error("{message}")]
    Conflict {
        message: String,
        task: Option<Box<TaskRecord>>,
    },

    /// The expected lease is gone: wrong token, expired, or missing.
    #[error("{message}")]
    LostLock {
        message: String,
        task: Option<Box<TaskRecord>>,
    },

    #[error("Cannot review: {open}/{total} sub-tasks still open")]
    IncompleteSubtasks {
        open: i64,
        total: i64,
        task: Box<TaskRecord>,
    },

    /// Illegal transition for the current status, or invalid input.
    #[error("{message}")]
    Misconfigured {
        message: String,
        task: Option<Box<TaskRecord>>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ClaimState(#[from] ClaimStateError),
}

impl TaskError {
    pub fn conflict(message: impl Into<String>, task: &TaskRecord) -> Self {
        TaskError::Conflict {
            message: message.into(),
            task: Some(Box::new(task.clone())),
        }
    }

    pub fn lost_lock(message: impl Into<String>, task: &TaskRecord) -> Self {
        TaskError::LostLock {
            message: message.into(),
            task: Some(Box::new(task.clone())),
        }
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        TaskError::Misconfigured {
            message: message.into(),
            task: None,
        }
    }

    pub fn misconfigured_for(message: impl Into<String>, task: &TaskRecord) -> Self {
        TaskError::Misconfigured {
            message: message.into(),
            task: Some(Box::new(task.clone())),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::NotFound(_) | TaskError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            TaskError::Conflict { .. } => "CONFLICT",
            TaskError::LostLock { .. } => "LOST_LOCK",
            TaskError::IncompleteSubtasks { .. } => "INCOMPLETE_SUBTASKS",
            TaskError::Misconfigured { .. } | TaskError::ClaimState(_) => "MISCONFIGURED",
            TaskError::Store(StoreError::ClientMissing(_)) => "CLI_MISSING",
            TaskError::Store(_) => "API_ERROR",
        }
    }

    /// Process exit code for the code above.
    pub fn exit_code(&self) -> i32 {
        match self.code() {
            "CONFLICT" => 2,
            "LOST_LOCK" => 4,
            "API_ERROR" => 5,
            "INCOMPLETE_SUBTASKS" => 6,
            _ => 3,
        }
    }

    /// The record observed when the error was raised, if any.
    pub fn task(&self) -> Option<&TaskRecord> {
        match self {
            TaskError::Conflict { task, .. }
            | TaskError::LostLock { task, .. }
            | TaskError::Misconfigured { task, .. } => task.as_deref(),
            TaskError::IncompleteSubtasks { task, .. } => Some(&**task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(TaskError::NotFound("T-1".into()), "NOT_FOUND", 3)]
    #[case::conflict(TaskError::Conflict { message: "x".into(), task: None }, "CONFLICT", 2)]
    #[case::lost_lock(TaskError::LostLock { message: "x".into(), task: None }, "LOST_LOCK", 4)]
    #[case::misconfigured(TaskError::misconfigured("x"), "MISCONFIGURED", 3)]
    #[case::api(TaskError::Store(StoreError::Api("boom".into())), "API_ERROR", 5)]
    #[case::cli_missing(TaskError::Store(StoreError::ClientMissing("no notion".into())), "CLI_MISSING", 3)]
    fn codes_and_exit_codes(#[case] err: TaskError, #[case] code: &str, #[case] exit: i32) {
        assert_eq!(err.code(), code);
        assert_eq!(err.exit_code(), exit);
    }

    #[test]
    fn store_errors_display_verbatim() {
        let err = TaskError::from(StoreError::Api("rate limited".into()));
        assert_eq!(err.to_string(), "rate limited");
        assert!(err.task().is_none());
    }
}
