//! Local claim state: the single claim this agent currently holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{LockToken, RecordId, RunId, TaskId};
use crate::domain::lease::Lease;

/// Persisted between process restarts so the lock token survives.
///
/// Serialized with snake_case keys:
/// `task_id`, `run_id`, `lock_token`, `lock_expires`, `record_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimState {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub lock_token: LockToken,
    pub lock_expires: DateTime<Utc>,
    pub record_id: RecordId,
}

impl ClaimState {
    pub fn lease(&self) -> Lease {
        Lease::new(self.lock_token.clone(), self.lock_expires)
    }

    pub fn is_for(&self, task_id: &TaskId) -> bool {
        &self.task_id == task_id
    }

    /// Same claim with a new expiry (heartbeat).
    pub fn extended(&self, lock_expires: DateTime<Utc>) -> Self {
        Self {
            lock_expires,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_stable_keys() {
        let state = ClaimState {
            task_id: TaskId::new("TASK-1"),
            run_id: RunId::new("run-1"),
            lock_token: LockToken::new("tok-A"),
            lock_expires: Utc.with_ymd_and_hms(2025, 3, 1, 12, 15, 0).unwrap(),
            record_id: RecordId::new("page-1"),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["task_id"], "TASK-1");
        assert_eq!(json["lock_token"], "tok-A");
        assert_eq!(json["lock_expires"], "2025-03-01T12:15:00Z");
        assert_eq!(json["record_id"], "page-1");

        let back: ClaimState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
