//! TaskRecord - 未型付けレコードの型付きビュー
//!
//! # 学習ポイント
//! - ストアの値は信用しない: パースできない値は `None` に倒す
//! - 空文字列のトークンは「ロックなし」と同義
//! - 不変条件（token があれば expiry もある）は壊れていても受け入れる

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ids::{LockToken, RecordId, RunId, TaskId};
use crate::domain::lease::{Lease, is_expired, parse_timestamp};
use crate::domain::property::{Field, HUMAN_ASSIGNEE, Record};
use crate::domain::status::{ClassOfService, TaskStatus};

/// Typed view of a task record.
///
/// `status` / `class_of_service` are `None` when the store holds a value this
/// crate does not recognise; the raw text is kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub record_id: RecordId,
    pub task_id: Option<TaskId>,
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub raw_status: Option<String>,
    pub priority: Option<i64>,
    pub class_of_service: Option<ClassOfService>,
    pub claimed_by: Option<String>,
    pub run_id: Option<RunId>,
    pub agent_name: Option<String>,
    pub lock_token: Option<LockToken>,
    pub lock_expires: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
    pub blocker_reason: Option<String>,
    pub unblock_action: Option<String>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub artifacts: Option<String>,
    pub parent_task_id: Option<TaskId>,
    pub dependencies_total: Option<i64>,
    pub dependencies_completed: Option<i64>,
    pub last_edited_time: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn from_record(record: &Record) -> Self {
        let text = |field: Field| record.text(field).map(str::to_string);
        let date = |field: Field| record.text(field).and_then(parse_timestamp);
        let raw_status = text(Field::Status);

        Self {
            record_id: record.id.clone(),
            task_id: record.text(Field::TaskId).map(TaskId::new),
            title: text(Field::Title),
            status: raw_status.as_deref().and_then(TaskStatus::parse),
            raw_status,
            priority: record.number(Field::Priority),
            class_of_service: record.text(Field::Class).and_then(ClassOfService::parse),
            claimed_by: text(Field::ClaimedBy),
            run_id: record.text(Field::AgentRun).map(RunId::new),
            agent_name: text(Field::Agent),
            lock_token: record.text(Field::LockToken).map(LockToken::new),
            lock_expires: date(Field::LockExpires),
            started_at: date(Field::StartedAt),
            done_at: date(Field::DoneAt),
            blocker_reason: text(Field::BlockerReason),
            unblock_action: text(Field::UnblockAction),
            next_check_at: date(Field::NextCheckAt),
            artifacts: text(Field::Artifacts),
            parent_task_id: record.text(Field::Parent).map(TaskId::new),
            dependencies_total: record.number(Field::Dependencies),
            dependencies_completed: record.number(Field::CompletedSubtasks),
            last_edited_time: record.last_edited_time.as_deref().and_then(parse_timestamp),
        }
    }

    /// Human-facing id, falling back to the record id.
    pub fn display_id(&self) -> &str {
        self.task_id
            .as_ref()
            .map(TaskId::as_str)
            .unwrap_or_else(|| self.record_id.as_str())
    }

    /// Status name for messages, including unrecognised raw values.
    pub fn status_label(&self) -> &str {
        match (self.status, self.raw_status.as_deref()) {
            (Some(status), _) => status.as_str(),
            (None, Some(raw)) => raw,
            (None, None) => "unknown",
        }
    }

    pub fn is_held_by_human(&self) -> bool {
        self.claimed_by
            .as_deref()
            .is_some_and(|who| who.trim().eq_ignore_ascii_case(HUMAN_ASSIGNEE))
    }

    /// The current lease, if both halves are present.
    pub fn lease(&self) -> Option<Lease> {
        match (&self.lock_token, self.lock_expires) {
            (Some(token), Some(expires)) => Some(Lease::new(token.clone(), expires)),
            _ => None,
        }
    }

    /// True when some holder has an unexpired lease.
    ///
    /// A token without an expiry does not count as held.
    pub fn has_active_lease(&self, now: DateTime<Utc>) -> bool {
        self.lease()
            .is_some_and(|lease| !is_expired(lease.expires, now))
    }

    /// `(open, total)` when the record declares sub-tasks.
    pub fn open_subtasks(&self) -> Option<(i64, i64)> {
        let total = self.dependencies_total.filter(|t| *t > 0)?;
        let completed = self.dependencies_completed.unwrap_or(0);
        Some(((total - completed).max(0), total))
    }
}

impl From<&Record> for TaskRecord {
    fn from(record: &Record) -> Self {
        TaskRecord::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::PropertyValue;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn base() -> Record {
        Record::new(RecordId::new("page-1"))
            .with(Field::TaskId, PropertyValue::Text("TASK-1".into()))
            .with(Field::Status, PropertyValue::Select("In Progress".into()))
            .with(Field::Priority, PropertyValue::Number(3))
            .with(Field::Class, PropertyValue::Select("Fixed Date".into()))
    }

    #[test]
    fn reads_typed_fields() {
        let record = base()
            .with(Field::LockToken, PropertyValue::Text("tok-A".into()))
            .with(
                Field::LockExpires,
                PropertyValue::Date("2025-03-01T12:15:00.000Z".into()),
            );
        let task = TaskRecord::from_record(&record);

        assert_eq!(task.display_id(), "TASK-1");
        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(task.class_of_service, Some(ClassOfService::FixedDate));
        assert_eq!(task.priority, Some(3));
        assert_eq!(task.lock_expires, Some(now() + Duration::minutes(15)));
        assert!(task.has_active_lease(now()));
    }

    #[test]
    fn unknown_values_degrade_to_none() {
        let record = base()
            .with(Field::Status, PropertyValue::Select("Archived".into()))
            .with(Field::Class, PropertyValue::Select("Urgent".into()))
            .with(Field::LockExpires, PropertyValue::Date("tomorrow".into()));
        let task = TaskRecord::from_record(&record);

        assert_eq!(task.status, None);
        assert_eq!(task.status_label(), "Archived");
        assert_eq!(task.class_of_service, None);
        assert_eq!(task.lock_expires, None);
    }

    #[test]
    fn token_without_expiry_is_not_an_active_lease() {
        let record = base().with(Field::LockToken, PropertyValue::Text("tok-A".into()));
        let task = TaskRecord::from_record(&record);

        assert!(task.lock_token.is_some());
        assert!(task.lease().is_none());
        assert!(!task.has_active_lease(now()));
    }

    #[test]
    fn human_sentinel_is_case_insensitive() {
        let record = base().with(Field::ClaimedBy, PropertyValue::Select("human".into()));
        assert!(TaskRecord::from_record(&record).is_held_by_human());

        let record = base().with(Field::ClaimedBy, PropertyValue::Select("AGENT".into()));
        assert!(!TaskRecord::from_record(&record).is_held_by_human());
    }

    #[test]
    fn open_subtasks_only_when_declared() {
        let none = TaskRecord::from_record(&base().with(Field::Dependencies, PropertyValue::Number(0)));
        assert_eq!(none.open_subtasks(), None);

        let some = TaskRecord::from_record(
            &base()
                .with(Field::Dependencies, PropertyValue::Number(3))
                .with(Field::CompletedSubtasks, PropertyValue::Number(2)),
        );
        assert_eq!(some.open_subtasks(), Some((1, 3)));
    }
}
