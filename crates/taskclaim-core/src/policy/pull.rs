//! Pull policy: which Ready task an agent should claim next.
//!
//! Ordering keys, in order:
//! 1. class of service rank ascending (missing ranks as Standard)
//! 2. priority descending (missing is 0)
//! 3. last edited time ascending, missing first
//!
//! `sort_by` is stable, so records equal on all three keys keep store order.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, Utc};

use crate::domain::record::TaskRecord;
use crate::domain::status::{ClassOfService, TaskStatus};

/// Ready, not held by a human, and not under an active lease.
///
/// A token with no expiry counts as unlocked.
pub fn is_eligible(record: &TaskRecord, now: DateTime<Utc>) -> bool {
    record.status == Some(TaskStatus::Ready)
        && !record.is_held_by_human()
        && !record.has_active_lease(now)
}

fn pull_order(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    let key = |r: &TaskRecord| {
        (
            ClassOfService::rank_of(r.class_of_service),
            Reverse(r.priority.unwrap_or(0)),
            r.last_edited_time,
        )
    };
    // Option orders None before Some, which gives "missing first".
    key(a).cmp(&key(b))
}

/// Stable sort by pull order.
pub fn sort(records: &mut [TaskRecord]) {
    records.sort_by(pull_order);
}

/// Owned variant of [`sort`].
pub fn sorted(mut records: Vec<TaskRecord>) -> Vec<TaskRecord> {
    sort(&mut records);
    records
}

/// First eligible record in pull order.
pub fn next(records: impl IntoIterator<Item = TaskRecord>, now: DateTime<Utc>) -> Option<TaskRecord> {
    records
        .into_iter()
        .filter(|r| is_eligible(r, now))
        .min_by(pull_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::RecordId;
    use crate::domain::lease::format_timestamp;
    use crate::domain::property::{Field, PropertyValue, Record};
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    struct Row<'a> {
        id: &'a str,
        class: Option<&'a str>,
        priority: Option<i64>,
        edited_min_ago: Option<i64>,
    }

    fn task(row: Row<'_>) -> TaskRecord {
        let mut record = Record::new(RecordId::new(row.id))
            .with(Field::TaskId, PropertyValue::Text(row.id.into()))
            .with(Field::Status, PropertyValue::Select("Ready".into()));
        if let Some(class) = row.class {
            record = record.with(Field::Class, PropertyValue::Select(class.into()));
        }
        if let Some(p) = row.priority {
            record = record.with(Field::Priority, PropertyValue::Number(p));
        }
        record.last_edited_time = row
            .edited_min_ago
            .map(|m| format_timestamp(now() - Duration::minutes(m)));
        TaskRecord::from_record(&record)
    }

    fn ids(records: &[TaskRecord]) -> Vec<&str> {
        records.iter().map(TaskRecord::display_id).collect()
    }

    fn ready(id: &str) -> TaskRecord {
        task(Row { id, class: None, priority: Some(1), edited_min_ago: Some(1) })
    }

    fn with(record: TaskRecord, field: Field, value: PropertyValue) -> TaskRecord {
        let mut raw = Record::new(record.record_id.clone())
            .with(Field::Status, PropertyValue::Select(record.status_label().to_string()));
        if let Some(claimed_by) = &record.claimed_by {
            raw = raw.with(Field::ClaimedBy, PropertyValue::Select(claimed_by.clone()));
        }
        TaskRecord::from_record(&raw.with(field, value))
    }

    #[test]
    fn ready_unlocked_task_is_eligible() {
        assert!(is_eligible(&ready("T-1"), now()));
    }

    #[rstest]
    #[case::backlog("Backlog")]
    #[case::in_progress("In Progress")]
    #[case::review("Review")]
    #[case::unknown("Archived")]
    fn non_ready_is_not_eligible(#[case] status: &str) {
        let record = with(ready("T-1"), Field::Status, PropertyValue::Select(status.into()));
        assert!(!is_eligible(&record, now()));
    }

    #[test]
    fn human_held_is_not_eligible() {
        let record = with(ready("T-1"), Field::ClaimedBy, PropertyValue::Select("HUMAN".into()));
        assert!(!is_eligible(&record, now()));
    }

    #[test]
    fn lock_state_decides_eligibility() {
        let locked = |minutes: i64| {
            let raw = Record::new(RecordId::new("T-1"))
                .with(Field::Status, PropertyValue::Select("Ready".into()))
                .with(Field::LockToken, PropertyValue::Text("tok".into()))
                .with(
                    Field::LockExpires,
                    PropertyValue::Date(format_timestamp(now() + Duration::minutes(minutes))),
                );
            TaskRecord::from_record(&raw)
        };

        assert!(!is_eligible(&locked(10), now()));
        assert!(is_eligible(&locked(-1), now()));

        // token without expiry: fail open
        let corrupted = with(ready("T-1"), Field::LockToken, PropertyValue::Text("tok".into()));
        assert!(is_eligible(&corrupted, now()));
    }

    #[test]
    fn class_beats_priority() {
        let t1 = task(Row { id: "T-1", class: Some("Standard"), priority: Some(3), edited_min_ago: Some(5) });
        let t2 = task(Row { id: "T-2", class: Some("Expedite"), priority: Some(2), edited_min_ago: Some(5) });

        let picked = next(vec![t1, t2], now()).unwrap();
        assert_eq!(picked.display_id(), "T-2");
    }

    #[test]
    fn sort_is_the_same_for_every_permutation() {
        let a = task(Row { id: "A", class: Some("Expedite"), priority: Some(2), edited_min_ago: Some(30) });
        let b = task(Row { id: "B", class: Some("Expedite"), priority: Some(2), edited_min_ago: Some(10) });
        let c = task(Row { id: "C", class: Some("Standard"), priority: Some(3), edited_min_ago: Some(60) });

        let perms = [
            vec![a.clone(), b.clone(), c.clone()],
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c.clone(), b.clone(), a.clone()],
        ];
        for perm in perms {
            assert_eq!(ids(&sorted(perm)), vec!["A", "B", "C"]);
        }
    }

    #[test]
    fn missing_keys_use_defaults() {
        // no class ranks as Standard, so it ties with C on class; higher priority wins
        let unclassed = task(Row { id: "U", class: None, priority: Some(4), edited_min_ago: Some(1) });
        let fixed = task(Row { id: "F", class: Some("Fixed Date"), priority: None, edited_min_ago: Some(1) });
        let c = task(Row { id: "C", class: Some("Standard"), priority: Some(3), edited_min_ago: Some(1) });
        let intangible = task(Row { id: "I", class: Some("Intangible"), priority: Some(9), edited_min_ago: None });

        assert_eq!(ids(&sorted(vec![intangible, c, unclassed, fixed])), vec!["F", "U", "C", "I"]);
    }

    #[test]
    fn missing_edit_time_sorts_first_and_full_ties_keep_order() {
        let never = task(Row { id: "N", class: None, priority: Some(1), edited_min_ago: None });
        let x = task(Row { id: "X", class: None, priority: Some(1), edited_min_ago: Some(5) });
        let y = task(Row { id: "Y", class: None, priority: Some(1), edited_min_ago: Some(5) });

        assert_eq!(ids(&sorted(vec![x.clone(), y.clone(), never.clone()])), vec!["N", "X", "Y"]);
        assert_eq!(ids(&sorted(vec![y, x, never])), vec!["N", "Y", "X"]);
    }

    #[test]
    fn next_skips_ineligible_and_returns_none_when_empty() {
        let human = with(
            task(Row { id: "H", class: Some("Expedite"), priority: Some(9), edited_min_ago: Some(1) }),
            Field::ClaimedBy,
            PropertyValue::Select("HUMAN".into()),
        );
        assert!(next(vec![human.clone()], now()).is_none());

        let picked = next(vec![human, ready("T-1")], now()).unwrap();
        assert_eq!(picked.display_id(), "T-1");
        assert!(next(Vec::new(), now()).is_none());
    }
}
