//! Lock verification against a freshly read record.
//!
//! Both checks are pure and total: absent tokens or expiries classify as a
//! failure, never as an error.

use chrono::{DateTime, Utc};

use crate::domain::ids::LockToken;
use crate::domain::lease::is_expired;
use crate::domain::record::TaskRecord;

/// Outcome of a lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockVerdict {
    Success,
    /// Another claimant's write won the race.
    Conflict,
    /// The expected lease is no longer ours or no longer valid.
    LostLock,
}

impl LockVerdict {
    pub fn is_success(self) -> bool {
        self == LockVerdict::Success
    }
}

/// Post-claim check: did our token land?
pub fn verify_claim(record: &TaskRecord, expected: &LockToken) -> LockVerdict {
    match &record.lock_token {
        Some(token) if token == expected => LockVerdict::Success,
        _ => LockVerdict::Conflict,
    }
}

/// Pre-transition check: is the lease still ours and unexpired?
pub fn verify_lock(record: &TaskRecord, expected: &LockToken, now: DateTime<Utc>) -> LockVerdict {
    match (&record.lock_token, record.lock_expires) {
        (Some(token), Some(expires)) if token == expected && !is_expired(expires, now) => {
            LockVerdict::Success
        }
        _ => LockVerdict::LostLock,
    }
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

    fn locked(token: Option<&str>, expires: Option<DateTime<Utc>>) -> TaskRecord {
        let mut record = Record::new(RecordId::new("page-1"))
            .with(Field::Status, PropertyValue::Select("In Progress".into()));
        if let Some(token) = token {
            record = record.with(Field::LockToken, PropertyValue::Text(token.into()));
        }
        if let Some(expires) = expires {
            record = record.with(Field::LockExpires, PropertyValue::Date(format_timestamp(expires)));
        }
        TaskRecord::from_record(&record)
    }

    #[test]
    fn claim_round_trip() {
        let record = locked(Some("T"), Some(now()));
        assert_eq!(verify_claim(&record, &LockToken::new("T")), LockVerdict::Success);
        assert_eq!(verify_claim(&record, &LockToken::new("U")), LockVerdict::Conflict);
    }

    #[test]
    fn claim_on_unlocked_record_is_conflict() {
        let record = locked(None, None);
        assert_eq!(verify_claim(&record, &LockToken::new("T")), LockVerdict::Conflict);
    }

    #[rstest]
    #[case::valid(Some("T"), Some(15), LockVerdict::Success)]
    #[case::wrong_token(Some("U"), Some(15), LockVerdict::LostLock)]
    #[case::expired(Some("T"), Some(-2), LockVerdict::LostLock)]
    #[case::expires_now(Some("T"), Some(0), LockVerdict::LostLock)]
    #[case::no_expiry(Some("T"), None, LockVerdict::LostLock)]
    #[case::no_token(None, Some(15), LockVerdict::LostLock)]
    fn verify_lock_cases(
        #[case] token: Option<&str>,
        #[case] minutes_left: Option<i64>,
        #[case] expected: LockVerdict,
    ) {
        let expires = minutes_left.map(|m| now() + Duration::minutes(m));
        let record = locked(token, expires);
        assert_eq!(verify_lock(&record, &LockToken::new("T"), now()), expected);
    }
}
