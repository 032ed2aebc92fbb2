//! Lease - 時間付きの排他 claim と時刻ユーティリティ
//!
//! Lease は `(lock_token, lock_expires)` の組です。
//! 所有権はトークンの一致で、有効性は `now < lock_expires` で判定します。
//!
//! # 学習ポイント
//! - 時刻はすべて `DateTime<Utc>` で扱い、文字列化は境界でのみ行う
//! - ストアが返すタイムスタンプは秒精度とミリ秒精度が混在するので、パースは寛容に

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::LockToken;

/// ISO-8601, second precision, `Z` suffix (`2025-01-01T12:00:00Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses RFC 3339 with or without fractional seconds and any offset.
/// Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `from + minutes`.
pub fn lease_expiry(from: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    from + Duration::minutes(i64::from(minutes))
}

/// A lease is valid strictly before its expiry.
pub fn is_expired(expires: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires <= now
}

/// Lease は token と期限のペア
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub token: LockToken,
    pub expires: DateTime<Utc>,
}

impl Lease {
    pub fn new(token: LockToken, expires: DateTime<Utc>) -> Self {
        Self { token, expires }
    }

    /// token が一致し、かつ期限内であれば有効
    pub fn is_held_by(&self, token: &LockToken, now: DateTime<Utc>) -> bool {
        &self.token == token && !is_expired(self.expires, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn formats_with_second_precision_and_z() {
        assert_eq!(format_timestamp(noon()), "2025-03-01T12:00:00Z");
    }

    #[rstest]
    #[case::plain("2025-03-01T12:00:00Z")]
    #[case::millis("2025-03-01T12:00:00.000Z")]
    #[case::offset("2025-03-01T21:00:00+09:00")]
    fn parses_store_timestamps(#[case] raw: &str) {
        assert_eq!(parse_timestamp(raw), Some(noon()));
    }

    #[rstest]
    #[case::empty("")]
    #[case::date_only("2025-03-01")]
    #[case::garbage("soon")]
    fn rejects_unparseable_timestamps(#[case] raw: &str) {
        assert_eq!(parse_timestamp(raw), None);
    }

    #[test]
    fn lease_expiry_adds_minutes() {
        let expires = lease_expiry(noon(), 15);
        assert_eq!(format_timestamp(expires), "2025-03-01T12:15:00Z");
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let expires = noon();
        assert!(!is_expired(expires, expires - Duration::seconds(1)));
        assert!(is_expired(expires, expires));
        assert!(is_expired(expires, expires + Duration::minutes(2)));
    }

    #[test]
    fn lease_requires_token_and_time() {
        let lease = Lease::new(LockToken::new("tok-A"), lease_expiry(noon(), 15));

        assert!(lease.is_held_by(&LockToken::new("tok-A"), noon()));
        assert!(!lease.is_held_by(&LockToken::new("tok-B"), noon()));
        assert!(!lease.is_held_by(
            &LockToken::new("tok-A"),
            noon() + Duration::minutes(17)
        ));
    }
}
