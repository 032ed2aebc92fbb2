//! IdGenerator port - ID 生成の抽象化
//!
//! claim ごとに新しい run id と lock token を払い出します。
//! lock token はレース検出の唯一の手がかりなので、衝突しないことが重要です。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{LockToken, RunId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は claim に必要な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;

    fn generate_lock_token(&self) -> LockToken;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// 下位 80 bit は乱数なので、同一ミリ秒内でも衝突しません。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        RunId::from_ulid(self.next_ulid())
    }

    fn generate_lock_token(&self) -> LockToken {
        LockToken::from_ulid(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_tokens() {
        let id_gen = UlidGenerator::new(SystemClock);

        let t1 = id_gen.generate_lock_token();
        let t2 = id_gen.generate_lock_token();
        let t3 = id_gen.generate_lock_token();

        assert_ne!(t1, t2);
        assert_ne!(t2, t3);
        assert_ne!(t1, t3);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let a = id_gen.generate_run_id();
        let b = id_gen.generate_run_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(a, b);

        // timestamp 部分（先頭 10 文字）は同じ
        let expected = Ulid::from_parts(fixed_time.timestamp_millis() as u64, 0)
            .to_string()
            .to_lowercase();
        assert_eq!(&a.as_str()["run-".len().."run-".len() + 10], &expected[..10]);
        assert_eq!(&b.as_str()["run-".len().."run-".len() + 10], &expected[..10]);
    }

    #[test]
    fn run_ids_and_tokens_are_distinguishable() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_run_id().as_str().starts_with("run-"));
        assert!(id_gen.generate_lock_token().as_str().starts_with("lock-"));
    }
}
