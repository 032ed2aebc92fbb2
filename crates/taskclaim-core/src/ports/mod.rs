//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（リモートレコードストア、ローカルファイル、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - リモートレコードストアが source of truth（正本）
//! - ローカルには claim 状態 1 件だけを持つ
//! - 時刻と ID 生成は差し替え可能（テストで決定的にするため）

pub mod record_store;
pub mod claim_state;
pub mod clock;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::record_store::{RecordFilter, RecordStore, StoreError, redact};
pub use self::claim_state::{ClaimStateError, ClaimStateStore};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
