//! App - アプリケーション層（コマンド層）
//!
//! このモジュールは、ports を組み合わせてタスクのライフサイクル遷移を実装します。
//!
//! # 主要コンポーネント
//! - **TaskServiceBuilder**: サービスの構築とワイヤリング
//! - **TaskService**: 遷移ごとの操作（claim, heartbeat, review, approve, rework,
//!   block, unblock, cancel, complete）と管理操作（next, list, get, create, comment, update）

pub mod builder;
pub mod service;
pub mod claim;
pub mod review;
pub mod block;
pub mod cancel;
pub mod query;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, TaskServiceBuilder};
pub use self::service::{LockSource, ServiceConfig, TaskService};
pub use self::claim::Claimed;
pub use self::block::BlockReason;
pub use self::cancel::CancelOutcome;
pub use self::query::{NewTask, TaskUpdate};
