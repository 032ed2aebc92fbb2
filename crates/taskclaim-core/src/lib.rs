//! taskclaim-core
//!
//! Lease-based task claiming over a shared remote record store.
//! Many short-lived agent processes pull, claim, work and release tasks
//! without a central coordinator; the store is the only shared state.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, property, record, lease, claim）
//! - **ports**: 抽象化レイヤー（RecordStore, ClaimStateStore, Clock, IdGenerator）
//! - **policy**: 純粋関数（lock 検証, pull policy）
//! - **app**: コマンド層（TaskServiceBuilder, TaskService）
//! - **impls**: 実装（InMemoryRecordStore, FileClaimStateStore など）
//! - **error**: コマンド層のエラー分類（TaskError）

pub mod domain;
pub mod ports;
pub mod policy;
pub mod app;
pub mod impls;
pub mod error;

pub use app::{LockSource, ServiceConfig, TaskService, TaskServiceBuilder};
pub use error::TaskError;
