//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: 開発用・テスト用のレコードストア
//! - **FileClaimStateStore**: 本番用の claim 状態（JSON ファイル 1 つ）
//! - **InMemoryClaimStateStore**: テスト用の claim 状態
//!
//! # 本番用のレコードストア
//! 外部クライアントに依存する実装は CLI クレート側に配置します：
//! - `taskclaim-cli`: NotionCliStore（`notion` コマンド経由）

pub mod memory_store;
pub mod file_claim_state;
pub mod inmem_claim_state;

// 主要な型を再エクスポート
pub use self::memory_store::InMemoryRecordStore;
pub use self::file_claim_state::FileClaimStateStore;
pub use self::inmem_claim_state::InMemoryClaimStateStore;
