//! Domain identifiers (strongly-typed IDs).
//!
//! # 文字列ベースの ID + Phantom Type
//! レコードストアが払い出す ID（ページ ID、"TASK-12" のような人間向け ID）は
//! 形式を制御できないため、中身は `String` で保持します。
//! 一方、このプロセスが生成する ID（run id, lock token）は ULID から作ります。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。
//! RecordId と LockToken を取り違えると、それだけで claim の検証が壊れるため、
//! 型で区別しておく価値があります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// 生成時に付けるプレフィックス（"run-", "lock-"）を提供します。
/// ストア由来の ID はプレフィックスを持たないので空文字列を返します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let record: RecordId = Id::new("2f1c0c7e-...");
/// let token: LockToken = Id::from_ulid(Ulid::new());
/// // record と token は異なる型なので、混同できない
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 既存の文字列から Id を作成（ストアから読んだ値など）
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// ULID から Id を作成（プレフィックス付き）
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(format!("{}{}", T::prefix(), ulid.to_string().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> PartialEq<str> for Id<T> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// ストア上のレコード（ページ）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Record {}

impl IdMarker for Record {
    fn prefix() -> &'static str {
        ""
    }
}

/// 人間向けタスク ID のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        ""
    }
}

/// Agent の実行（run）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Lease の所有権を示すトークンのマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lock {}

impl IdMarker for Lock {
    fn prefix() -> &'static str {
        "lock-"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Opaque identifier assigned by the record store.
pub type RecordId = Id<Record>;

/// Human-facing task identifier (e.g. `TASK-42`).
pub type TaskId = Id<Task>;

/// Identifier of one agent execution holding a claim.
pub type RunId = Id<Run>;

/// Token proving ownership of a lease.
pub type LockToken = Id<Lock>;
