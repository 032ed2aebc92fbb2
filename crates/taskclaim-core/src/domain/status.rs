//! Task lifecycle status and class of service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a status or class name does not match any known value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

/// Upper-case, trim, spaces to underscores. "In Progress" -> "IN_PROGRESS".
fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase().replace([' ', '-'], "_")
}

/// Task status.
///
/// State transitions (driven by the command layer):
/// - Ready -> InProgress (claim)
/// - InProgress -> InProgress (re-claim, heartbeat)
/// - InProgress -> Review -> Done | InProgress
/// - InProgress -> Blocked -> InProgress
/// - any non-terminal -> Canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    Ready,
    InProgress,
    Blocked,
    Review,
    Done,
    Canceled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Backlog,
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Canceled,
    ];

    /// Name written to the record store.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "Backlog",
            TaskStatus::Ready => "Ready",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
            TaskStatus::Canceled => "Canceled",
        }
    }

    /// Lenient parse: accepts "In Progress", "IN_PROGRESS", "in-progress".
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "BACKLOG" => Some(TaskStatus::Backlog),
            "READY" => Some(TaskStatus::Ready),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "BLOCKED" => Some(TaskStatus::Blocked),
            "REVIEW" => Some(TaskStatus::Review),
            "DONE" => Some(TaskStatus::Done),
            "CANCELED" | "CANCELLED" => Some(TaskStatus::Canceled),
            _ => None,
        }
    }

    /// Done and Canceled accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Canceled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::parse(s).ok_or_else(|| UnknownValue {
            kind: "status",
            value: s.to_string(),
            expected: TaskStatus::ALL.map(TaskStatus::as_str).join(", "),
        })
    }
}

/// Class of service: a priority band that dominates numeric priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassOfService {
    Expedite,
    FixedDate,
    #[default]
    Standard,
    Intangible,
}

impl ClassOfService {
    pub const ALL: [ClassOfService; 4] = [
        ClassOfService::Expedite,
        ClassOfService::FixedDate,
        ClassOfService::Standard,
        ClassOfService::Intangible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassOfService::Expedite => "Expedite",
            ClassOfService::FixedDate => "Fixed Date",
            ClassOfService::Standard => "Standard",
            ClassOfService::Intangible => "Intangible",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "EXPEDITE" => Some(ClassOfService::Expedite),
            "FIXED_DATE" | "FIXEDDATE" => Some(ClassOfService::FixedDate),
            "STANDARD" => Some(ClassOfService::Standard),
            "INTANGIBLE" => Some(ClassOfService::Intangible),
            _ => None,
        }
    }

    /// Sort rank, lower is pulled first.
    pub fn rank(self) -> u8 {
        match self {
            ClassOfService::Expedite => 1,
            ClassOfService::FixedDate => 2,
            ClassOfService::Standard => 3,
            ClassOfService::Intangible => 4,
        }
    }

    /// Missing or unrecognised classes rank as Standard.
    pub fn rank_of(class: Option<Self>) -> u8 {
        class.unwrap_or(ClassOfService::Standard).rank()
    }
}

impl fmt::Display for ClassOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassOfService {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassOfService::parse(s).ok_or_else(|| UnknownValue {
            kind: "class of service",
            value: s.to_string(),
            expected: ClassOfService::ALL.map(ClassOfService::as_str).join(", "),
        })
    }
}
