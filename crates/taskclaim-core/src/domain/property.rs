//! Untyped record properties as exchanged with the record store.
//!
//! The store is schemaless from the core's point of view: a record is a bag
//! of named values. [`Field`] pins down the names the claim protocol reads
//! and writes, and [`PropertyChanges`] is the single batched update a
//! transition sends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::ids::RecordId;

/// Assignee value reserved for human operators. Never auto-claimed.
pub const HUMAN_ASSIGNEE: &str = "HUMAN";

/// Assignee value written by agents on claim.
pub const AGENT_ASSIGNEE: &str = "AGENT";

/// One property value.
///
/// `Empty` read from the store means "unset"; written, it means "clear".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Number(i64),
    Select(String),
    Date(String),
    Empty,
}

impl PropertyValue {
    /// Text-ish content, with empty strings treated as absent.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Select(s) | PropertyValue::Date(s)
                if !s.trim().is_empty() =>
            {
                Some(s.as_str())
            }
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Empty => true,
            PropertyValue::Number(_) => false,
            _ => self.as_text().is_none(),
        }
    }
}

/// Storage shape of a field, used by adapters to encode writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    RichText,
    Select,
    Number,
    Date,
    /// Computed by the store; read-only.
    Rollup,
    /// Assigned by the store; read-only.
    UniqueId,
}

impl FieldKind {
    pub fn is_writable(self) -> bool {
        !matches!(self, FieldKind::Rollup | FieldKind::UniqueId)
    }
}

/// Properties the claim protocol knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    TaskId,
    Title,
    Status,
    Priority,
    Class,
    ClaimedBy,
    AgentRun,
    Agent,
    LockToken,
    LockExpires,
    StartedAt,
    DoneAt,
    BlockerReason,
    UnblockAction,
    NextCheckAt,
    Artifacts,
    Parent,
    Dependencies,
    CompletedSubtasks,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::TaskId,
        Field::Title,
        Field::Status,
        Field::Priority,
        Field::Class,
        Field::ClaimedBy,
        Field::AgentRun,
        Field::Agent,
        Field::LockToken,
        Field::LockExpires,
        Field::StartedAt,
        Field::DoneAt,
        Field::BlockerReason,
        Field::UnblockAction,
        Field::NextCheckAt,
        Field::Artifacts,
        Field::Parent,
        Field::Dependencies,
        Field::CompletedSubtasks,
    ];

    /// Property name in the store.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::TaskId => "ID",
            Field::Title => "Title",
            Field::Status => "Status",
            Field::Priority => "Priority",
            Field::Class => "Class",
            Field::ClaimedBy => "Claimed By",
            Field::AgentRun => "Agent Run",
            Field::Agent => "Agent",
            Field::LockToken => "Lock Token",
            Field::LockExpires => "Lock Expires",
            Field::StartedAt => "Started At",
            Field::DoneAt => "Done At",
            Field::BlockerReason => "BlockerReason",
            Field::UnblockAction => "UnblockAction",
            Field::NextCheckAt => "NextCheckAt",
            Field::Artifacts => "Artifacts",
            Field::Parent => "Parent",
            Field::Dependencies => "Dependencies",
            Field::CompletedSubtasks => "Completed Subtasks",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::TaskId => FieldKind::UniqueId,
            Field::Title => FieldKind::Title,
            Field::Status | Field::Class | Field::ClaimedBy | Field::Agent => FieldKind::Select,
            Field::Priority => FieldKind::Number,
            Field::LockExpires | Field::StartedAt | Field::DoneAt | Field::NextCheckAt => {
                FieldKind::Date
            }
            Field::Dependencies | Field::CompletedSubtasks => FieldKind::Rollup,
            Field::AgentRun
            | Field::LockToken
            | Field::BlockerReason
            | Field::UnblockAction
            | Field::Artifacts
            | Field::Parent => FieldKind::RichText,
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Fields cleared whenever a transition releases the lease.
pub const LOCK_FIELDS: [Field; 5] = [
    Field::ClaimedBy,
    Field::AgentRun,
    Field::Agent,
    Field::LockToken,
    Field::LockExpires,
];

/// A batched property update: field -> new value (`Empty` clears).
///
/// # 使用例
/// ```ignore
/// let changes = PropertyChanges::new()
///     .set(Field::Status, PropertyValue::Select("Review".into()))
///     .release_lock();
/// store.update(&record_id, &changes).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyChanges {
    values: BTreeMap<Field, PropertyValue>,
}

impl PropertyChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: PropertyValue) -> Self {
        self.values.insert(field, value);
        self
    }

    /// Sets the field only when a value is given.
    pub fn set_opt(self, field: Field, value: Option<PropertyValue>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn clear(self, field: Field) -> Self {
        self.set(field, PropertyValue::Empty)
    }

    /// Clears every lock and assignee field.
    pub fn release_lock(self) -> Self {
        LOCK_FIELDS.into_iter().fold(self, PropertyChanges::clear)
    }

    pub fn get(&self, field: Field) -> Option<&PropertyValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &PropertyValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

/// A record as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Set by the store on every write; raw timestamp text.
    pub last_edited_time: Option<String>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
            last_edited_time: None,
        }
    }

    pub fn get(&self, field: Field) -> Option<&PropertyValue> {
        self.properties.get(field.as_str())
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(PropertyValue::as_text)
    }

    pub fn number(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(PropertyValue::as_number)
    }

    /// Builder-style setter, mostly for tests and the in-memory store.
    pub fn with(mut self, field: Field, value: PropertyValue) -> Self {
        self.properties.insert(field.as_str().to_string(), value);
        self
    }

    /// Applies a batched update in place.
    pub fn apply(&mut self, changes: &PropertyChanges) {
        for (field, value) in changes.iter() {
            self.properties.insert(field.as_str().to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_lock_clears_all_lock_fields() {
        let changes = PropertyChanges::new()
            .set(Field::Status, PropertyValue::Select("Review".into()))
            .release_lock();

        for field in LOCK_FIELDS {
            assert_eq!(changes.get(field), Some(&PropertyValue::Empty));
        }
        assert!(!changes.contains(Field::StartedAt));
    }

    #[test]
    fn apply_overwrites_and_clears() {
        let mut record = Record::new(RecordId::new("r1"))
            .with(Field::LockToken, PropertyValue::Text("tok-A".into()))
            .with(Field::Priority, PropertyValue::Number(3));

        record.apply(&PropertyChanges::new().clear(Field::LockToken));

        assert_eq!(record.text(Field::LockToken), None);
        assert_eq!(record.number(Field::Priority), Some(3));
    }

    #[test]
    fn empty_text_reads_as_absent() {
        let record = Record::new(RecordId::new("r1"))
            .with(Field::AgentRun, PropertyValue::Text("   ".into()));
        assert_eq!(record.text(Field::AgentRun), None);
        assert!(record.get(Field::AgentRun).is_some_and(PropertyValue::is_empty));
    }

    #[test]
    fn field_names_resolve_back() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert!(!Field::Dependencies.kind().is_writable());
        assert!(Field::LockExpires.kind().is_writable());
    }
}
