//! Domain model (IDs, status, properties, task records, leases, claim state).

pub mod ids;
pub mod status;
pub mod property;
pub mod record;
pub mod lease;
pub mod claim;

pub use ids::{LockToken, RecordId, RunId, TaskId};
pub use status::{ClassOfService, TaskStatus, UnknownValue};
pub use property::{
    AGENT_ASSIGNEE, Field, FieldKind, HUMAN_ASSIGNEE, LOCK_FIELDS, PropertyChanges, PropertyValue,
    Record,
};
pub use record::TaskRecord;
pub use lease::{Lease, format_timestamp, is_expired, lease_expiry, parse_timestamp};
pub use claim::ClaimState;
