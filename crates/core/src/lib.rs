//! Core model for post/channel properties and saved views.
//!
//! Everything here is pure data plus write-time validation. Persistence and
//! HTTP live in `propview-api` and `propview-server`.

pub mod field;
pub mod host;
pub mod property;
pub mod validate;
pub mod value;
pub mod view;

pub use field::{FieldType, PropertyField};
pub use host::{Channel, ChannelType, Post};
pub use property::{ObjectType, Property};
pub use validate::ValidationError;
pub use value::PropertyValue;
pub use view::{Format, Query, SortDirection, SortKey, View, ViewMember, ViewType};

/// Generate a new server-side identifier (32 lowercase hex chars).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
