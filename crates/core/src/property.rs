use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::field::FieldType;
use crate::validate::ValidationError;
use crate::value::PropertyValue;

/// Kind of object a property attaches to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    #[default]
    Post,
    Channel,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Channel => "channel",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "channel" => Ok(Self::Channel),
            other => Err(ValidationError::InvalidEnum {
                kind: "object_type",
                value: other.to_string(),
            }),
        }
    }
}

/// A single field value attached to one object, joined with its field for display.
///
/// `channel_id` and `team_id` are copied from the owning post's channel when
/// the property is created. They are a cache: if the post later moves, they go
/// stale until the object's properties are explicitly re-synced.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Property {
    pub id: String,
    pub object_id: String,
    pub object_type: ObjectType,
    pub property_field_id: String,
    pub property_field_name: String,
    pub property_field_type: FieldType,
    pub property_field_values: Vec<String>,
    pub value: PropertyValue,
    pub channel_id: String,
    pub team_id: String,
}
