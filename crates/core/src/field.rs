use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::validate::ValidationError;

/// Declared type of a property field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Select,
    User,
    Post,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Select => "select",
            Self::User => "user",
            Self::Post => "post",
        }
    }

    /// Only selectable fields carry an enumerated option list.
    pub fn has_options(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "select" => Ok(Self::Select),
            "user" => Ok(Self::User),
            "post" => Ok(Self::Post),
            other => Err(ValidationError::InvalidEnum {
                kind: "type",
                value: other.to_string(),
            }),
        }
    }
}

/// A named, typed schema element that properties are instances of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyField {
    pub id: String,
    /// Empty for a global (cross-team) field.
    #[serde(default)]
    pub team_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub update_by: String,
}

impl PropertyField {
    pub fn is_global(&self) -> bool {
        self.team_id.is_empty()
    }

    pub fn allows_option(&self, option: &str) -> bool {
        self.values.iter().any(|v| v == option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_round_trips_through_str() {
        for t in [
            FieldType::Text,
            FieldType::Select,
            FieldType::User,
            FieldType::Post,
        ] {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let err = "number".parse::<FieldType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid type: number");
    }

    #[test]
    fn field_serializes_type_key() {
        let field = PropertyField {
            id: "f1".into(),
            team_id: String::new(),
            name: "Status".into(),
            field_type: FieldType::Select,
            values: vec!["open".into()],
            update_at: 1,
            update_by: "u1".into(),
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "select");
        assert!(field.is_global());
        assert!(field.allows_option("open"));
        assert!(!field.allows_option("closed"));
    }
}
