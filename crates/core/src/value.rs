use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::field::{FieldType, PropertyField};
use crate::validate::ValidationError;

/// A property value, typed by the field it belongs to.
///
/// On the wire and in storage a value is always a flat list of strings;
/// `to_list` gives that shape. `Empty` is valid for every field type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropertyValue {
    #[default]
    Empty,
    Text(String),
    /// Chosen options, in first-seen order without duplicates.
    Select(Vec<String>),
    User(String),
    Post(String),
}

impl PropertyValue {
    /// Validate a raw wire list against `field` and build the typed value.
    pub fn parse(field: &PropertyField, raw: &[serde_json::Value]) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Ok(Self::Empty);
        }

        let strings = raw
            .iter()
            .enumerate()
            .map(|(index, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or(ValidationError::NonStringValue { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match field.field_type {
            FieldType::Text => single(FieldType::Text, strings).map(Self::Text),
            FieldType::User => single_id(FieldType::User, strings).map(Self::User),
            FieldType::Post => single_id(FieldType::Post, strings).map(Self::Post),
            FieldType::Select => {
                let mut chosen: Vec<String> = Vec::with_capacity(strings.len());
                for option in strings {
                    if !field.allows_option(&option) {
                        return Err(ValidationError::OptionNotAllowed {
                            field_id: field.id.clone(),
                            value: option,
                        });
                    }
                    if !chosen.contains(&option) {
                        chosen.push(option);
                    }
                }
                Ok(Self::Select(chosen))
            }
        }
    }

    /// Rebuild a value read back from storage.
    ///
    /// Stored rows were validated when written and are conformed whenever
    /// their field changes, so membership is not re-checked here.
    pub fn from_stored(field_type: FieldType, list: Vec<String>) -> Self {
        let mut list = list.into_iter();
        match field_type {
            FieldType::Select => {
                let mut chosen: Vec<String> = Vec::new();
                for option in list {
                    if !chosen.contains(&option) {
                        chosen.push(option);
                    }
                }
                if chosen.is_empty() {
                    Self::Empty
                } else {
                    Self::Select(chosen)
                }
            }
            FieldType::Text => list.next().map_or(Self::Empty, Self::Text),
            FieldType::User => list.next().map_or(Self::Empty, Self::User),
            FieldType::Post => list.next().map_or(Self::Empty, Self::Post),
        }
    }

    /// Fit a stored list to `field` after the field itself changed.
    ///
    /// Select options the field no longer offers are dropped. A list a
    /// single-valued type cannot hold becomes `Empty`.
    pub fn conform(field: &PropertyField, stored: &[String]) -> Self {
        match field.field_type {
            FieldType::Select => Self::from_stored(
                FieldType::Select,
                stored
                    .iter()
                    .filter(|option| field.allows_option(option))
                    .cloned()
                    .collect(),
            ),
            FieldType::Text | FieldType::User | FieldType::Post => {
                let raw: Vec<serde_json::Value> = stored
                    .iter()
                    .map(|s| serde_json::Value::from(s.as_str()))
                    .collect();
                Self::parse(field, &raw).unwrap_or_default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Flat string list used for storage and query matching.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::Text(s) | Self::User(s) | Self::Post(s) => vec![s.clone()],
            Self::Select(options) => options.clone(),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let list = self.to_list();
        let mut seq = serializer.serialize_seq(Some(list.len()))?;
        for item in &list {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

fn single(field_type: FieldType, mut strings: Vec<String>) -> Result<String, ValidationError> {
    if strings.len() > 1 {
        return Err(ValidationError::TooManyValues {
            field_type,
            count: strings.len(),
        });
    }
    Ok(strings.remove(0))
}

fn single_id(field_type: FieldType, strings: Vec<String>) -> Result<String, ValidationError> {
    let id = single(field_type, strings)?;
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ValidationError::BlankReference { field_type });
    }
    Ok(id)
}
