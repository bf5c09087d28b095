use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::property::ObjectType;
use crate::validate::ValidationError;

/// Presentation style of a saved view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    List,
    Kanban,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Kanban => "kanban",
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "kanban" => Ok(Self::Kanban),
            other => Err(ValidationError::InvalidEnum {
                kind: "view type",
                value: other.to_string(),
            }),
        }
    }
}

/// Declarative filter a view resolves against the property relation.
///
/// `includes` / `excludes` map a field id to a value set. An empty set means
/// "the field is present" (include) or "the field is absent" (exclude).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Query {
    #[serde(default)]
    pub includes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub excludes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl Query {
    pub fn channel_scope(&self) -> Option<&str> {
        non_blank(self.channel_id.as_deref())
    }

    pub fn team_scope(&self) -> Option<&str> {
        non_blank(self.team_id.as_deref())
    }

    pub fn has_field_criteria(&self) -> bool {
        !self.includes.is_empty() || !self.excludes.is_empty()
    }

    /// Whether the view can be served straight from a channel timeline.
    pub fn is_channel_only(&self) -> bool {
        self.channel_scope().is_some() && !self.has_field_criteria()
    }

    /// Every field id referenced by `includes` or `excludes`, deduplicated.
    pub fn field_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .includes
            .keys()
            .chain(self.excludes.keys())
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortKey {
    pub field_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Presentation metadata stored alongside a view's query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Format {
    #[serde(default)]
    pub order: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_field_id: Option<String>,
    /// Field id to values hidden from display (e.g. collapsed kanban columns).
    #[serde(default)]
    pub hidden_values: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub root_object: ObjectType,
}

/// A named, shareable query plus presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct View {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
    pub create_at: i64,
    pub query: Query,
    #[serde(default)]
    pub format: Format,
}

/// Restricts a view's visibility to the listed users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewMember {
    pub view_id: String,
    pub user_id: String,
}
