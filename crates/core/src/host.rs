//! Host-platform objects this service reads but does not own.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::validate::ValidationError;

/// Prefix the messaging platform uses for system-generated post types.
pub const SYSTEM_POST_TYPE_PREFIX: &str = "system_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub post_type: String,
    pub create_at: i64,
}

impl Post {
    pub fn is_system(&self) -> bool {
        self.post_type.starts_with(SYSTEM_POST_TYPE_PREFIX)
    }
}

/// Channel visibility class, using the host's single-letter codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelType {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "P")]
    Private,
    #[serde(rename = "D")]
    Direct,
    #[serde(rename = "G")]
    Group,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "O",
            Self::Private => "P",
            Self::Direct => "D",
            Self::Group => "G",
        }
    }
}

impl FromStr for ChannelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O" => Ok(Self::Open),
            "P" => Ok(Self::Private),
            "D" => Ok(Self::Direct),
            "G" => Ok(Self::Group),
            other => Err(ValidationError::InvalidEnum {
                kind: "channel type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
}
