//! Shared API types, error taxonomy, and SQL builders for propview.
//!
//! This crate is the single source of truth for request/response shapes.
//! The `backend` feature adds the SQL layer (`db`) used by the server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "backend")]
pub mod db;
pub mod service;

pub use propview_core::{
    Channel, ChannelType, FieldType, Format, ObjectType, Post, Property, PropertyField,
    PropertyValue, Query, View, ViewMember, ViewType,
};

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Upper bound for any JSON document stored in a column.
pub const MAX_JSON_LENGTH: usize = 256 * 1024;

/// Page size for view queries when the client does not send one.
pub const DEFAULT_QUERY_PER_PAGE: i64 = 60;

/// Result cap for field autocomplete.
pub const MAX_FIELDS_TO_AUTOCOMPLETE: i64 = 200;

/// Header the host runtime sets to identify the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Concrete `OFFSET` / `LIMIT` for a `(page, per_page)` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Negative inputs are treated as zero; `offset = page * per_page`.
pub fn page_window(page: i64, per_page: i64) -> PageWindow {
    let page = page.max(0) as u64;
    let per_page = per_page.max(0) as u64;
    PageWindow {
        offset: page.saturating_mul(per_page),
        limit: per_page,
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Body of `POST /field` and `PUT /field/{id}`.
///
/// `type` and `values` are kept loose here so that bad input turns into a
/// 400 with a precise message instead of a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub values: Option<Vec<serde_json::Value>>,
}

/// Filter for listing fields.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    pub team_id: String,
    /// When set, global (team-less) fields are not added to a team listing.
    pub exclude_higher_level_fields: bool,
    pub search_term: String,
    pub page: i64,
    pub per_page: i64,
}

/// Query string of `GET /field/autocomplete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

// ─── Properties ──────────────────────────────────────────────────────────────

/// Body of `POST /property`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePropertyRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub property_field_id: String,
    #[serde(default)]
    pub value: Option<Vec<serde_json::Value>>,
}

/// Body of `PUT /property/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePropertyValueRequest {
    #[serde(default)]
    pub value: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResyncResponse {
    pub updated: usize,
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// Body of `POST /view`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateViewRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub view_type: String,
    #[serde(default)]
    pub query: Query,
    #[serde(default)]
    pub format: Format,
}

/// Body of `PATCH /view/{id}`. Each present part fully replaces the stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub query: Option<Query>,
    #[serde(default)]
    pub format: Option<Format>,
}

impl ViewPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.query.is_none() && self.format.is_none()
    }
}

/// Body of `POST /view/{id}/member`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddViewMemberRequest {
    pub user_id: String,
}

/// Query string of `GET /view/{id}/query`.
///
/// Values that fail to parse fall back to the defaults rather than failing
/// the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQueryParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub per_page: Option<String>,
}

impl ViewQueryParams {
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn per_page(&self, default: i64) -> i64 {
        self.per_page
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// A resolved page of a view: the objects plus their properties by object id.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ObjectsResponse {
    pub posts: Vec<Post>,
    pub properties: BTreeMap<String, Vec<Property>>,
}

// ─── Generic responses ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ──────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code. The server turns these into
/// `{"error": "..."}` responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    NotImplemented(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::NotImplemented(_) => 501,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::NotImplemented(m)
            | Self::Internal(m) => m,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Build a closure that wraps a DB/IO error as `Internal` with context.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<propview_core::ValidationError> for ServiceError {
    fn from(e: propview_core::ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_clamps_negative_inputs() {
        assert_eq!(
            page_window(1, 10),
            PageWindow {
                offset: 10,
                limit: 10
            }
        );
        assert_eq!(
            page_window(-3, 10),
            PageWindow {
                offset: 0,
                limit: 10
            }
        );
        assert_eq!(page_window(2, -1), PageWindow { offset: 0, limit: 0 });
    }

    #[test]
    fn view_query_params_fall_back_on_garbage() {
        let params = ViewQueryParams {
            page: Some("two".into()),
            per_page: None,
        };
        assert_eq!(params.page(), 0);
        assert_eq!(params.per_page(DEFAULT_QUERY_PER_PAGE), 60);

        let params = ViewQueryParams {
            page: Some("3".into()),
            per_page: Some("15".into()),
        };
        assert_eq!(params.page(), 3);
        assert_eq!(params.per_page(DEFAULT_QUERY_PER_PAGE), 15);
    }

    #[test]
    fn validation_errors_become_bad_requests() {
        let err: ServiceError = propview_core::ValidationError::UnconstrainedQuery.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            ApiError::from(&err).error,
            "query must have includes, excludes, or a channel_id"
        );
    }

    #[test]
    fn view_patch_emptiness() {
        assert!(ViewPatch::default().is_empty());
        let patch: ViewPatch = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert!(!patch.is_empty());
    }
}
