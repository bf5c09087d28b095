//! Shared request validation as framework-agnostic pure functions.
//!
//! Route handlers and services call these to turn loose wire requests into
//! typed domain values, keeping the handlers as thin adapters.

use serde::Serialize;

use propview_core::validate::{
    validate_field_name, validate_field_options, validate_view_query, validate_view_title,
};
use propview_core::{FieldType, Format, ObjectType, Query, ViewType};

use crate::{
    CreatePropertyRequest, CreateViewRequest, FieldRequest, ServiceError, MAX_JSON_LENGTH,
};

// ─── Fields ─────────────────────────────────────────────────────────────────

/// Mutable attributes of a field after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInput {
    pub team_id: String,
    pub name: String,
    pub field_type: FieldType,
    pub values: Vec<String>,
}

/// Validate the body of a field create/update.
pub fn validate_field_request(req: &FieldRequest) -> Result<FieldInput, ServiceError> {
    let field_type: FieldType = req
        .field_type
        .parse()
        .map_err(|_| ServiceError::BadRequest("Invalid type".into()))?;
    let name =
        validate_field_name(&req.name).map_err(|_| ServiceError::BadRequest("Invalid name".into()))?;
    let values = validate_field_options(field_type, req.values.as_deref().unwrap_or_default())?;

    Ok(FieldInput {
        team_id: req.team_id.trim().to_string(),
        name,
        field_type,
        values,
    })
}

// ─── Properties ─────────────────────────────────────────────────────────────

/// A property create request that passed shape checks.
///
/// The value is still raw: it can only be typed once the field is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInput {
    pub object_id: String,
    pub object_type: ObjectType,
    pub property_field_id: String,
    pub value: Vec<serde_json::Value>,
}

/// Validate the shape of `POST /property`.
pub fn validate_property_request(req: &CreatePropertyRequest) -> Result<PropertyInput, ServiceError> {
    if !req.id.is_empty() {
        return Err(ServiceError::BadRequest("id must be blank".into()));
    }
    let object_type: ObjectType = req
        .object_type
        .parse()
        .map_err(|_| ServiceError::BadRequest("Invalid object_type".into()))?;
    let object_id = req.object_id.trim();
    if object_id.is_empty() {
        return Err(ServiceError::BadRequest("Invalid object_id".into()));
    }
    let property_field_id = req.property_field_id.trim();
    if property_field_id.is_empty() {
        return Err(ServiceError::BadRequest("Invalid property_field_id".into()));
    }

    Ok(PropertyInput {
        object_id: object_id.to_string(),
        object_type,
        property_field_id: property_field_id.to_string(),
        value: req.value.clone().unwrap_or_default(),
    })
}

// ─── Views ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewInput {
    pub title: String,
    pub view_type: ViewType,
    pub query: Query,
    pub format: Format,
}

/// Validate the body of `POST /view`. A missing type defaults to `list`.
pub fn validate_view_request(req: &CreateViewRequest) -> Result<ViewInput, ServiceError> {
    if !req.id.is_empty() {
        return Err(ServiceError::BadRequest("id must be blank".into()));
    }
    let title = validate_view_title(&req.title)?;
    let view_type = if req.view_type.trim().is_empty() {
        ViewType::default()
    } else {
        req.view_type.trim().parse::<ViewType>()?
    };
    validate_view_query(&req.query)?;

    Ok(ViewInput {
        title,
        view_type,
        query: req.query.clone(),
        format: req.format.clone(),
    })
}

// ─── JSON columns ───────────────────────────────────────────────────────────

/// Serialize a JSON column, enforcing [`MAX_JSON_LENGTH`].
pub fn encode_json_column<T: Serialize + ?Sized>(
    what: &str,
    id: &str,
    value: &T,
) -> Result<String, ServiceError> {
    let json = serde_json::to_string(value).map_err(|e| {
        ServiceError::Internal(format!("failed to marshal {what} json for id '{id}': {e}"))
    })?;
    if json.len() > MAX_JSON_LENGTH {
        return Err(ServiceError::BadRequest(format!(
            "{what} json for id '{id}' is too long (max {MAX_JSON_LENGTH})"
        )));
    }
    Ok(json)
}
