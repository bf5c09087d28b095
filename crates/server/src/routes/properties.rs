use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};

use propview_api::service::validate_property_request;
use propview_api::{
    CreatePropertyRequest, CreatedResponse, ObjectType, OkResponse, Property, ResyncResponse,
    UpdatePropertyValueRequest,
};

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::ActingUser;
use crate::services::Access;

/// Require that `user_id` may change properties of the object.
fn authorize(
    state: &AppState,
    user_id: &str,
    object_type: ObjectType,
    object_id: &str,
) -> Result<(), ApiErr> {
    match state
        .permissions
        .can_manage_property(user_id, object_type, object_id)?
    {
        Access::Granted | Access::Unchecked => Ok(()),
    }
}

/// POST /api/v1/property: attach a property to a post or channel.
pub async fn create_property(
    State(state): State<AppState>,
    user: ActingUser,
    payload: Result<Json<CreatePropertyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErr> {
    let Json(req) = payload?;
    let input = validate_property_request(&req)?;
    authorize(&state, &user.user_id, input.object_type, &input.object_id)?;

    let property = state.properties.create(&input, &user.user_id)?;
    let location = state.config.location(&format!("property/{}", property.id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreatedResponse { id: property.id }),
    ))
}

/// PUT /api/v1/property/{id}: replace a property's value.
pub async fn update_property(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePropertyValueRequest>, JsonRejection>,
) -> Result<Json<Property>, ApiErr> {
    let Json(req) = payload?;
    let existing = state.properties.get(&id)?;
    authorize(&state, &user.user_id, existing.object_type, &existing.object_id)?;
    let value = req.value.unwrap_or_default();
    Ok(Json(state.properties.update_value(&id, &value, &user.user_id)?))
}

/// DELETE /api/v1/property/{id}
pub async fn delete_property(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let existing = state.properties.get(&id)?;
    authorize(&state, &user.user_id, existing.object_type, &existing.object_id)?;
    state.properties.delete(&id)?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/v1/property/object/{objectID}: every property of an object.
pub async fn get_properties_for_object(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> Result<Json<Vec<Property>>, ApiErr> {
    Ok(Json(state.properties.get_for_object(&object_id)?))
}

/// POST /api/v1/property/object/{objectID}/resync: refresh cached channel
/// and team ids from the host.
pub async fn resync_object(
    State(state): State<AppState>,
    user: ActingUser,
    Path(object_id): Path<String>,
) -> Result<Json<ResyncResponse>, ApiErr> {
    let properties = state.properties.get_for_object(&object_id)?;
    let Some(first) = properties.first() else {
        return Ok(Json(ResyncResponse { updated: 0 }));
    };
    authorize(&state, &user.user_id, first.object_type, &object_id)?;
    let updated = state.properties.resync_object(&object_id)?;
    Ok(Json(ResyncResponse { updated }))
}
