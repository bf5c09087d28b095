use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};

use propview_api::{AutocompleteParams, FieldRequest, OkResponse, PropertyField};

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::ActingUser;
use crate::services::Access;

/// Field mutations carry no policy yet; both outcomes let the request through.
fn check_field_access(state: &AppState, user_id: &str, field_id: Option<&str>) {
    match state.permissions.can_manage_field(user_id, field_id) {
        Access::Granted | Access::Unchecked => {}
    }
}

/// POST /api/v1/field: create a property field.
pub async fn create_field(
    State(state): State<AppState>,
    user: ActingUser,
    payload: Result<Json<FieldRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErr> {
    let Json(req) = payload?;
    check_field_access(&state, &user.user_id, None);
    let field = state.fields.create(&req, &user.user_id)?;
    let location = state.config.location(&format!("field/{}", field.id));
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(field)))
}

/// GET /api/v1/field/{id}
pub async fn get_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PropertyField>, ApiErr> {
    Ok(Json(state.fields.get(&id)?))
}

/// PUT /api/v1/field/{id}: replace a field's name, type, team and values.
pub async fn update_field(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    payload: Result<Json<FieldRequest>, JsonRejection>,
) -> Result<Json<PropertyField>, ApiErr> {
    let Json(req) = payload?;
    check_field_access(&state, &user.user_id, Some(&id));
    Ok(Json(state.fields.update(&id, &req, &user.user_id)?))
}

/// DELETE /api/v1/field/{id}: delete a field and its properties.
pub async fn delete_field(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    check_field_access(&state, &user.user_id, Some(&id));
    state.fields.delete(&id)?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/v1/field/autocomplete?term=&team_id=: name search, capped.
pub async fn autocomplete_fields(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<PropertyField>>, ApiErr> {
    let fields = state.fields.autocomplete(
        params.term.as_deref().unwrap_or_default(),
        params.team_id.as_deref().unwrap_or_default(),
        state.config.autocomplete_limit,
    )?;
    Ok(Json(fields))
}
