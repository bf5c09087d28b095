use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};

use propview_api::{
    AddViewMemberRequest, CreateViewRequest, ObjectsResponse, View, ViewMember, ViewPatch,
    ViewQueryParams,
};

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::ActingUser;

/// POST /api/v1/view: save a new view.
pub async fn create_view(
    State(state): State<AppState>,
    _user: ActingUser,
    payload: Result<Json<CreateViewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErr> {
    let Json(req) = payload?;
    let view = state.views.create(&req)?;
    let location = state.config.location(&format!("view/{}", view.id));
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(view)))
}

/// GET /api/v1/view/{id}
pub async fn get_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<View>, ApiErr> {
    Ok(Json(state.views.get(&id)?))
}

/// PATCH /api/v1/view/{id}: replace any of title, query or format.
pub async fn patch_view(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<String>,
    payload: Result<Json<ViewPatch>, JsonRejection>,
) -> Result<Json<View>, ApiErr> {
    let Json(patch) = payload?;
    Ok(Json(state.views.update(&id, &patch)?))
}

/// GET /api/v1/view/{id}/query?page=&per_page=: resolve a page of a view.
pub async fn query_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewQueryParams>,
) -> Result<Json<ObjectsResponse>, ApiErr> {
    let page = params.page();
    let per_page = params.per_page(state.config.default_per_page);
    Ok(Json(state.views.get_objects_for_view(&id, page, per_page)?))
}

/// POST /api/v1/view/{id}/member: restrict a view to an additional user.
pub async fn add_view_member(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<String>,
    payload: Result<Json<AddViewMemberRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErr> {
    let Json(req) = payload?;
    state.views.add_user_to_view(&req.user_id, &id)?;
    Ok((
        StatusCode::CREATED,
        Json(ViewMember {
            view_id: id,
            user_id: req.user_id.trim().to_string(),
        }),
    ))
}

/// GET /api/v1/view/user/{id}: views visible to a user.
pub async fn views_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<View>>, ApiErr> {
    Ok(Json(state.views.get_for_user(&user_id)?))
}
