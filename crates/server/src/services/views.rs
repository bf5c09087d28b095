use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::Arc;

use propview_api::db;
use propview_api::service::{encode_json_column, validate_view_request};
use propview_api::{
    CreateViewRequest, ObjectType, ObjectsResponse, Post, Query, ServiceError, View, ViewPatch,
};
use propview_core::validate::{ValidationError, validate_view_query, validate_view_title};
use propview_core::{new_id, now_millis};

use super::properties::PropertyService;
use crate::host::HostStore;
use crate::storage::{Db, sq_execute, sq_query_map, sq_query_row, view_from_row};

/// Saved views: storage, visibility and resolution to posts.
#[derive(Clone)]
pub struct ViewService {
    db: Db,
    host: Arc<dyn HostStore>,
    properties: PropertyService,
}

fn find_view(conn: &Connection, id: &str) -> Result<Option<View>, ServiceError> {
    sq_query_row(conn, db::views::get_by_id(id), view_from_row)
        .optional()
        .map_err(ServiceError::from_db(&format!("get view {id}")))
}

fn view_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("view {id} not found"))
}

impl ViewService {
    pub fn new(db: Db, host: Arc<dyn HostStore>, properties: PropertyService) -> Self {
        Self {
            db,
            host,
            properties,
        }
    }

    pub fn create(&self, req: &CreateViewRequest) -> Result<View, ServiceError> {
        let input = validate_view_request(req)?;
        let view = View {
            id: new_id(),
            title: input.title,
            view_type: input.view_type,
            create_at: now_millis(),
            query: input.query,
            format: input.format,
        };
        let query_json = encode_json_column("view query", &view.id, &view.query)?;
        let format_json = encode_json_column("view format", &view.id, &view.format)?;

        self.db.with_tx("create view", |tx| {
            sq_execute(
                tx,
                db::views::insert(&db::views::InsertParams {
                    id: &view.id,
                    title: &view.title,
                    view_type: view.view_type.as_str(),
                    create_at: view.create_at,
                    query_json: &query_json,
                    format_json: &format_json,
                }),
            )
            .map_err(ServiceError::from_db(&format!("insert view {}", view.id)))?;
            Ok(())
        })?;
        tracing::info!(view_id = %view.id, view_type = %view.view_type, "created view");
        Ok(view)
    }

    pub fn get(&self, id: &str) -> Result<View, ServiceError> {
        self.db
            .with_tx("get view", |tx| find_view(tx, id))?
            .ok_or_else(|| view_not_found(id))
    }

    /// Apply a partial patch. Each present part replaces the stored one.
    pub fn update(&self, id: &str, patch: &ViewPatch) -> Result<View, ServiceError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        let title = patch.title.as_deref().map(validate_view_title).transpose()?;
        if let Some(query) = &patch.query {
            validate_view_query(query)?;
        }
        let query_json = patch
            .query
            .as_ref()
            .map(|q| encode_json_column("view query", id, q))
            .transpose()?;
        let format_json = patch
            .format
            .as_ref()
            .map(|f| encode_json_column("view format", id, f))
            .transpose()?;

        let params = db::views::UpdateParams {
            title: title.as_deref(),
            query_json: query_json.as_deref(),
            format_json: format_json.as_deref(),
        };
        self.db.with_tx("update view", |tx| {
            let Some(built) = db::views::update(id, &params) else {
                return Err(ValidationError::EmptyPatch.into());
            };
            let changed = sq_execute(tx, built)
                .map_err(ServiceError::from_db(&format!("update view {id}")))?;
            if changed == 0 {
                return Err(view_not_found(id));
            }
            find_view(tx, id)?.ok_or_else(|| view_not_found(id))
        })
    }

    /// Restrict a view to `user_id` (in addition to existing members).
    pub fn add_user_to_view(&self, user_id: &str, view_id: &str) -> Result<(), ServiceError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ValidationError::MissingField { field: "user_id" }.into());
        }
        self.db.with_tx("add view member", |tx| {
            if find_view(tx, view_id)?.is_none() {
                return Err(view_not_found(view_id));
            }
            let existing: i64 = sq_query_row(tx, db::view_members::exists(view_id, user_id), |row| {
                row.get(0)
            })
            .map_err(ServiceError::from_db(&format!("check member of view {view_id}")))?;
            if existing > 0 {
                return Err(ServiceError::Conflict(format!(
                    "user {user_id} is already a member of view {view_id}"
                )));
            }
            sq_execute(tx, db::view_members::insert(view_id, user_id))
                .map_err(ServiceError::from_db(&format!("insert member of view {view_id}")))?;
            Ok(())
        })?;
        tracing::info!(view_id, user_id, "added view member");
        Ok(())
    }

    /// Member user ids of a view, sorted.
    pub fn members(&self, view_id: &str) -> Result<Vec<String>, ServiceError> {
        self.db.with_tx("list view members", |tx| {
            sq_query_map(tx, db::view_members::list_for_view(view_id), |row| row.get(0))
                .map_err(ServiceError::from_db(&format!("list members of view {view_id}")))
        })
    }

    /// Views `user_id` can see: those listing them as a member, plus every
    /// view without members.
    pub fn get_for_user(&self, user_id: &str) -> Result<Vec<View>, ServiceError> {
        self.db.with_tx("get views for user", |tx| {
            sq_query_map(tx, db::views::list_for_user(user_id), view_from_row)
                .map_err(ServiceError::from_db(&format!("get views for user {user_id}")))
        })
    }

    /// Run the query compiler and return a page of matching post ids.
    pub fn query_objects(
        &self,
        query: &Query,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<String>, ServiceError> {
        let built = db::query::query_objects(query, Some(ObjectType::Post), page, per_page)?;
        tracing::debug!(sql = %built.0, "compiled view query");
        self.db.with_tx("query objects", |tx| {
            sq_query_map(tx, built, |row| row.get(0))
                .map_err(ServiceError::from_db("query objects"))
        })
    }

    /// Resolve a page of a view to posts with their properties attached.
    pub fn get_objects_for_view(
        &self,
        id: &str,
        page: i64,
        per_page: i64,
    ) -> Result<ObjectsResponse, ServiceError> {
        let view = self.get(id)?;

        let posts: Vec<Post> = match view.query.channel_scope() {
            Some(channel_id) if view.query.is_channel_only() => {
                tracing::debug!(view_id = %id, channel_id, "resolving view from channel timeline");
                self.host
                    .get_channel_posts(channel_id, page, per_page)?
                    .into_iter()
                    .filter(|post| !post.is_system())
                    .collect()
            }
            _ => {
                let ids = self.query_objects(&view.query, page, per_page)?;
                self.host.get_posts_by_ids(&ids)?
            }
        };

        let mut properties = BTreeMap::new();
        for post in &posts {
            let attached = match self.properties.get_for_object(&post.id) {
                Ok(list) => list,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            };
            properties.insert(post.id.clone(), attached);
        }

        Ok(ObjectsResponse { posts, properties })
    }
}
