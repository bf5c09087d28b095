//! Boundary to the messaging platform that owns posts, channels and
//! channel permissions.

use rusqlite::OptionalExtension;
use std::collections::HashMap;

use propview_api::db;
use propview_api::{Channel, Post, ServiceError};

use crate::storage::{Db, channel_from_row, post_from_row, sq_query_map, sq_query_row};

/// Channel role that grants property management.
const ADMIN_ROLE: &str = "admin";

/// Channel-scoped permissions the property gate asks the host about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreatePost,
    ManagePublicChannelProperties,
    ManagePrivateChannelProperties,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatePost => "create_post",
            Self::ManagePublicChannelProperties => "manage_public_channel_properties",
            Self::ManagePrivateChannelProperties => "manage_private_channel_properties",
        }
    }
}

/// Read access to host-owned objects.
///
/// Single-object lookups return `NotFound` when the object is absent.
pub trait HostStore: Send + Sync {
    fn get_post(&self, id: &str) -> Result<Post, ServiceError>;

    /// Posts for `ids`, in the order of `ids`. Unknown ids are skipped.
    fn get_posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, ServiceError>;

    fn get_channel(&self, id: &str) -> Result<Channel, ServiceError>;

    /// A page of a channel's timeline, newest first.
    fn get_channel_posts(
        &self,
        channel_id: &str,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<Post>, ServiceError>;

    fn has_permission_to_channel(
        &self,
        user_id: &str,
        channel_id: &str,
        permission: Permission,
    ) -> Result<bool, ServiceError>;
}

/// Host adapter reading the platform tables in the service's own database.
///
/// Channel members may post; members with the `admin` role may also manage
/// channel properties.
#[derive(Clone)]
pub struct SqliteHost {
    db: Db,
}

impl SqliteHost {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl HostStore for SqliteHost {
    fn get_post(&self, id: &str) -> Result<Post, ServiceError> {
        let conn = self.db.conn();
        sq_query_row(&conn, db::host::get_post(id), post_from_row)
            .optional()
            .map_err(ServiceError::from_db(&format!("get post {id}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("post {id} not found")))
    }

    fn get_posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.conn();
        let rows = sq_query_map(&conn, db::host::get_posts_by_ids(ids), post_from_row)
            .map_err(ServiceError::from_db("get posts by ids"))?;

        let mut by_id: HashMap<String, Post> =
            rows.into_iter().map(|p| (p.id.clone(), p)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn get_channel(&self, id: &str) -> Result<Channel, ServiceError> {
        let conn = self.db.conn();
        sq_query_row(&conn, db::host::get_channel(id), channel_from_row)
            .optional()
            .map_err(ServiceError::from_db(&format!("get channel {id}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("channel {id} not found")))
    }

    fn get_channel_posts(
        &self,
        channel_id: &str,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<Post>, ServiceError> {
        let conn = self.db.conn();
        sq_query_map(
            &conn,
            db::host::get_channel_posts(channel_id, page, per_page),
            post_from_row,
        )
        .map_err(ServiceError::from_db(&format!("get posts for channel {channel_id}")))
    }

    fn has_permission_to_channel(
        &self,
        user_id: &str,
        channel_id: &str,
        permission: Permission,
    ) -> Result<bool, ServiceError> {
        let conn = self.db.conn();
        let role: Option<String> = sq_query_row(
            &conn,
            db::host::channel_member_role(channel_id, user_id),
            |row| row.get(0),
        )
        .optional()
        .map_err(ServiceError::from_db(&format!(
            "get role of {user_id} in channel {channel_id}"
        )))?;

        Ok(match (permission, role.as_deref()) {
            (_, None) => false,
            (Permission::CreatePost, Some(_)) => true,
            (
                Permission::ManagePublicChannelProperties
                | Permission::ManagePrivateChannelProperties,
                Some(role),
            ) => role == ADMIN_ROLE,
        })
    }
}
