use rusqlite::{Connection, OptionalExtension};
use std::sync::Arc;

use propview_api::db;
use propview_api::service::{PropertyInput, encode_json_column};
use propview_api::{ObjectType, Property, PropertyField, PropertyValue, ServiceError};
use propview_core::new_id;

use super::fields::find_field;
use super::permissions::{Access, PermissionService};
use crate::host::HostStore;
use crate::storage::{Db, property_from_row, sq_execute, sq_query_map, sq_query_row};

/// Property CRUD plus scope denormalization from the host.
#[derive(Clone)]
pub struct PropertyService {
    db: Db,
    host: Arc<dyn HostStore>,
    permissions: PermissionService,
}

fn find_property(conn: &Connection, id: &str) -> Result<Option<Property>, ServiceError> {
    sq_query_row(conn, db::properties::get_by_id(id), property_from_row)
        .optional()
        .map_err(ServiceError::from_db(&format!("get property {id}")))
}

fn unknown_field(field_id: &str) -> ServiceError {
    ServiceError::BadRequest(format!(
        "tried to create property with unknown property_field with id={field_id}"
    ))
}

impl PropertyService {
    pub fn new(db: Db, host: Arc<dyn HostStore>, permissions: PermissionService) -> Self {
        Self {
            db,
            host,
            permissions,
        }
    }

    /// Resolve the `(channel_id, team_id)` scope cached on an object's properties.
    fn object_scope(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> Result<(String, String), ServiceError> {
        let channel = match object_type {
            ObjectType::Post => {
                let post = self.host.get_post(object_id)?;
                self.host.get_channel(&post.channel_id)?
            }
            ObjectType::Channel => self.host.get_channel(object_id)?,
        };
        Ok((channel.id, channel.team_id))
    }

    fn parse_value(
        &self,
        user_id: &str,
        field: &PropertyField,
        raw: &[serde_json::Value],
    ) -> Result<PropertyValue, ServiceError> {
        let value = PropertyValue::parse(field, raw)?;
        match self.permissions.can_set_value(user_id, field, &value) {
            Access::Granted | Access::Unchecked => Ok(value),
        }
    }

    /// Create a property from a request that already passed shape checks.
    ///
    /// The field must exist and the object must not have a property for it
    /// yet. The owning object's channel and team are looked up through the
    /// host and stamped onto the new row and onto the object's other rows.
    pub fn create(&self, input: &PropertyInput, user_id: &str) -> Result<Property, ServiceError> {
        let field = self
            .db
            .with_tx("get property_field", |tx| find_field(tx, &input.property_field_id))?
            .ok_or_else(|| unknown_field(&input.property_field_id))?;
        let value = self.parse_value(user_id, &field, &input.value)?;
        let (channel_id, team_id) = self.object_scope(input.object_type, &input.object_id)?;

        let id = new_id();
        let value_json = encode_json_column("property value", &id, &value.to_list())?;
        let restamped = self.db.with_tx("create property", |tx| {
            // The field may have been deleted since it was read above.
            if find_field(tx, &field.id)?.is_none() {
                return Err(unknown_field(&field.id));
            }
            let existing: i64 = sq_query_row(
                tx,
                db::properties::count_for_object_field(&input.object_id, &field.id),
                |row| row.get(0),
            )
            .map_err(ServiceError::from_db(&format!(
                "check property of {} for field {}",
                input.object_id, field.id
            )))?;
            if existing > 0 {
                return Err(ServiceError::Conflict(format!(
                    "object {} already has a property for field {}",
                    input.object_id, field.id
                )));
            }
            sq_execute(
                tx,
                db::properties::insert(&db::properties::InsertParams {
                    id: &id,
                    object_id: &input.object_id,
                    object_type: input.object_type.as_str(),
                    property_field_id: &field.id,
                    value_json: &value_json,
                    channel_id: &channel_id,
                    team_id: &team_id,
                }),
            )
            .map_err(ServiceError::from_db(&format!("insert property {id}")))?;
            // One scope per object: rows stamped before the object moved follow the new row.
            sq_execute(
                tx,
                db::properties::update_scope(&input.object_id, &channel_id, &team_id),
            )
            .map_err(ServiceError::from_db(&format!(
                "restamp properties of {}",
                input.object_id
            )))
        })?;
        if restamped > 0 {
            tracing::info!(object_id = %input.object_id, restamped, channel_id = %channel_id, "restamped property scope");
        }
        tracing::info!(property_id = %id, object_id = %input.object_id, field_id = %field.id, "created property");

        Ok(Property {
            id,
            object_id: input.object_id.clone(),
            object_type: input.object_type,
            property_field_id: field.id,
            property_field_name: field.name,
            property_field_type: field.field_type,
            property_field_values: field.values,
            value,
            channel_id,
            team_id,
        })
    }

    pub fn get(&self, id: &str) -> Result<Property, ServiceError> {
        self.db
            .with_tx("get property", |tx| find_property(tx, id))?
            .ok_or_else(|| ServiceError::NotFound(format!("property {id} not found")))
    }

    /// Every property of an object. An object without properties yields an
    /// empty list.
    pub fn get_for_object(&self, object_id: &str) -> Result<Vec<Property>, ServiceError> {
        self.db.with_tx("get properties for object", |tx| {
            sq_query_map(tx, db::properties::list_for_object(object_id), property_from_row)
                .map_err(ServiceError::from_db(&format!(
                    "get properties for object {object_id}"
                )))
        })
    }

    /// Replace a property's value after checking it against the field.
    pub fn update_value(
        &self,
        id: &str,
        raw: &[serde_json::Value],
        user_id: &str,
    ) -> Result<Property, ServiceError> {
        let value_json = self.db.with_tx("update property value", |tx| {
            let property = find_property(tx, id)?
                .ok_or_else(|| ServiceError::NotFound(format!("property {id} not found")))?;
            let field = find_field(tx, &property.property_field_id)?.ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "property_field {} not found",
                    property.property_field_id
                ))
            })?;
            let value = self.parse_value(user_id, &field, raw)?;
            let value_json = encode_json_column("property value", id, &value.to_list())?;
            sq_execute(tx, db::properties::update_value(id, &value_json))
                .map_err(ServiceError::from_db(&format!("update property {id}")))?;
            Ok(value_json)
        })?;
        tracing::debug!(property_id = %id, value = %value_json, "updated property value");
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self.db.with_tx("delete property", |tx| {
            sq_execute(tx, db::properties::delete(id))
                .map_err(ServiceError::from_db(&format!("delete property {id}")))
        })?;
        if deleted == 0 {
            return Err(ServiceError::NotFound(format!("property {id} not found")));
        }
        Ok(())
    }

    /// Refresh the cached channel/team scope of an object's properties from
    /// the host. Returns how many rows changed.
    pub fn resync_object(&self, object_id: &str) -> Result<usize, ServiceError> {
        let properties = self.get_for_object(object_id)?;
        let Some(first) = properties.first() else {
            return Ok(0);
        };
        let (channel_id, team_id) = self.object_scope(first.object_type, object_id)?;

        let updated = self.db.with_tx("resync properties", |tx| {
            sq_execute(
                tx,
                db::properties::update_scope(object_id, &channel_id, &team_id),
            )
            .map_err(ServiceError::from_db(&format!("resync properties of {object_id}")))
        })?;
        if updated > 0 {
            tracing::info!(object_id, updated, channel_id = %channel_id, "resynced property scope");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{SqliteHost, fixtures};
    use crate::services::FieldService;
    use crate::storage::open_in_memory;
    use propview_api::service::validate_property_request;
    use propview_api::{CreatePropertyRequest, FieldRequest};
    use serde_json::json;

    struct Fixture {
        db: Db,
        fields: FieldService,
        properties: PropertyService,
    }

    fn fixture() -> Fixture {
        let db = open_in_memory().unwrap();
        fixtures::channel(&db, "c1", "t1", "O");
        fixtures::channel(&db, "c2", "t2", "O");
        fixtures::post(&db, "post1", "c1", "", 1);
        let host: Arc<dyn HostStore> = Arc::new(SqliteHost::new(db.clone()));
        Fixture {
            fields: FieldService::new(db.clone()),
            properties: PropertyService::new(db.clone(), host.clone(), PermissionService::new(host)),
            db,
        }
    }

    impl Fixture {
        fn field(&self, name: &str, field_type: &str, values: &[&str]) -> PropertyField {
            let req = FieldRequest {
                name: name.into(),
                field_type: field_type.into(),
                values: Some(values.iter().map(|v| json!(v)).collect()),
                ..Default::default()
            };
            self.fields.create(&req, "u1").unwrap()
        }

        fn count(&self) -> i64 {
            self.db
                .conn()
                .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
                .unwrap()
        }
    }

    fn create_req(object_id: &str, field_id: &str, value: Option<Vec<serde_json::Value>>) -> PropertyInput {
        validate_property_request(&CreatePropertyRequest {
            object_id: object_id.into(),
            object_type: "post".into(),
            property_field_id: field_id.into(),
            value,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn create_stamps_scope_from_post_channel() {
        let fx = fixture();
        let field = fx.field("Status", "select", &["open", "closed"]);
        let property = fx
            .properties
            .create(&create_req("post1", &field.id, Some(vec![json!("open")])), "u1")
            .unwrap();
        assert_eq!(property.channel_id, "c1");
        assert_eq!(property.team_id, "t1");
        assert_eq!(property.value, PropertyValue::Select(vec!["open".into()]));
        assert_eq!(property.property_field_name, "Status");

        let stored = fx.properties.get_for_object("post1").unwrap();
        assert_eq!(stored, vec![property]);
    }

    #[test]
    fn unknown_field_fails_without_writing() {
        let fx = fixture();
        let err = fx
            .properties
            .create(&create_req("post1", "ghost", None), "u1")
            .unwrap_err();
        assert_eq!(
            err.message(),
            "tried to create property with unknown property_field with id=ghost"
        );
        assert_eq!(fx.count(), 0);
    }

    #[test]
    fn missing_post_aborts_creation() {
        let fx = fixture();
        let field = fx.field("Notes", "text", &[]);
        let err = fx
            .properties
            .create(&create_req("nope", &field.id, None), "u1")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fx.count(), 0);
    }

    #[test]
    fn value_must_fit_field_type() {
        let fx = fixture();
        let status = fx.field("Status", "select", &["open"]);
        let err = fx
            .properties
            .create(&create_req("post1", &status.id, Some(vec![json!("closed")])), "u1")
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let notes = fx.field("Notes", "text", &[]);
        assert!(fx
            .properties
            .create(&create_req("post1", &notes.id, Some(vec![json!("a"), json!("b")])), "u1")
            .is_err());
        assert_eq!(fx.count(), 0);
    }

    #[test]
    fn missing_value_defaults_to_empty() {
        let fx = fixture();
        let notes = fx.field("Notes", "text", &[]);
        let property = fx
            .properties
            .create(&create_req("post1", &notes.id, None), "u1")
            .unwrap();
        assert!(property.value.is_empty());
        assert_eq!(fx.properties.get(&property.id).unwrap().value, PropertyValue::Empty);
    }

    #[test]
    fn update_value_replaces_only_the_value() {
        let fx = fixture();
        let tags = fx.field("Tags", "select", &["x", "y", "z"]);
        let created = fx
            .properties
            .create(&create_req("post1", &tags.id, Some(vec![json!("x"), json!("y")])), "u1")
            .unwrap();

        let updated = fx
            .properties
            .update_value(&created.id, &[json!("z")], "u1")
            .unwrap();
        assert_eq!(updated.value.to_list(), vec!["z"]);
        assert_eq!(
            Property {
                value: created.value.clone(),
                ..updated.clone()
            },
            created
        );

        assert_eq!(
            fx.properties
                .update_value(&created.id, &[json!("nope")], "u1")
                .unwrap_err()
                .status_code(),
            400
        );
        assert!(fx
            .properties
            .update_value("missing", &[], "u1")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn objects_without_properties_yield_empty_list() {
        let fx = fixture();
        assert!(fx.properties.get_for_object("post1").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_row() {
        let fx = fixture();
        let notes = fx.field("Notes", "text", &[]);
        let p = fx
            .properties
            .create(&create_req("post1", &notes.id, Some(vec![json!("hi")])), "u1")
            .unwrap();
        fx.properties.delete(&p.id).unwrap();
        assert!(fx.properties.get(&p.id).unwrap_err().is_not_found());
        assert!(fx.properties.delete(&p.id).unwrap_err().is_not_found());
    }

    #[test]
    fn resync_follows_moved_post() {
        let fx = fixture();
        let notes = fx.field("Notes", "text", &[]);
        fx.properties
            .create(&create_req("post1", &notes.id, None), "u1")
            .unwrap();
        assert_eq!(fx.properties.resync_object("post1").unwrap(), 0);

        fx.db
            .conn()
            .execute("UPDATE posts SET channel_id = 'c2' WHERE id = 'post1'", [])
            .unwrap();
        assert_eq!(fx.properties.resync_object("post1").unwrap(), 1);
        let props = fx.properties.get_for_object("post1").unwrap();
        assert_eq!(props[0].channel_id, "c2");
        assert_eq!(props[0].team_id, "t2");

        assert_eq!(fx.properties.resync_object("unknown").unwrap(), 0);
    }

    #[test]
    fn second_property_for_same_field_conflicts() {
        let fx = fixture();
        let notes = fx.field("Notes", "text", &[]);
        fx.properties
            .create(&create_req("post1", &notes.id, Some(vec![json!("first")])), "u1")
            .unwrap();
        let err = fx
            .properties
            .create(&create_req("post1", &notes.id, Some(vec![json!("second")])), "u1")
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(fx.count(), 1);
        assert_eq!(
            fx.properties.get_for_object("post1").unwrap()[0].value,
            PropertyValue::Text("first".into())
        );
    }

    #[test]
    fn create_restamps_older_rows_of_a_moved_post() {
        let fx = fixture();
        let notes = fx.field("Notes", "text", &[]);
        let owner = fx.field("Owner", "user", &[]);
        fx.properties
            .create(&create_req("post1", &notes.id, None), "u1")
            .unwrap();

        fx.db
            .conn()
            .execute("UPDATE posts SET channel_id = 'c2' WHERE id = 'post1'", [])
            .unwrap();
        fx.properties
            .create(&create_req("post1", &owner.id, Some(vec![json!("u9")])), "u1")
            .unwrap();

        let scopes: Vec<(String, String)> = fx
            .properties
            .get_for_object("post1")
            .unwrap()
            .into_iter()
            .map(|p| (p.channel_id, p.team_id))
            .collect();
        assert_eq!(
            scopes,
            vec![("c2".to_string(), "t2".to_string()); 2]
        );
        let view_scope: (String, String) = fx
            .db
            .conn()
            .query_row(
                "SELECT channel_id, team_id FROM property_query_view WHERE object_id = 'post1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(view_scope, ("c2".to_string(), "t2".to_string()));
        assert_eq!(fx.properties.resync_object("post1").unwrap(), 0);
    }
}
