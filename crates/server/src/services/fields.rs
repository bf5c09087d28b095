use rusqlite::{Connection, OptionalExtension};

use propview_api::db;
use propview_api::service::{FieldInput, encode_json_column, validate_field_request};
use propview_api::{FieldFilter, FieldRequest, PropertyField, PropertyValue, ServiceError};
use propview_core::{new_id, now_millis};

use crate::storage::{Db, field_from_row, sq_execute, sq_query_map, sq_query_row};

/// Property field CRUD.
#[derive(Clone)]
pub struct FieldService {
    db: Db,
}

/// Load a field inside an open connection or transaction.
pub(crate) fn find_field(conn: &Connection, id: &str) -> Result<Option<PropertyField>, ServiceError> {
    sq_query_row(conn, db::fields::get_by_id(id), field_from_row)
        .optional()
        .map_err(ServiceError::from_db(&format!("get property_field {id}")))
}

fn write_row<'a>(
    id: &'a str,
    input: &'a FieldInput,
    values_json: &'a str,
    update_at: i64,
    update_by: &'a str,
) -> db::fields::FieldRow<'a> {
    db::fields::FieldRow {
        id,
        team_id: &input.team_id,
        name: &input.name,
        field_type: input.field_type.as_str(),
        values_json,
        update_at,
        update_by,
    }
}

/// Rewrite the stored values of `field`'s properties that the field, as
/// updated, can no longer hold. Returns how many rows changed.
fn conform_properties(conn: &Connection, field: &PropertyField) -> Result<usize, ServiceError> {
    let rows: Vec<(String, String)> = sq_query_map(
        conn,
        db::properties::list_values_for_field(&field.id),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(ServiceError::from_db(&format!("list properties of field {}", field.id)))?;

    let mut conformed = 0;
    for (id, value_json) in rows {
        let stored: Vec<String> = serde_json::from_str(&value_json)
            .map_err(ServiceError::from_db(&format!("decode value of property {id}")))?;
        let value = PropertyValue::conform(field, &stored).to_list();
        if value == stored {
            continue;
        }
        let value_json = encode_json_column("property value", &id, &value)?;
        sq_execute(conn, db::properties::update_value(&id, &value_json))
            .map_err(ServiceError::from_db(&format!("update property {id}")))?;
        conformed += 1;
    }
    Ok(conformed)
}

impl FieldService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a field from a request whose `id` must be blank.
    pub fn create(&self, req: &FieldRequest, user_id: &str) -> Result<PropertyField, ServiceError> {
        if !req.id.is_empty() {
            return Err(ServiceError::BadRequest("id must be blank".into()));
        }
        let input = validate_field_request(req)?;
        let id = new_id();
        let update_at = now_millis();
        let values_json = encode_json_column("property_field values", &id, &input.values)?;

        self.db.with_tx("create property_field", |tx| {
            sq_execute(tx, db::fields::insert(&write_row(&id, &input, &values_json, update_at, user_id)))
                .map_err(ServiceError::from_db(&format!("insert property_field {id}")))?;
            Ok(())
        })?;
        tracing::info!(field_id = %id, field_type = %input.field_type, "created property field");

        Ok(PropertyField {
            id,
            team_id: input.team_id,
            name: input.name,
            field_type: input.field_type,
            values: input.values,
            update_at,
            update_by: user_id.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Result<PropertyField, ServiceError> {
        self.db
            .with_tx("get property_field", |tx| find_field(tx, id))?
            .ok_or_else(|| ServiceError::NotFound(format!("property_field {id} not found")))
    }

    /// List fields matching `filter`. No match is an empty list.
    pub fn get_fields(&self, filter: &FieldFilter) -> Result<Vec<PropertyField>, ServiceError> {
        self.db.with_tx("get property_fields", |tx| {
            sq_query_map(tx, db::fields::list(filter), field_from_row)
                .map_err(ServiceError::from_db("list property_fields"))
        })
    }

    /// Name search for pickers, capped at `limit` results.
    pub fn autocomplete(
        &self,
        term: &str,
        team_id: &str,
        limit: i64,
    ) -> Result<Vec<PropertyField>, ServiceError> {
        self.get_fields(&FieldFilter {
            team_id: team_id.to_string(),
            exclude_higher_level_fields: false,
            search_term: term.to_string(),
            page: 0,
            per_page: limit,
        })
    }

    /// Replace every mutable attribute of an existing field.
    ///
    /// Properties of the field are conformed in the same transaction: values
    /// a new type cannot hold are cleared and removed options are dropped.
    pub fn update(
        &self,
        id: &str,
        req: &FieldRequest,
        user_id: &str,
    ) -> Result<PropertyField, ServiceError> {
        if !req.id.is_empty() && req.id != id {
            return Err(ServiceError::BadRequest(
                "id in body does not match the path".into(),
            ));
        }
        let input = validate_field_request(req)?;
        let update_at = now_millis();
        let values_json = encode_json_column("property_field values", id, &input.values)?;

        let conformed = self.db.with_tx("update property_field", |tx| {
            let changed = sq_execute(tx, db::fields::update(&write_row(id, &input, &values_json, update_at, user_id)))
                .map_err(ServiceError::from_db(&format!("update property_field {id}")))?;
            if changed == 0 {
                return Err(ServiceError::NotFound(format!("property_field {id} not found")));
            }
            let field = find_field(tx, id)?
                .ok_or_else(|| ServiceError::NotFound(format!("property_field {id} not found")))?;
            conform_properties(tx, &field)
        })?;
        if conformed > 0 {
            tracing::info!(field_id = %id, conformed, "conformed property values to updated field");
        }

        Ok(PropertyField {
            id: id.to_string(),
            team_id: input.team_id,
            name: input.name,
            field_type: input.field_type,
            values: input.values,
            update_at,
            update_by: user_id.to_string(),
        })
    }

    /// Delete a field together with every property that uses it.
    ///
    /// Returns the number of properties removed.
    pub fn delete(&self, id: &str) -> Result<usize, ServiceError> {
        let removed = self.db.with_tx("delete property_field", |tx| {
            let removed = sq_execute(tx, db::properties::delete_by_field(id))
                .map_err(ServiceError::from_db(&format!("delete properties of field {id}")))?;
            let deleted = sq_execute(tx, db::fields::delete(id))
                .map_err(ServiceError::from_db(&format!("delete property_field {id}")))?;
            if deleted == 0 {
                return Err(ServiceError::NotFound(format!("property_field {id} not found")));
            }
            Ok(removed)
        })?;
        tracing::info!(field_id = %id, removed, "deleted property field");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_in_memory;
    use propview_api::FieldType;
    use serde_json::json;

    fn service() -> FieldService {
        FieldService::new(open_in_memory().unwrap())
    }

    fn req(name: &str, field_type: &str, team_id: &str) -> FieldRequest {
        FieldRequest {
            name: name.into(),
            field_type: field_type.into(),
            team_id: team_id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_assigns_id_and_stamps() {
        let svc = service();
        let mut r = req("Status", "select", "");
        r.values = Some(vec![json!("open"), json!("closed")]);
        let field = svc.create(&r, "u1").unwrap();
        assert_eq!(field.id.len(), 32);
        assert_eq!(field.update_by, "u1");
        assert!(field.update_at > 0);

        let stored = svc.get(&field.id).unwrap();
        assert_eq!(stored, field);
    }

    #[test]
    fn create_rejects_preset_id_and_bad_values() {
        let svc = service();
        let mut r = req("Status", "select", "");
        r.id = "mine".into();
        assert_eq!(svc.create(&r, "u1").unwrap_err().status_code(), 400);

        let mut r = req("Status", "select", "");
        r.values = Some(vec![json!(1)]);
        assert_eq!(svc.create(&r, "u1").unwrap_err().status_code(), 400);

        let mut r = req("Notes", "text", "");
        r.values = Some(vec![json!("a")]);
        assert_eq!(svc.create(&r, "u1").unwrap_err().status_code(), 400);

        let mut r = req("Owner", "user", "");
        r.values = Some(vec![json!("a")]);
        assert_eq!(svc.create(&r, "u1").unwrap_err().status_code(), 400);

        assert!(svc.get_fields(&FieldFilter { per_page: 10, ..Default::default() }).unwrap().is_empty());
    }

    #[test]
    fn get_missing_field_is_not_found() {
        assert!(service().get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn listing_scopes_by_team_and_search() {
        let svc = service();
        svc.create(&req("Global Status", "text", ""), "u1").unwrap();
        svc.create(&req("Team Status", "text", "t1"), "u1").unwrap();
        svc.create(&req("Other Team", "text", "t2"), "u1").unwrap();

        let names = |filter: FieldFilter| -> Vec<String> {
            svc.get_fields(&filter).unwrap().into_iter().map(|f| f.name).collect()
        };

        assert_eq!(
            names(FieldFilter { team_id: "t1".into(), per_page: 10, ..Default::default() }),
            vec!["Global Status", "Team Status"]
        );
        assert_eq!(
            names(FieldFilter {
                team_id: "t1".into(),
                exclude_higher_level_fields: true,
                per_page: 10,
                ..Default::default()
            }),
            vec!["Team Status"]
        );
        assert_eq!(
            names(FieldFilter { search_term: "STATUS".into(), per_page: 10, ..Default::default() }),
            vec!["Global Status", "Team Status"]
        );
        assert_eq!(
            names(FieldFilter { page: 1, per_page: 2, ..Default::default() }),
            vec!["Team Status"]
        );
        assert!(names(FieldFilter { page: -1, per_page: -1, ..Default::default() }).is_empty());
    }

    #[test]
    fn autocomplete_is_capped() {
        let svc = service();
        for i in 0..5 {
            svc.create(&req(&format!("Field {i}"), "text", ""), "u1").unwrap();
        }
        assert_eq!(svc.autocomplete("field", "", 3).unwrap().len(), 3);
        assert!(svc.autocomplete("zzz", "", 3).unwrap().is_empty());
    }

    #[test]
    fn update_replaces_attributes() {
        let svc = service();
        let field = svc.create(&req("Status", "text", ""), "u1").unwrap();

        let mut r = req("Stage", "select", "t1");
        r.values = Some(vec![json!("todo")]);
        let updated = svc.update(&field.id, &r, "u2").unwrap();
        assert_eq!(updated.field_type, FieldType::Select);
        assert_eq!(updated.update_by, "u2");

        let stored = svc.get(&field.id).unwrap();
        assert_eq!(stored.name, "Stage");
        assert_eq!(stored.team_id, "t1");
        assert_eq!(stored.values, vec!["todo"]);

        assert!(svc.update("nope", &r, "u2").unwrap_err().is_not_found());
        let mut mismatched = r.clone();
        mismatched.id = "other".into();
        assert_eq!(svc.update(&field.id, &mismatched, "u2").unwrap_err().status_code(), 400);
    }

    fn insert_property(svc: &FieldService, id: &str, field_id: &str, value_json: &str) {
        svc.db
            .conn()
            .execute(
                "INSERT INTO properties (id, object_id, object_type, property_field_id, value) VALUES (?1, ?1, 'post', ?2, ?3)",
                [id, field_id, value_json],
            )
            .unwrap();
    }

    fn stored_value(svc: &FieldService, id: &str) -> String {
        svc.db
            .conn()
            .query_row("SELECT value FROM properties WHERE id = ?1", [id], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn update_conforms_dependent_values() {
        let svc = service();
        let mut r = req("Tags", "select", "");
        r.values = Some(vec![json!("a"), json!("b"), json!("c")]);
        let field = svc.create(&r, "u1").unwrap();
        insert_property(&svc, "p1", &field.id, r#"["a","b"]"#);
        insert_property(&svc, "p2", &field.id, r#"["c"]"#);

        r.values = Some(vec![json!("a"), json!("c")]);
        svc.update(&field.id, &r, "u2").unwrap();
        assert_eq!(stored_value(&svc, "p1"), r#"["a"]"#);
        assert_eq!(stored_value(&svc, "p2"), r#"["c"]"#);

        insert_property(&svc, "p3", &field.id, r#"["a","c"]"#);
        svc.update(&field.id, &req("Tags", "text", ""), "u2").unwrap();
        assert_eq!(stored_value(&svc, "p1"), r#"["a"]"#);
        assert_eq!(stored_value(&svc, "p3"), "[]");
    }

    #[test]
    fn delete_cascades_to_properties() {
        let svc = service();
        let field = svc.create(&req("Notes", "text", ""), "u1").unwrap();
        svc.db
            .conn()
            .execute(
                "INSERT INTO properties (id, object_id, object_type, property_field_id, value) VALUES ('p1', 'post1', 'post', ?1, '[\"hi\"]')",
                [&field.id],
            )
            .unwrap();

        assert_eq!(svc.delete(&field.id).unwrap(), 1);
        assert!(svc.get(&field.id).unwrap_err().is_not_found());
        let left: i64 = svc
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
        assert!(svc.delete(&field.id).unwrap_err().is_not_found());
    }
}
