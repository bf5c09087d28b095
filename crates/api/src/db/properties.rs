//! Property query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{Properties, PropertyFields};

/// Property columns joined with the owning field's display attributes.
/// Column order must match `property_from_row()`.
fn property_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column((Properties::Table, Properties::Id))
        .column((Properties::Table, Properties::ObjectId))
        .column((Properties::Table, Properties::ObjectType))
        .column((Properties::Table, Properties::PropertyFieldId))
        .column((PropertyFields::Table, PropertyFields::Name))
        .column((PropertyFields::Table, PropertyFields::FieldType))
        .column((PropertyFields::Table, PropertyFields::FieldValues))
        .column((Properties::Table, Properties::Value))
        .column((Properties::Table, Properties::ChannelId))
        .column((Properties::Table, Properties::TeamId))
}

fn property_select() -> sea_query::SelectStatement {
    let mut q = Query::select().to_owned();
    property_columns(&mut q);
    q.from(Properties::Table)
        .inner_join(
            PropertyFields::Table,
            Expr::col((Properties::Table, Properties::PropertyFieldId))
                .equals((PropertyFields::Table, PropertyFields::Id)),
        )
        .to_owned()
}

/// Parameters for inserting a property.
pub struct InsertParams<'a> {
    pub id: &'a str,
    pub object_id: &'a str,
    pub object_type: &'a str,
    pub property_field_id: &'a str,
    pub value_json: &'a str,
    pub channel_id: &'a str,
    pub team_id: &'a str,
}

/// INSERT a new property.
pub fn insert(p: &InsertParams<'_>) -> Built {
    Query::insert()
        .into_table(Properties::Table)
        .columns([
            Properties::Id,
            Properties::ObjectId,
            Properties::ObjectType,
            Properties::PropertyFieldId,
            Properties::Value,
            Properties::ChannelId,
            Properties::TeamId,
        ])
        .values_panic([
            p.id.into(),
            p.object_id.into(),
            p.object_type.into(),
            p.property_field_id.into(),
            p.value_json.into(),
            p.channel_id.into(),
            p.team_id.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a single property (with field attributes) by id.
pub fn get_by_id(id: &str) -> Built {
    property_select()
        .and_where(Expr::col((Properties::Table, Properties::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT every property attached to an object, ordered by field name.
pub fn list_for_object(object_id: &str) -> Built {
    property_select()
        .and_where(Expr::col((Properties::Table, Properties::ObjectId)).eq(object_id))
        .order_by((PropertyFields::Table, PropertyFields::Name), Order::Asc)
        .order_by((Properties::Table, Properties::Id), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// SELECT `(id, value)` of every property of a field.
pub fn list_values_for_field(property_field_id: &str) -> Built {
    Query::select()
        .columns([Properties::Id, Properties::Value])
        .from(Properties::Table)
        .and_where(Expr::col(Properties::PropertyFieldId).eq(property_field_id))
        .order_by(Properties::Id, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// COUNT the properties an object already has for a field.
pub fn count_for_object_field(object_id: &str, property_field_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Properties::Table)
        .and_where(Expr::col(Properties::ObjectId).eq(object_id))
        .and_where(Expr::col(Properties::PropertyFieldId).eq(property_field_id))
        .build(SqliteQueryBuilder)
}

/// Replace a property's value list.
pub fn update_value(id: &str, value_json: &str) -> Built {
    Query::update()
        .table(Properties::Table)
        .value(Properties::Value, value_json)
        .and_where(Expr::col(Properties::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Refresh the cached channel/team scope on every property of an object.
pub fn update_scope(object_id: &str, channel_id: &str, team_id: &str) -> Built {
    Query::update()
        .table(Properties::Table)
        .value(Properties::ChannelId, channel_id)
        .value(Properties::TeamId, team_id)
        .and_where(Expr::col(Properties::ObjectId).eq(object_id))
        .and_where(
            Expr::col(Properties::ChannelId)
                .ne(channel_id)
                .or(Expr::col(Properties::TeamId).ne(team_id)),
        )
        .build(SqliteQueryBuilder)
}

/// DELETE a property by id.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Properties::Table)
        .and_where(Expr::col(Properties::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// DELETE every property of a field.
pub fn delete_by_field(property_field_id: &str) -> Built {
    Query::delete()
        .from_table(Properties::Table)
        .and_where(Expr::col(Properties::PropertyFieldId).eq(property_field_id))
        .build(SqliteQueryBuilder)
}
