//! Query compiler: turns a view [`Query`] into a page of matching object ids.
//!
//! The compiled statement runs against `property_query_view`, which holds one
//! row per object with a JSON object mapping field id to value list:
//!
//! ```text
//! SELECT DISTINCT "v"."object_id" FROM "property_query_view" AS "v"
//! WHERE <field clauses> AND <scope filters>
//! ORDER BY "v"."object_id" LIMIT ? OFFSET ?
//! ```
//!
//! Field clauses, for field `f` and value set `xs`:
//!
//! | `xs`      | include                     | exclude                                   |
//! |-----------|-----------------------------|-------------------------------------------|
//! | empty     | `f` present                 | `f` absent                                |
//! | `[x]`     | `f` contains `x`            | `f` present and does not contain `x`      |
//! | `[x, ..]` | `f` intersects `xs`         | `f` present and shares nothing with `xs`  |

use sea_query::{Alias, Expr, Order, SimpleExpr, SqliteQueryBuilder, Value};

use propview_core::{ObjectType, Query};

use super::Built;
use super::tables::PropertyQueryView;
use crate::{ServiceError, page_window};

const FIELD_PRESENT: &str =
    r#"EXISTS (SELECT 1 FROM json_each("v"."properties") AS f WHERE f.key = ?)"#;

/// Prefix of the "field holds one of" test; the value predicate is appended.
const FIELD_CONTAINS: &str = r#"EXISTS (SELECT 1 FROM json_each("v"."properties") AS f, json_each(f.value) AS x WHERE f.key = ? AND "#;

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `f` holds at least one of `values` (which is non-empty).
fn contains_sql(n: usize) -> String {
    if n == 1 {
        format!("{FIELD_CONTAINS}x.value = ?)")
    } else {
        format!("{FIELD_CONTAINS}x.value IN ({}))", placeholders(n))
    }
}

fn field_values(field_id: &str, values: &[String]) -> Vec<Value> {
    std::iter::once(field_id.into())
        .chain(values.iter().map(|v| v.as_str().into()))
        .collect()
}

/// Clause requiring an object to match `field_id` / `values`.
pub fn include_clause(field_id: &str, values: &[String]) -> SimpleExpr {
    if values.is_empty() {
        return Expr::cust_with_values(FIELD_PRESENT, [Value::from(field_id)]);
    }
    Expr::cust_with_values(contains_sql(values.len()), field_values(field_id, values))
}

/// Exact negation of [`include_clause`], except that a non-empty value set
/// still requires the field to be present.
pub fn exclude_clause(field_id: &str, values: &[String]) -> SimpleExpr {
    if values.is_empty() {
        return Expr::cust_with_values(
            format!("NOT {FIELD_PRESENT}"),
            [Value::from(field_id)],
        );
    }
    let sql = format!("({FIELD_PRESENT} AND NOT {})", contains_sql(values.len()));
    let mut bound = vec![Value::from(field_id)];
    bound.extend(field_values(field_id, values));
    Expr::cust_with_values(sql, bound)
}

/// Compile `query` into a page of distinct object ids.
///
/// `object_type` narrows the result to one kind of object. A query without
/// includes or excludes is rejected: callers that only scope by channel must
/// read the channel timeline instead.
pub fn query_objects(
    query: &Query,
    object_type: Option<ObjectType>,
    page: i64,
    per_page: i64,
) -> Result<Built, ServiceError> {
    if !query.has_field_criteria() {
        return Err(ServiceError::BadRequest(
            "query has no filtering criteria: includes or excludes required".into(),
        ));
    }

    let v = Alias::new("v");
    let window = page_window(page, per_page);
    let mut q = sea_query::Query::select()
        .distinct()
        .column((v.clone(), PropertyQueryView::ObjectId))
        .from_as(PropertyQueryView::Table, v.clone())
        .to_owned();

    for (field_id, values) in &query.includes {
        q.and_where(include_clause(field_id, values));
    }
    for (field_id, values) in &query.excludes {
        q.and_where(exclude_clause(field_id, values));
    }

    if let Some(channel_id) = query.channel_scope() {
        q.and_where(Expr::col((v.clone(), PropertyQueryView::ChannelId)).eq(channel_id));
    }
    if let Some(team_id) = query.team_scope() {
        q.and_where(Expr::col((v.clone(), PropertyQueryView::TeamId)).eq(team_id));
    }
    if let Some(object_type) = object_type {
        q.and_where(Expr::col((v.clone(), PropertyQueryView::ObjectType)).eq(object_type.as_str()));
    }

    Ok(q
        .order_by((v, PropertyQueryView::ObjectId), Order::Asc)
        .limit(window.limit)
        .offset(window.offset)
        .build(SqliteQueryBuilder))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn rejects_query_without_field_criteria() {
        let query = Query {
            channel_id: Some("c1".into()),
            ..Default::default()
        };
        let err = query_objects(&query, None, 0, 10).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn empty_include_is_a_presence_test() {
        let mut query = Query::default();
        query.includes.insert("f1".into(), vec![]);
        let (sql, values) = query_objects(&query, None, 0, 10).unwrap();
        assert!(sql.starts_with(r#"SELECT DISTINCT "v"."object_id" FROM "property_query_view" AS "v""#), "{sql}");
        assert!(sql.contains("WHERE f.key = ?)"), "{sql}");
        assert!(!sql.contains("json_each(f.value)"), "{sql}");
        assert_eq!(values.0[0], s("f1"));
    }

    #[test]
    fn single_and_multi_value_includes() {
        let (sql, values) = sea_query::Query::select()
            .expr(include_clause("f1", &strings(&["a"])))
            .build(SqliteQueryBuilder);
        assert!(sql.contains("x.value = ?"), "{sql}");
        assert_eq!(values.0, vec![s("f1"), s("a")]);

        let (sql, values) = sea_query::Query::select()
            .expr(include_clause("f1", &strings(&["a", "b"])))
            .build(SqliteQueryBuilder);
        assert!(sql.contains("x.value IN (?, ?)"), "{sql}");
        assert_eq!(values.0, vec![s("f1"), s("a"), s("b")]);
    }

    #[test]
    fn excludes_negate_the_include_shape() {
        let (sql, values) = sea_query::Query::select()
            .expr(exclude_clause("f1", &[]))
            .build(SqliteQueryBuilder);
        assert!(sql.contains("NOT EXISTS"), "{sql}");
        assert_eq!(values.0, vec![s("f1")]);

        let (sql, values) = sea_query::Query::select()
            .expr(exclude_clause("f1", &strings(&["a", "b"])))
            .build(SqliteQueryBuilder);
        assert!(sql.contains("AND NOT EXISTS"), "{sql}");
        assert!(sql.contains("x.value IN (?, ?)"), "{sql}");
        assert_eq!(values.0, vec![s("f1"), s("f1"), s("a"), s("b")]);
    }

    #[test]
    fn fields_compile_in_sorted_order_with_scope_and_window() {
        let mut query = Query {
            channel_id: Some("c1".into()),
            team_id: Some(" ".into()),
            ..Default::default()
        };
        query.includes.insert("zeta".into(), vec![]);
        query.includes.insert("alpha".into(), vec![]);
        query.excludes.insert("beta".into(), vec![]);

        let (sql, values) = query_objects(&query, Some(ObjectType::Post), 1, 10).unwrap();
        assert!(sql.contains(r#""v"."channel_id" = ?"#), "{sql}");
        assert!(!sql.contains(r#""v"."team_id""#), "{sql}");
        assert!(sql.contains(r#""v"."object_type" = ?"#), "{sql}");
        assert!(sql.ends_with(r#"ORDER BY "v"."object_id" ASC LIMIT ? OFFSET ?"#), "{sql}");

        assert_eq!(
            values.0,
            vec![
                s("alpha"),
                s("zeta"),
                s("beta"),
                s("c1"),
                s("post"),
                Value::BigUnsigned(Some(10)),
                Value::BigUnsigned(Some(10)),
            ]
        );
    }
}
