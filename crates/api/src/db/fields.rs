//! Property field query builders.

use sea_query::{Cond, Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::PropertyFields;
use crate::{FieldFilter, page_window};

/// Column list for field SELECT queries. Order must match `field_from_row()`.
fn field_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column(PropertyFields::Id)
        .column(PropertyFields::TeamId)
        .column(PropertyFields::Name)
        .column(PropertyFields::FieldType)
        .column(PropertyFields::FieldValues)
        .column(PropertyFields::UpdateAt)
        .column(PropertyFields::UpdateBy)
}

/// Parameters for writing a field row. `values_json` is already capped.
pub struct FieldRow<'a> {
    pub id: &'a str,
    pub team_id: &'a str,
    pub name: &'a str,
    pub field_type: &'a str,
    pub values_json: &'a str,
    pub update_at: i64,
    pub update_by: &'a str,
}

/// INSERT a new field.
pub fn insert(row: &FieldRow<'_>) -> Built {
    Query::insert()
        .into_table(PropertyFields::Table)
        .columns([
            PropertyFields::Id,
            PropertyFields::TeamId,
            PropertyFields::Name,
            PropertyFields::FieldType,
            PropertyFields::FieldValues,
            PropertyFields::UpdateAt,
            PropertyFields::UpdateBy,
        ])
        .values_panic([
            row.id.into(),
            row.team_id.into(),
            row.name.into(),
            row.field_type.into(),
            row.values_json.into(),
            row.update_at.into(),
            row.update_by.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a single field by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    field_columns(&mut q);
    q.from(PropertyFields::Table)
        .and_where(Expr::col(PropertyFields::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Escape `%`, `_` and `!` for a `LIKE ... ESCAPE '!'` pattern.
fn like_escape(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

/// SELECT fields matching a filter, paginated.
///
/// A team filter also includes global fields unless
/// `exclude_higher_level_fields` is set. The name search is a
/// case-insensitive substring match.
pub fn list(filter: &FieldFilter) -> Built {
    let window = page_window(filter.page, filter.per_page);
    let mut q = Query::select().to_owned();
    field_columns(&mut q);
    q.from(PropertyFields::Table);

    let team_id = filter.team_id.trim();
    if !team_id.is_empty() {
        let mut scope = Cond::any().add(Expr::col(PropertyFields::TeamId).eq(team_id));
        if !filter.exclude_higher_level_fields {
            scope = scope.add(Expr::col(PropertyFields::TeamId).eq(""));
        }
        q.cond_where(scope);
    }

    let term = filter.search_term.trim();
    if !term.is_empty() {
        let pattern = format!("%{}%", like_escape(&term.to_lowercase()));
        q.and_where(Expr::cust_with_values::<_, sea_query::Value, _>(
            "LOWER(\"name\") LIKE ? ESCAPE '!'",
            [pattern.into()],
        ));
    }

    q.order_by(PropertyFields::Name, Order::Asc)
        .order_by(PropertyFields::Id, Order::Asc)
        .limit(window.limit)
        .offset(window.offset)
        .build(SqliteQueryBuilder)
}

/// UPDATE every mutable attribute of a field.
pub fn update(row: &FieldRow<'_>) -> Built {
    Query::update()
        .table(PropertyFields::Table)
        .value(PropertyFields::TeamId, row.team_id)
        .value(PropertyFields::Name, row.name)
        .value(PropertyFields::FieldType, row.field_type)
        .value(PropertyFields::FieldValues, row.values_json)
        .value(PropertyFields::UpdateAt, row.update_at)
        .value(PropertyFields::UpdateBy, row.update_by)
        .and_where(Expr::col(PropertyFields::Id).eq(row.id))
        .build(SqliteQueryBuilder)
}

/// DELETE a field by id.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(PropertyFields::Table)
        .and_where(Expr::col(PropertyFields::Id).eq(id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(team_id: &str, exclude: bool) -> FieldFilter {
        FieldFilter {
            team_id: team_id.into(),
            exclude_higher_level_fields: exclude,
            per_page: 10,
            ..Default::default()
        }
    }

    #[test]
    fn team_listing_widens_to_global_fields() {
        let (sql, values) = list(&filter("t1", false));
        assert!(sql.contains(r#""team_id" = ? OR "team_id" = ?"#), "{sql}");
        assert_eq!(values.0.len(), 4);

        let (sql, values) = list(&filter("t1", true));
        assert!(!sql.contains(" OR "), "{sql}");
        assert_eq!(values.0.len(), 3);
    }

    #[test]
    fn search_is_lowercased_and_escaped() {
        let mut f = filter("", false);
        f.search_term = " 50%_Off ".into();
        let (sql, values) = list(&f);
        assert!(sql.contains("LOWER(\"name\") LIKE ?"), "{sql}");
        assert!(values.0.contains(&sea_query::Value::String(Some(Box::new(
            "%50!%!_off%".to_string()
        )))));
    }

    #[test]
    fn negative_paging_clamps_to_zero() {
        let mut f = filter("", false);
        f.page = -1;
        f.per_page = -5;
        let (sql, values) = list(&f);
        assert!(sql.ends_with("LIMIT ? OFFSET ?"), "{sql}");
        let tail: Vec<_> = values.0.iter().rev().take(2).cloned().collect();
        assert_eq!(
            tail,
            vec![sea_query::Value::BigUnsigned(Some(0)), sea_query::Value::BigUnsigned(Some(0))]
        );
    }
}
