//! View query builders.

use sea_query::{Alias, Cond, Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{ViewMembers, Views};

/// Column list for view SELECT queries. Order must match `view_from_row()`.
fn view_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column((Views::Table, Views::Id))
        .column((Views::Table, Views::Title))
        .column((Views::Table, Views::ViewType))
        .column((Views::Table, Views::CreateAt))
        .column((Views::Table, Views::Query))
        .column((Views::Table, Views::Format))
}

/// Parameters for inserting a view. JSON documents are already capped.
pub struct InsertParams<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub view_type: &'a str,
    pub create_at: i64,
    pub query_json: &'a str,
    pub format_json: &'a str,
}

/// INSERT a new view.
pub fn insert(p: &InsertParams<'_>) -> Built {
    Query::insert()
        .into_table(Views::Table)
        .columns([
            Views::Id,
            Views::Title,
            Views::ViewType,
            Views::CreateAt,
            Views::Query,
            Views::Format,
        ])
        .values_panic([
            p.id.into(),
            p.title.into(),
            p.view_type.into(),
            p.create_at.into(),
            p.query_json.into(),
            p.format_json.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a single view by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    view_columns(&mut q);
    q.from(Views::Table)
        .and_where(Expr::col((Views::Table, Views::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Replacement parts of a view. `None` leaves the stored column untouched.
#[derive(Default)]
pub struct UpdateParams<'a> {
    pub title: Option<&'a str>,
    pub query_json: Option<&'a str>,
    pub format_json: Option<&'a str>,
}

/// UPDATE the present parts of a view. Returns `None` when nothing is set.
pub fn update(id: &str, p: &UpdateParams<'_>) -> Option<Built> {
    let mut q = Query::update();
    q.table(Views::Table);
    let mut any = false;
    if let Some(title) = p.title {
        q.value(Views::Title, title);
        any = true;
    }
    if let Some(query_json) = p.query_json {
        q.value(Views::Query, query_json);
        any = true;
    }
    if let Some(format_json) = p.format_json {
        q.value(Views::Format, format_json);
        any = true;
    }
    if !any {
        return None;
    }
    Some(
        q.and_where(Expr::col(Views::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

/// SELECT the views visible to a user.
///
/// Visible means the user is an explicit member, or the view has no
/// members at all.
pub fn list_for_user(user_id: &str) -> Built {
    let m = Alias::new("m");
    let is_member = Query::select()
        .expr(Expr::val(1))
        .from_as(ViewMembers::Table, m.clone())
        .and_where(Expr::col((m.clone(), ViewMembers::ViewId)).equals((Views::Table, Views::Id)))
        .and_where(Expr::col((m.clone(), ViewMembers::UserId)).eq(user_id))
        .to_owned();
    let has_members = Query::select()
        .expr(Expr::val(1))
        .from_as(ViewMembers::Table, m.clone())
        .and_where(Expr::col((m, ViewMembers::ViewId)).equals((Views::Table, Views::Id)))
        .to_owned();

    let mut q = Query::select().to_owned();
    view_columns(&mut q);
    q.from(Views::Table)
        .cond_where(
            Cond::any()
                .add(Expr::exists(is_member))
                .add(Cond::all().not().add(Expr::exists(has_members))),
        )
        .order_by((Views::Table, Views::CreateAt), Order::Asc)
        .order_by((Views::Table, Views::Id), Order::Asc)
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_builds_nothing() {
        assert!(update("v1", &UpdateParams::default()).is_none());
        let (sql, values) = update(
            "v1",
            &UpdateParams {
                title: Some("Board"),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(sql.starts_with(r#"UPDATE "views" SET "title" = ?"#), "{sql}");
        assert!(!sql.contains("\"query\""), "{sql}");
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn visibility_is_member_or_unrestricted() {
        let (sql, values) = list_for_user("u1");
        assert!(sql.contains("EXISTS"), "{sql}");
        assert!(sql.contains("NOT"), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert_eq!(values.0.len(), 3);
    }
}
