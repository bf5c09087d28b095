//! View membership query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::ViewMembers;

/// INSERT a membership row.
pub fn insert(view_id: &str, user_id: &str) -> Built {
    Query::insert()
        .into_table(ViewMembers::Table)
        .columns([ViewMembers::ViewId, ViewMembers::UserId])
        .values_panic([view_id.into(), user_id.into()])
        .build(SqliteQueryBuilder)
}

/// COUNT rows for a `(view, user)` pair.
pub fn exists(view_id: &str, user_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(ViewMembers::Table)
        .and_where(Expr::col(ViewMembers::ViewId).eq(view_id))
        .and_where(Expr::col(ViewMembers::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// SELECT the member user ids of a view.
pub fn list_for_view(view_id: &str) -> Built {
    Query::select()
        .column(ViewMembers::UserId)
        .from(ViewMembers::Table)
        .and_where(Expr::col(ViewMembers::ViewId).eq(view_id))
        .order_by(ViewMembers::UserId, Order::Asc)
        .build(SqliteQueryBuilder)
}
