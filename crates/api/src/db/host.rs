//! Read-only builders over the host platform's posts and channels.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{ChannelMembers, Channels, Posts};
use crate::page_window;

/// Column list for post SELECT queries. Order must match `post_from_row()`.
fn post_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column(Posts::Id)
        .column(Posts::ChannelId)
        .column(Posts::UserId)
        .column(Posts::Message)
        .column(Posts::PostType)
        .column(Posts::CreateAt)
}

/// SELECT a post by id.
pub fn get_post(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    post_columns(&mut q);
    q.from(Posts::Table)
        .and_where(Expr::col(Posts::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT posts whose id is in `ids`. Row order is unspecified.
pub fn get_posts_by_ids(ids: &[String]) -> Built {
    let mut q = Query::select().to_owned();
    post_columns(&mut q);
    q.from(Posts::Table)
        .and_where(Expr::col(Posts::Id).is_in(ids.iter().map(String::as_str)))
        .build(SqliteQueryBuilder)
}

/// SELECT a page of a channel's posts, newest first.
pub fn get_channel_posts(channel_id: &str, page: i64, per_page: i64) -> Built {
    let window = page_window(page, per_page);
    let mut q = Query::select().to_owned();
    post_columns(&mut q);
    q.from(Posts::Table)
        .and_where(Expr::col(Posts::ChannelId).eq(channel_id))
        .order_by(Posts::CreateAt, Order::Desc)
        .order_by(Posts::Id, Order::Desc)
        .limit(window.limit)
        .offset(window.offset)
        .build(SqliteQueryBuilder)
}

/// SELECT a channel by id.
pub fn get_channel(id: &str) -> Built {
    Query::select()
        .column(Channels::Id)
        .column(Channels::TeamId)
        .column(Channels::Name)
        .column(Channels::ChannelType)
        .from(Channels::Table)
        .and_where(Expr::col(Channels::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT a user's role in a channel. No row means not a member.
pub fn channel_member_role(channel_id: &str, user_id: &str) -> Built {
    Query::select()
        .column(ChannelMembers::Role)
        .from(ChannelMembers::Table)
        .and_where(Expr::col(ChannelMembers::ChannelId).eq(channel_id))
        .and_where(Expr::col(ChannelMembers::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}
