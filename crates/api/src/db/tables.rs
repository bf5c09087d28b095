//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum PropertyFields {
    Table,
    Id,
    TeamId,
    Name,
    FieldType,
    FieldValues,
    UpdateAt,
    UpdateBy,
}

#[derive(Iden)]
pub enum Properties {
    Table,
    Id,
    ObjectId,
    ObjectType,
    PropertyFieldId,
    Value,
    ChannelId,
    TeamId,
}

#[derive(Iden)]
pub enum Views {
    Table,
    Id,
    Title,
    ViewType,
    CreateAt,
    Query,
    Format,
}

#[derive(Iden)]
pub enum ViewMembers {
    Table,
    ViewId,
    UserId,
}

/// One row per object with every field → value list folded into `properties`.
#[derive(Iden)]
pub enum PropertyQueryView {
    Table,
    ObjectId,
    ObjectType,
    ChannelId,
    TeamId,
    Properties,
}

// ── Host-owned tables (read only) ─────────────────────────────────────────

#[derive(Iden)]
pub enum Posts {
    Table,
    Id,
    ChannelId,
    UserId,
    Message,
    PostType,
    CreateAt,
}

#[derive(Iden)]
pub enum Channels {
    Table,
    Id,
    TeamId,
    Name,
    ChannelType,
}

#[derive(Iden)]
pub enum ChannelMembers {
    Table,
    ChannelId,
    UserId,
    Role,
}
