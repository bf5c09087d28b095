//! Canonical migration definitions.

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

/// Ordered schema migrations, tracked by name in `_migrations`.
pub const MIGRATIONS: &[Migration] = &[
    (
        "0001_schema",
        include_str!("../../migrations/0001_schema.sql"),
    ),
    (
        "0002_host",
        include_str!("../../migrations/0002_host.sql"),
    ),
    (
        "0003_property_unique",
        include_str!("../../migrations/0003_property_unique.sql"),
    ),
];
