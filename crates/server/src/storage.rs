use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use propview_api::db::Built;
use propview_api::db::migrations::MIGRATIONS;
use propview_api::{
    Channel, ChannelType, FieldType, Format, ObjectType, Post, Property, PropertyField,
    PropertyValue, Query, ServiceError, View, ViewType,
};

/// How long a connection waits on another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside its own transaction.
    ///
    /// The transaction commits when `f` succeeds. Any error drops it, which
    /// rolls it back.
    pub fn with_tx<T>(
        &self,
        op: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(ServiceError::from_db(&format!("{op}: begin")))?;
        let out = f(&tx)?;
        tx.commit()
            .map_err(ServiceError::from_db(&format!("{op}: commit")))?;
        Ok(out)
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("propview.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    open(conn)
}

/// A private in-memory database with the full schema.
pub fn open_in_memory() -> Result<Db> {
    open(Connection::open_in_memory().context("opening in-memory database")?)
}

fn open(mut conn: Connection) -> Result<Db> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    run_migrations(&mut conn)?;
    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

/// Apply pending migrations.
///
/// The whole run holds an exclusive lock on the database, so instances
/// starting side by side apply each migration exactly once.
fn run_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .context("acquiring migration lock")?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tx.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            tx.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    tx.commit().context("committing migrations")?;
    Ok(())
}

// ── sea-query bridge ──────────────────────────────────────────────────────

/// Convert `sea_query::Values` into rusqlite bind parameters.
fn bind_values(values: &sea_query::Values) -> Vec<SqlValue> {
    values
        .0
        .iter()
        .map(|v| match v {
            sea_query::Value::String(Some(s)) => SqlValue::Text(s.to_string()),
            sea_query::Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            sea_query::Value::Unsigned(Some(u)) => SqlValue::Integer(i64::from(*u)),
            sea_query::Value::BigUnsigned(Some(u)) => {
                SqlValue::Integer(i64::try_from(*u).unwrap_or(i64::MAX))
            }
            sea_query::Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            _ => SqlValue::Null,
        })
        .collect()
}

/// Execute a built statement, returning the number of changed rows.
pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, rusqlite::params_from_iter(bind_values(&values)))
}

/// Run a built query expected to return one row.
pub fn sq_query_row<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<T>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(&sql, rusqlite::params_from_iter(bind_values(&values)), f)
}

/// Run a built query and map every row.
pub fn sq_query_map<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(bind_values(&values)), f)?;
    rows.collect()
}

// ── Row mappers ───────────────────────────────────────────────────────────

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn json_col<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

/// Map a row from `db::fields` column order.
pub fn field_from_row(row: &Row<'_>) -> rusqlite::Result<PropertyField> {
    Ok(PropertyField {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        field_type: enum_col(row, 3)?,
        values: json_col(row, 4)?,
        update_at: row.get(5)?,
        update_by: row.get(6)?,
    })
}

/// Map a row from `db::properties` column order.
pub fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    let field_type: FieldType = enum_col(row, 5)?;
    let stored: Vec<String> = json_col(row, 7)?;
    Ok(Property {
        id: row.get(0)?,
        object_id: row.get(1)?,
        object_type: enum_col::<ObjectType>(row, 2)?,
        property_field_id: row.get(3)?,
        property_field_name: row.get(4)?,
        property_field_type: field_type,
        property_field_values: json_col(row, 6)?,
        value: PropertyValue::from_stored(field_type, stored),
        channel_id: row.get(8)?,
        team_id: row.get(9)?,
    })
}

/// Map a row from `db::views` column order.
pub fn view_from_row(row: &Row<'_>) -> rusqlite::Result<View> {
    Ok(View {
        id: row.get(0)?,
        title: row.get(1)?,
        view_type: enum_col::<ViewType>(row, 2)?,
        create_at: row.get(3)?,
        query: json_col::<Query>(row, 4)?,
        format: json_col::<Format>(row, 5)?,
    })
}

/// Map a row from `db::host` post column order.
pub fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        message: row.get(3)?,
        post_type: row.get(4)?,
        create_at: row.get(5)?,
    })
}

/// Map a row from `db::host` channel column order.
pub fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        channel_type: enum_col::<ChannelType>(row, 3)?,
    })
}
