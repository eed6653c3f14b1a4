//! Entity trait: binds a Rust record type to one relational table.

use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use crate::value::{Value, Values};

/// Static field-to-column mapping for one table. Read-only metadata; the
/// storage layer never issues DDL from it.
#[derive(Debug)]
pub struct TableMeta {
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Caller-settable columns. Audit columns are not listed here.
    pub columns: &'static [&'static str],
    /// When true the table carries `created_at` (server default on insert)
    /// and `updated_at` (set by the update statement).
    pub audit: bool,
}

/// A record type mapped 1:1 to a relational table.
///
/// Repositories capture [`Entity::meta`] at construction time; there is no
/// global model registry.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin {
    fn meta() -> &'static TableMeta;

    /// Current primary-key value of this instance.
    fn primary_key(&self) -> Value;

    /// Caller-settable fields of this instance, for insert-from-instance.
    /// Must never include audit columns.
    fn to_values(&self) -> Values;
}
