//! Bot user model for persistence.
//!
//! Maps to the `users` table; the primary key is the Telegram user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, TableMeta};
use crate::value::{Value, Values};

/// Bootstrap DDL for the `users` table. Executed by the binary and by
/// tests via `Database::run_ddl`; the storage core itself never issues DDL.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    telegram_id BIGINT PRIMARY KEY,
    username TEXT,
    first_name TEXT,
    last_name TEXT,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    updated_at TEXT
)
"#;

static USER_META: TableMeta = TableMeta {
    table: "users",
    primary_key: "telegram_id",
    columns: &[
        "telegram_id",
        "username",
        "first_name",
        "last_name",
        "is_active",
    ],
    audit: true,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    /// Server-set on insert; never written by callers.
    pub created_at: DateTime<Utc>,
    /// Server-set on update; null until the first update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for UserRecord {
    fn meta() -> &'static TableMeta {
        &USER_META
    }

    fn primary_key(&self) -> Value {
        Value::Int(self.telegram_id)
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set("telegram_id", self.telegram_id)
            .set("username", self.username.clone())
            .set("first_name", self.first_name.clone())
            .set("last_name", self.last_name.clone())
            .set("is_active", self.is_active)
    }
}

impl UserRecord {
    /// Display name preferring username, falling back to first name, then
    /// the numeric id.
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.first_name.clone())
            .unwrap_or_else(|| self.telegram_id.to_string())
    }
}
