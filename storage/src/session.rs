//! Database handle and transactional sessions.
//!
//! [`Database`] wraps the process-wide SQLite pool. A [`Session`] is a
//! single-use transactional handle for one unit of work: acquired at the
//! start of a request, exclusively owned until closed, uncommitted work
//! rolled back on close. [`Database::with_session`] is the scoped form that
//! guarantees cleanup on every exit path.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::query::QueryAs;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::StorageError;
use crate::statement::Statement;
use crate::value::Value;

const MAX_CONNECTIONS: u32 = 5;

/// Process-wide database handle; cheap to clone, shared by all units of
/// work. Hands out one [`Session`] per unit of work.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens a pool for the given database URL (file path or
    /// `sqlite::memory:`), creating the file if missing.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        info!(url = %url, "Initializing SQLite pool");

        let options = SqliteConnectOptions::from_str(url)
            .map_err(StorageError::from)?
            .create_if_missing(true);

        // An in-memory database exists per connection; cap the pool at one
        // so every session sees the same database.
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            MAX_CONNECTIONS
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs schema DDL directly on the pool, outside any session. The
    /// storage layer itself never issues DDL; this exists for bootstrap
    /// code and tests.
    pub async fn run_ddl(&self, sql: &str) -> Result<(), StorageError> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Acquires a session for one unit of work, beginning its transaction.
    /// Fails with [`StorageError::Connectivity`] when the pool cannot
    /// produce a connection within its limits.
    pub async fn session(&self) -> Result<Session, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(Session {
            pool: self.pool.clone(),
            state: Mutex::new(SessionState {
                tx: Some(tx),
                closed: false,
            }),
        })
    }

    /// Scoped session acquisition: opens a session, passes it to `f`, and
    /// guarantees cleanup on every exit path. On error the session is
    /// rolled back, the error logged and then re-raised unchanged; on
    /// success uncommitted work is rolled back by the close.
    pub async fn with_session<F, Fut, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let session = Arc::new(self.session().await?);
        match f(Arc::clone(&session)).await {
            Ok(value) => {
                session.close().await?;
                Ok(value)
            }
            Err(err) => {
                error!(error = %err, "session scope failed, rolling back");
                if let Err(close_err) = session.close().await {
                    error!(error = %close_err, "failed to close session after error");
                }
                Err(err)
            }
        }
    }
}

struct SessionState {
    tx: Option<Transaction<'static, Sqlite>>,
    closed: bool,
}

impl SessionState {
    async fn ensure_tx(
        &mut self,
        pool: &SqlitePool,
    ) -> Result<&mut Transaction<'static, Sqlite>, StorageError> {
        if self.closed {
            return Err(StorageError::SessionClosed);
        }
        if self.tx.is_none() {
            self.tx = Some(pool.begin().await?);
        }
        match self.tx.as_mut() {
            Some(tx) => Ok(tx),
            None => Err(StorageError::SessionClosed),
        }
    }
}

/// A transactional handle bound to one pooled connection, owning at most
/// one pending transaction.
///
/// Statements issued through one session execute in program order on the
/// same transaction. `commit`/`rollback` finish the pending transaction and
/// return the session to idle; the next statement begins a fresh one.
/// `close` is terminal: pending work is rolled back and later statements
/// fail with [`StorageError::SessionClosed`]. Dropping a session drops the
/// inner transaction, which rolls back — cancellation can never leave a
/// dangling open transaction.
pub struct Session {
    pool: SqlitePool,
    state: Mutex<SessionState>,
}

impl Session {
    /// Executes a statement on the session's transaction and maps each
    /// returned row to `E`.
    pub async fn fetch_all<E>(&self, statement: &Statement) -> Result<Vec<E>, StorageError>
    where
        E: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut state = self.state.lock().await;
        let tx = state.ensure_tx(&self.pool).await?;

        let mut query = sqlx::query_as::<_, E>(statement.sql());
        for value in statement.binds() {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&mut **tx).await?;
        debug!(sql = statement.sql(), rows = rows.len(), "statement executed");
        Ok(rows)
    }

    /// Commits the pending transaction. No-op when nothing is pending;
    /// fails once the session is closed.
    pub async fn commit(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(StorageError::SessionClosed);
        }
        if let Some(tx) = state.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Rolls back the pending transaction. Idempotent.
    pub async fn rollback(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if let Some(tx) = state.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Closes the session, rolling back anything uncommitted. Terminal.
    pub async fn close(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.closed = true;
        if let Some(tx) = state.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Whether a transaction is currently pending.
    pub async fn has_open_transaction(&self) -> bool {
        self.state.lock().await.tx.is_some()
    }

    /// Whether the session has been closed.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

fn bind_value<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    value: &'q Value,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Timestamp(v) => query.bind(*v),
    }
}
