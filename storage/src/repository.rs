//! Generic CRUD repository over one entity type and one session.
//!
//! A repository is a typed façade created per unit of work; it borrows the
//! session and never outlives it. Single-row `update`/`delete` enforce
//! exactly-one semantics: an underspecified filter fails loudly with
//! [`StorageError::Ambiguous`] instead of silently touching an arbitrary
//! row. When an exactly-one check fails, the statement stays uncommitted
//! and is rolled back by the session's cleanup path.

use std::marker::PhantomData;

use tracing::debug;

use crate::entity::{Entity, TableMeta};
use crate::error::StorageError;
use crate::session::Session;
use crate::statement::{DefaultStatements, Filter, StatementBuilder};
use crate::value::{Value, Values};

/// Transaction control for mutating operations.
///
/// `Auto` commits right after the statement; `Defer` leaves the transaction
/// open so several repository calls batch into one, finished later with
/// [`Repository::commit`] or [`Repository::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Auto,
    Defer,
}

/// Generic repository binding an entity type to a borrowed session.
pub struct Repository<'a, E, S = DefaultStatements> {
    session: &'a Session,
    meta: &'static TableMeta,
    statements: S,
    _entity: PhantomData<E>,
}

impl<'a, E: Entity> Repository<'a, E> {
    pub fn new(session: &'a Session) -> Self {
        Self::with_statements(session, DefaultStatements)
    }
}

impl<'a, E: Entity, S: StatementBuilder> Repository<'a, E, S> {
    /// Creates a repository with a custom statement builder (ordering,
    /// scoping, soft-delete filters).
    pub fn with_statements(session: &'a Session, statements: S) -> Self {
        Self {
            session,
            meta: E::meta(),
            statements,
            _entity: PhantomData,
        }
    }

    pub fn meta(&self) -> &'static TableMeta {
        self.meta
    }

    /// Inserts one row and returns it with server-generated fields
    /// populated.
    pub async fn create(&self, values: Values, commit: Commit) -> Result<E, StorageError> {
        let stmt = self
            .statements
            .insert(self.meta, std::slice::from_ref(&values))?;
        let rows = self.session.fetch_all::<E>(&stmt).await?;
        let created = self.exactly_one(rows, "insert")?;
        self.finish(commit).await?;
        Ok(created)
    }

    /// Inserts several rows in a single statement; the batch is atomic, a
    /// failing row aborts the whole insert.
    pub async fn create_many(
        &self,
        rows: Vec<Values>,
        commit: Commit,
    ) -> Result<Vec<E>, StorageError> {
        let stmt = self.statements.insert(self.meta, &rows)?;
        let created = self.session.fetch_all::<E>(&stmt).await?;
        debug!(table = self.meta.table, rows = created.len(), "created rows");
        self.finish(commit).await?;
        Ok(created)
    }

    /// Inserts an unpersisted instance, reading its caller-settable fields.
    pub async fn create_from(&self, entity: &E, commit: Commit) -> Result<E, StorageError> {
        self.create(entity.to_values(), commit).await
    }

    /// All rows, unordered unless the statement builder overrides ordering.
    pub async fn all(&self) -> Result<Vec<E>, StorageError> {
        let stmt = self.statements.select_all(self.meta)?;
        self.session.fetch_all(&stmt).await
    }

    /// Rows matching the filter; empty vec when nothing matches.
    pub async fn filter(&self, filter: Filter) -> Result<Vec<E>, StorageError> {
        let stmt = self.statements.select(self.meta, &filter)?;
        self.session.fetch_all(&stmt).await
    }

    /// The single row matching the filter, or `None`. More than one match
    /// is a caller filter bug and fails with `Ambiguous`.
    pub async fn get_or_none(&self, filter: Filter) -> Result<Option<E>, StorageError> {
        let stmt = self.statements.select(self.meta, &filter)?;
        let mut rows = self.session.fetch_all::<E>(&stmt).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(StorageError::Ambiguous(format!(
                "select on {} matched {} rows",
                self.meta.table, n
            ))),
        }
    }

    /// The single row matching the filter; `NotFound` when zero match.
    pub async fn get(&self, filter: Filter) -> Result<E, StorageError> {
        let stmt = self.statements.select(self.meta, &filter)?;
        let rows = self.session.fetch_all::<E>(&stmt).await?;
        self.exactly_one(rows, "select")
    }

    /// Updates exactly one row and returns it; `NotFound` on zero matches,
    /// `Ambiguous` on more than one (the statement is left uncommitted).
    pub async fn update(
        &self,
        filter: Filter,
        values: Values,
        commit: Commit,
    ) -> Result<E, StorageError> {
        let stmt = self.statements.update(self.meta, &filter, &values)?;
        let rows = self.session.fetch_all::<E>(&stmt).await?;
        let updated = self.exactly_one(rows, "update")?;
        self.finish(commit).await?;
        Ok(updated)
    }

    /// Updates every matching row; zero matches return an empty vec.
    pub async fn update_many(
        &self,
        filter: Filter,
        values: Values,
        commit: Commit,
    ) -> Result<Vec<E>, StorageError> {
        let stmt = self.statements.update(self.meta, &filter, &values)?;
        let updated = self.session.fetch_all::<E>(&stmt).await?;
        self.finish(commit).await?;
        Ok(updated)
    }

    /// Updates the row with the given primary key.
    pub async fn update_by_id(
        &self,
        id: impl Into<Value>,
        values: Values,
        commit: Commit,
    ) -> Result<E, StorageError> {
        self.update(self.pk_filter(id.into()), values, commit).await
    }

    /// Deletes exactly one row and returns it; same `NotFound`/`Ambiguous`
    /// rules as [`Repository::update`].
    pub async fn delete(&self, filter: Filter, commit: Commit) -> Result<E, StorageError> {
        let stmt = self.statements.delete(self.meta, &filter)?;
        let rows = self.session.fetch_all::<E>(&stmt).await?;
        let deleted = self.exactly_one(rows, "delete")?;
        self.finish(commit).await?;
        Ok(deleted)
    }

    /// Deletes every matching row; zero matches return an empty vec.
    pub async fn delete_many(
        &self,
        filter: Filter,
        commit: Commit,
    ) -> Result<Vec<E>, StorageError> {
        let stmt = self.statements.delete(self.meta, &filter)?;
        let deleted = self.session.fetch_all::<E>(&stmt).await?;
        self.finish(commit).await?;
        Ok(deleted)
    }

    /// Deletes the row with the given primary key.
    pub async fn delete_by_id(
        &self,
        id: impl Into<Value>,
        commit: Commit,
    ) -> Result<E, StorageError> {
        self.delete(self.pk_filter(id.into()), commit).await
    }

    /// Deletes the row whose primary key equals the instance's.
    pub async fn delete_from(&self, entity: &E, commit: Commit) -> Result<E, StorageError> {
        self.delete(self.pk_filter(entity.primary_key()), commit)
            .await
    }

    /// Deletes the rows whose primary keys equal the instances'.
    pub async fn delete_many_from(
        &self,
        entities: &[E],
        commit: Commit,
    ) -> Result<Vec<E>, StorageError> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Value> = entities.iter().map(|e| e.primary_key()).collect();
        let filter = Filter::new().is_in(self.meta.primary_key, ids);
        self.delete_many(filter, commit).await
    }

    /// Commits the session's pending transaction. Conflicts surface to the
    /// caller; no automatic retry.
    pub async fn commit(&self) -> Result<(), StorageError> {
        self.session.commit().await
    }

    /// Rolls back the session's pending transaction. Idempotent.
    pub async fn rollback(&self) -> Result<(), StorageError> {
        self.session.rollback().await
    }

    fn pk_filter(&self, id: Value) -> Filter {
        Filter::new().eq(self.meta.primary_key, id)
    }

    fn exactly_one(&self, mut rows: Vec<E>, op: &str) -> Result<E, StorageError> {
        if rows.len() > 1 {
            return Err(StorageError::Ambiguous(format!(
                "{} on {} matched {} rows",
                op,
                self.meta.table,
                rows.len()
            )));
        }
        rows.pop().ok_or_else(|| {
            StorageError::NotFound(format!("{} on {} matched no rows", op, self.meta.table))
        })
    }

    async fn finish(&self, commit: Commit) -> Result<(), StorageError> {
        if commit == Commit::Auto {
            self.session.commit().await?;
        }
        Ok(())
    }
}
