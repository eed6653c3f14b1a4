//! User repository: the [`Repository`] specialization for [`UserRecord`].
//!
//! Overrides the select statements to order users by registration time and
//! adds the domain helpers the bot handlers use.

use std::ops::Deref;

use crate::entity::TableMeta;
use crate::error::StorageError;
use crate::models::UserRecord;
use crate::repository::{Commit, Repository};
use crate::session::Session;
use crate::statement::{DefaultStatements, Filter, Statement, StatementBuilder};
use crate::value::Values;

/// Statement builder for users: selects carry a default `created_at`
/// ordering so listings are stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserStatements;

impl StatementBuilder for UserStatements {
    fn select_all(&self, meta: &TableMeta) -> Result<Statement, StorageError> {
        let mut stmt = DefaultStatements.select_all(meta)?;
        stmt.push_sql(" ORDER BY created_at");
        Ok(stmt)
    }

    fn select(&self, meta: &TableMeta, filter: &Filter) -> Result<Statement, StorageError> {
        let mut stmt = DefaultStatements.select(meta, filter)?;
        stmt.push_sql(" ORDER BY created_at");
        Ok(stmt)
    }
}

/// Typed repository over the `users` table. Derefs to the generic
/// [`Repository`], so the full CRUD surface stays available.
pub struct UserRepo<'a> {
    repo: Repository<'a, UserRecord, UserStatements>,
}

impl<'a> UserRepo<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            repo: Repository::with_statements(session, UserStatements),
        }
    }

    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<UserRecord, StorageError> {
        self.repo
            .get(Filter::new().eq("telegram_id", telegram_id))
            .await
    }

    /// Fetches the user with the given id, creating it from `values` when
    /// absent. Used by the /start handler.
    pub async fn get_or_create(
        &self,
        telegram_id: i64,
        values: Values,
    ) -> Result<UserRecord, StorageError> {
        match self
            .repo
            .get_or_none(Filter::new().eq("telegram_id", telegram_id))
            .await?
        {
            Some(user) => Ok(user),
            None => {
                self.repo
                    .create(values.set("telegram_id", telegram_id), Commit::Auto)
                    .await
            }
        }
    }

    /// Marks a user inactive; `NotFound` when the id is unknown.
    pub async fn deactivate(&self, telegram_id: i64) -> Result<UserRecord, StorageError> {
        self.repo
            .update_by_id(telegram_id, Values::new().set("is_active", false), Commit::Auto)
            .await
    }

    /// Active users, ordered by registration time.
    pub async fn active(&self) -> Result<Vec<UserRecord>, StorageError> {
        self.repo.filter(Filter::new().eq("is_active", true)).await
    }
}

impl<'a> Deref for UserRepo<'a> {
    type Target = Repository<'a, UserRecord, UserStatements>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
