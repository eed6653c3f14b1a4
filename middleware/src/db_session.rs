//! Session-per-update middleware.
//!
//! Opens one database session per incoming message, injects it into the
//! request context for handlers, and closes it when the handler phase is
//! over. Uncommitted work is rolled back on close; the chain guarantees
//! `after` runs on every exit path, so no update can leak an open
//! transaction.

use std::sync::Arc;

use async_trait::async_trait;
use bot_core::{HandlerResponse, Message, Middleware, RequestContext, Result};
use storage::Database;
use tracing::{debug, error, instrument};

#[derive(Clone)]
pub struct DbSessionMiddleware {
    db: Database,
}

impl DbSessionMiddleware {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Middleware for DbSessionMiddleware {
    #[instrument(skip(self, message, ctx))]
    async fn before(&self, message: &Message, ctx: &mut RequestContext) -> Result<bool> {
        // Pool exhaustion surfaces as a connectivity error here; no retry,
        // the transport layer owns backoff.
        let session = self.db.session().await?;
        ctx.put_session(Arc::new(session));
        debug!(
            user_id = message.user.id,
            chat_id = message.chat.id,
            "database session opened for update"
        );
        Ok(true)
    }

    #[instrument(skip(self, message, _response, ctx))]
    async fn after(
        &self,
        message: &Message,
        _response: &HandlerResponse,
        ctx: &mut RequestContext,
    ) -> Result<()> {
        if let Some(session) = ctx.take_session() {
            session.close().await.map_err(|e| {
                error!(error = %e, user_id = message.user.id, "failed to close session");
                e
            })?;
            debug!(user_id = message.user.id, "database session closed");
        }
        Ok(())
    }
}
