//! Core types: user, chat, message, request context, and the Handler and
//! Middleware traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::Session;

use crate::error::{BotError, Result};

/// User identity (id, username, names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Chat (channel or private) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

/// A single inbound or outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    pub content: String,
    pub message_type: String,
    pub direction: MessageDirection,
    pub created_at: DateTime<Utc>,
}

/// Direction of the message (from user or from bot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// Handler result for the chain. `Reply(text)` carries the response body
/// the runner sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// Skip this handler, try next.
    Ignore,
    /// Stop the chain and attach reply text.
    Reply(String),
}

/// Per-request execution context built by the chain and populated by
/// middleware. Holds the request's database session; a handler that needs
/// one pulls it with [`RequestContext::session`].
#[derive(Default)]
pub struct RequestContext {
    session: Option<Arc<Session>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request's database session. Fails with a configuration error
    /// when no session middleware is installed for this route.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.session.clone().ok_or_else(|| {
            BotError::Config(
                "handler requires a database session but none was provided; \
                 is DbSessionMiddleware installed?"
                    .to_string(),
            )
        })
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Injects the request's session. Called by the session middleware at
    /// the start of the unit of work.
    pub fn put_session(&mut self, session: Arc<Session>) {
        self.session = Some(session);
    }

    /// Removes the session for cleanup at the end of the unit of work.
    pub fn take_session(&mut self) -> Option<Arc<Session>> {
        self.session.take()
    }
}

/// Cross-cutting concern around the handler phase: `before` runs in
/// registration order, `after` in reverse order on every exit path.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Runs before the handlers. Return false to stop the chain.
    async fn before(&self, _message: &Message, _ctx: &mut RequestContext) -> Result<bool> {
        Ok(true)
    }

    /// Runs after the handlers, also when a handler failed. Cleanup lives
    /// here.
    async fn after(
        &self,
        _message: &Message,
        _response: &HandlerResponse,
        _ctx: &mut RequestContext,
    ) -> Result<()> {
        Ok(())
    }
}

/// Processes one message. The first handler returning Stop or Reply ends
/// the handler phase.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, message: &Message, ctx: &RequestContext) -> Result<HandlerResponse>;
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific message type to core [`Message`].
pub trait ToCoreMessage: Send + Sync {
    fn to_core(&self) -> Message;
}
