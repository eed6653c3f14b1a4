//! # Handler chain
//!
//! Runs a sequence of middleware (before/after) and handlers for each
//! message. Middleware can stop the chain; the first handler that returns
//! Stop or Reply ends handler execution. `after` callbacks run in reverse
//! order on every exit path — also when a middleware or handler failed —
//! so resource cleanup (e.g. closing the request's database session) is
//! guaranteed.

use bot_core::{BotError, Handler, HandlerResponse, Message, Middleware, RequestContext, Result};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Chain of middleware and handlers: middleware run in order (before),
/// then handlers; middleware after run in reverse order.
#[derive(Clone, Default)]
pub struct HandlerChain {
    middleware: Vec<Arc<dyn Middleware>>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain (no middleware, no handlers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware (runs before handlers, after in reverse).
    pub fn add_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends a handler (runs in order; first Stop/Reply ends the handler
    /// phase).
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Runs the chain for one message with a fresh [`RequestContext`].
    ///
    /// The `after` callbacks of every middleware whose `before` ran are
    /// invoked even when a later step failed; the first error is returned
    /// once cleanup finished. A handler failing with [`BotError::Config`]
    /// is a wiring bug, not a user error: it is logged and the chain stops
    /// gracefully instead of crashing the update.
    #[instrument(skip(self, message))]
    pub async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let mut ctx = RequestContext::new();
        let mut final_response = HandlerResponse::Continue;
        let mut chain_error: Option<BotError> = None;

        info!(
            user_id = message.user.id,
            chat_id = message.chat.id,
            message_id = %message.id,
            "handler chain started"
        );

        // Run middleware before in order; count how many ran so exactly
        // those get their after callback.
        let mut entered = 0;
        for mw in &self.middleware {
            match mw.before(message, &mut ctx).await {
                Ok(true) => entered += 1,
                Ok(false) => {
                    entered += 1;
                    debug!(user_id = message.user.id, "middleware stopped the chain");
                    final_response = HandlerResponse::Stop;
                    break;
                }
                Err(err) => {
                    error!(error = %err, user_id = message.user.id, "middleware before failed");
                    chain_error = Some(err);
                    break;
                }
            }
        }

        if chain_error.is_none() && final_response == HandlerResponse::Continue {
            for handler in &self.handlers {
                match handler.handle(message, &ctx).await {
                    Ok(response @ (HandlerResponse::Stop | HandlerResponse::Reply(_))) => {
                        final_response = response;
                        break;
                    }
                    Ok(HandlerResponse::Continue) | Ok(HandlerResponse::Ignore) => continue,
                    Err(BotError::Config(msg)) => {
                        error!(
                            user_id = message.user.id,
                            error = %msg,
                            "handler configuration error; failing this update gracefully"
                        );
                        final_response = HandlerResponse::Stop;
                        break;
                    }
                    Err(err) => {
                        error!(error = %err, user_id = message.user.id, "handler failed");
                        chain_error = Some(err);
                        break;
                    }
                }
            }
        }

        // Cleanup: after callbacks in reverse order, unconditionally.
        for mw in self.middleware[..entered].iter().rev() {
            if let Err(err) = mw.after(message, &final_response, &mut ctx).await {
                error!(error = %err, user_id = message.user.id, "middleware after failed");
                if chain_error.is_none() {
                    chain_error = Some(err);
                }
            }
        }

        match chain_error {
            Some(err) => Err(err),
            None => Ok(final_response),
        }
    }
}
