//! # bot-core
//!
//! Core types and traits for the Telegram bot: [`Bot`], [`Handler`],
//! [`Middleware`], [`RequestContext`], message and user types, and tracing
//! initialization. Transport-agnostic; used by the middleware, handler and
//! binary crates.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{Bot, TelegramBot};
pub use error::{BotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    Chat, Handler, HandlerResponse, Message, MessageDirection, Middleware, RequestContext,
    ToCoreMessage, ToCoreUser, User,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_without_session_is_config_error() {
        let ctx = RequestContext::new();
        match ctx.session() {
            Err(BotError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
