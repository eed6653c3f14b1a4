//! # Handlers
//!
//! Command handlers for the bot: /start, /users, /stop. All persistence
//! goes through the request-scoped session provided by the middleware.

mod basic;


pub use basic::{StartHandler, StopHandler, UsersHandler};
