//! Middleware for the handler chain: session-per-update, logging, auth.

mod db_session;
mod logging_auth;

#[cfg(test)]
mod test;

pub use db_session::DbSessionMiddleware;
pub use logging_auth::{AuthMiddleware, LoggingMiddleware};
