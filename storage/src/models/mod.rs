//! Entity models mapped to relational tables.

mod user;

pub use user::{UserRecord, CREATE_USERS_TABLE};
