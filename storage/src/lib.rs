//! Storage crate: sessions, statement builders and the generic CRUD
//! repository.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`value`] – Scalar values and ordered field-value maps
//! - [`entity`] – Entity trait and table metadata
//! - [`statement`] – Predicate/Filter algebra and statement builders
//! - [`session`] – Database handle, transactional Session, scoped provider
//! - [`repository`] – Generic Repository with commit control
//! - [`models`] – UserRecord and table DDL
//! - [`user_repo`] – UserRepo specialization

mod entity;
mod error;
pub mod models;
mod repository;
mod session;
mod statement;
mod user_repo;
mod value;

#[cfg(test)]
mod repository_test;

pub use entity::{Entity, TableMeta};
pub use error::StorageError;
pub use repository::{Commit, Repository};
pub use session::{Database, Session};
pub use statement::{DefaultStatements, Filter, Predicate, Statement, StatementBuilder};
pub use user_repo::{UserRepo, UserStatements};
pub use value::{Value, Values};
