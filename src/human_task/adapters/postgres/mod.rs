//! `PostgreSQL` adapters for human-task persistence.

pub mod models;
mod repository;
pub mod schema;

pub use repository::{HumanTaskPgPool, PostgresHumanTaskRepository};
