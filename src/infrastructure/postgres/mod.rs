//! PostgreSQL persistence module.
//!
//! Provides connection pooling for the catalog, directory, file and tag
//! backends.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
