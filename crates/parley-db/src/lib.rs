//! Database layer for the Parley platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode
//! initialization, and embedded SQL migrations. Every table Parley touches
//! is created through versioned migrations managed by this crate.
//!
//! SQLite is deliberate: the whole system runs as a single server process,
//! and WAL mode gives concurrent readers with a single writer, which is
//! exactly the access pattern of one append-mostly message log.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, PoolError, PoolSettings};
