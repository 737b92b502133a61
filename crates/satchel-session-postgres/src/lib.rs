//! PostgreSQL-backed session storage for shared Satchel deployments
//!
//! This crate implements the `SessionStore` trait on a PostgreSQL table keyed
//! by `(name, session)`, so several application servers can share one set of
//! sessions.
//!
//! # Features
//! - Versioned schema migrations, tracked per session table
//! - Single-statement upsert and expiry sweep
//! - Tunable connection pool
//!
//! # Example
//! ```no_run
//! # use satchel_session_postgres::PostgresSessionStore;
//! # use satchel_core::SessionStore;
//! # async fn example() -> satchel_core::Result<()> {
//! let store = PostgresSessionStore::new("postgres://localhost/satchel").await?;
//! store.open("", "SATCHEL_SESSION").await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub mod migrations;
mod postgres_session_store;

pub use config::PostgresSessionStoreConfig;
pub use postgres_session_store::PostgresSessionStore;
