//! SQLite session storage for single-node Satchel deployments
//!
//! This crate implements the `SessionStore` trait on a SQLite table keyed by
//! `(name, session)`.
//!
//! # Features
//! - Single-statement upsert (`INSERT ... ON CONFLICT DO UPDATE`)
//! - Single-statement expiry sweep
//! - WAL journal mode for file databases
//! - In-memory mode for tests
//!
//! # Example
//! ```no_run
//! # use satchel_session_sqlite::SqliteSessionStore;
//! # use satchel_core::SessionStore;
//! # async fn example() -> satchel_core::Result<()> {
//! let store = SqliteSessionStore::new("~/.satchel/sessions.db", None).await?;
//! store.open("", "SATCHEL_SESSION").await?;
//! # Ok(())
//! # }
//! ```

mod sqlite_session_store;

pub use sqlite_session_store::SqliteSessionStore;
