//! Satchel Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Satchel:
//! - The `SessionStore` backend contract
//! - Validated session identifiers
//! - Naming rules for relational schemas
//! - Core error types

pub mod error;
pub mod session_id;
pub mod session_store;
pub mod table;

pub use error::{Error, Result};
pub use session_id::SessionId;
pub use session_store::{GcStats, SessionStore};
