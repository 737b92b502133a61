//! Satchel Session Manager
//!
//! This crate provides the per-request session API:
//! - `SessionManager` lifecycle (start, save, destroy, regenerate id)
//! - Attribute access with recursive merge
//! - Session options and cookie parameters
//! - Background garbage collection

pub mod attributes;
pub mod gc_task;
pub mod host;
pub mod manager;
pub mod options;

pub use attributes::Attributes;
pub use gc_task::{GcSchedule, GcTask, spawn_gc_task};
pub use host::{CookieParams, DefaultSessionHost, SessionHost};
pub use manager::{SessionManager, SessionState};
pub use options::{SessionOptions, SessionSettings};
