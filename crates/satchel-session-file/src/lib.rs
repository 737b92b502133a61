//! File-based session storage for Satchel
//!
//! This crate implements the `SessionStore` trait with one file per session
//! inside a directory. It is the zero-infrastructure backend: no database,
//! just a writable path.
//!
//! # Features
//! - `sess_<id>` file per session
//! - Atomic overwrite through a temp file and rename
//! - Permission checks mapped to `ReadDenied` / `WriteDenied`
//! - Modification-time based garbage collection
//!
//! # Example
//! ```no_run
//! # use satchel_session_file::FileSessionStore;
//! # use satchel_core::{SessionId, SessionStore};
//! # async fn example() -> satchel_core::Result<()> {
//! let store = FileSessionStore::with_default_dir("~/.satchel/sessions")?;
//! store.open("", "SATCHEL_SESSION").await?;
//! let data = store.read(&SessionId::new("abc123")?).await?;
//! # Ok(())
//! # }
//! ```

mod atomic_writer;
mod file_session_store;

pub use file_session_store::{FileSessionStore, SESSION_FILE_PREFIX};
