//! Session store trait
//!
//! The `SessionStore` trait is the persistence contract every backend
//! implements. A store holds at most one record per `(namespace, session_id)`
//! pair; writes are upserts.

use async_trait::async_trait;

use crate::{Result, SessionId};

/// Outcome of a garbage-collection sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Records deleted because they expired
    pub removed: u64,
    /// Expired records that could not be deleted
    pub failed: u64,
}

/// Session store trait
///
/// Implementations:
/// - `FileSessionStore`: one file per session under a directory
/// - `SqliteSessionStore`: rows in a SQLite table
/// - `PostgresSessionStore`: rows in a PostgreSQL table
///
/// Stores are shared between many managers, so every method takes `&self`
/// and tolerates concurrent calls for different session ids.
///
/// # Example
/// ```no_run
/// # use satchel_core::{SessionId, SessionStore};
/// # async fn example(store: &dyn SessionStore) -> satchel_core::Result<()> {
/// store.open("/var/lib/satchel", "MY_APP").await?;
///
/// let id = SessionId::new("abc123")?;
/// store.write(&id, b"{\"user\":42}").await?;
/// assert_eq!(store.read(&id).await?, b"{\"user\":42}");
///
/// store.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Prepare the store for a namespace
    ///
    /// Creates the directory or table if absent. Relational stores ignore
    /// `save_path`.
    ///
    /// The chosen namespace (or directory) is store-wide state that the next
    /// `open` replaces. Callers sharing a store reopen before each write.
    /// Two tasks interleaving `open` and `write` on one store can still land
    /// in each other's namespace; give such callers separate store instances.
    ///
    /// # Errors
    /// - `Error::StorageUnavailable` if the target cannot be created or written
    async fn open(&self, save_path: &str, namespace: &str) -> Result<()>;

    /// Release per-call resources
    ///
    /// Stores are stateless between calls, so this always succeeds.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Read the stored blob for a session
    ///
    /// Returns an empty blob when no record exists. Absence is not an error.
    ///
    /// # Errors
    /// - `Error::ReadDenied` if the record exists but cannot be read
    /// - `Error::StorageUnavailable` if the store was never opened
    async fn read(&self, session_id: &SessionId) -> Result<Vec<u8>>;

    /// Insert or overwrite the blob for a session
    ///
    /// A new record gets `created_at = now`; an existing one keeps its
    /// creation time and gets `updated_at = now`.
    ///
    /// # Errors
    /// - `Error::WriteDenied` if the record exists and is not writable
    /// - `Error::StorageUnavailable` if the store was never opened
    async fn write(&self, session_id: &SessionId, data: &[u8]) -> Result<()>;

    /// Delete the record for a session
    ///
    /// Deleting an absent record is a no-op.
    ///
    /// # Errors
    /// - `Error::WriteDenied` if the record exists but cannot be removed
    async fn destroy(&self, session_id: &SessionId) -> Result<()>;

    /// Delete every record of the current namespace whose last modification
    /// is strictly more than `max_lifetime_secs` seconds ago
    ///
    /// A record that fails to delete is counted in `GcStats::failed` and the
    /// sweep continues.
    ///
    /// # Errors
    /// - `Error::StorageUnavailable` if the store was never opened
    /// - `Error::WriteDenied` if the sweep itself cannot run
    async fn gc(&self, max_lifetime_secs: u64) -> Result<GcStats>;
}
