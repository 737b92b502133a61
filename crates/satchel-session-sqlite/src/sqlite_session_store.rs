//! SqliteSessionStore - SessionStore trait implementation for SQLite

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info};

use satchel_core::{
    Error, GcStats, Result, SessionId, SessionStore,
    table::{DEFAULT_TABLE, resolve_namespace, validate_table_name},
};

/// SQLite-backed session store
///
/// Rows are keyed by `(name, session)` where `name` is the namespace passed
/// to `open`. Timestamps are stored as unix seconds.
#[derive(Debug)]
pub struct SqliteSessionStore {
    /// SQLite connection pool
    pool: SqlitePool,
    /// Validated table name
    table: String,
    /// Namespace chosen by the last `open`
    namespace: RwLock<Option<String>>,
}

impl SqliteSessionStore {
    /// Open (or create) a SQLite database file and prepare the session table
    ///
    /// # Arguments
    /// * `db_path` - Path to the database file (`~` is expanded)
    /// * `table` - Table name, `None` for the default
    ///
    /// # Errors
    /// - `Error::Config` if the table name is not a plain identifier
    /// - `Error::StorageUnavailable` if the database cannot be opened or the table created
    pub async fn new(db_path: impl Into<PathBuf>, table: Option<&str>) -> Result<Self> {
        let db_path = expand_tilde(db_path.into())?;

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::StorageUnavailable(format!(
                    "Failed to create database directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(|e| {
                Error::StorageUnavailable(format!("Failed to open SQLite database: {}", e))
            })?;

        let store = Self::from_pool(pool, table)?;
        store.create_table().await?;

        info!("Initialized SqliteSessionStore at {:?}", db_path);
        Ok(store)
    }

    /// Create a store over a private in-memory database (useful for testing)
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                Error::StorageUnavailable(format!("Failed to open in-memory SQLite: {}", e))
            })?;

        let store = Self::from_pool(pool, None)?;
        store.create_table().await?;
        Ok(store)
    }

    /// Create from an existing pool
    ///
    /// The table is created on `open`.
    pub fn from_pool(pool: SqlitePool, table: Option<&str>) -> Result<Self> {
        let table = table.unwrap_or(DEFAULT_TABLE);
        validate_table_name(table)?;

        Ok(Self {
            pool,
            table: table.to_string(),
            namespace: RwLock::new(None),
        })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Name of the session table
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                name TEXT NOT NULL,
                session TEXT NOT NULL,
                data BLOB NOT NULL,
                "createdAt" INTEGER NOT NULL,
                "updatedAt" INTEGER NULL,
                PRIMARY KEY (name, session)
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::StorageUnavailable(format!("Failed to create table {}: {}", self.table, e))
        })?;

        Ok(())
    }

    fn namespace(&self) -> Result<String> {
        self.namespace
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                Error::StorageUnavailable("SQLite session store has not been opened".to_string())
            })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn open(&self, _save_path: &str, namespace: &str) -> Result<()> {
        let namespace = resolve_namespace(namespace)?;
        self.create_table().await?;

        debug!("Opened SQLite session store {} for {}", self.table, namespace);
        *self.namespace.write().unwrap_or_else(|e| e.into_inner()) = Some(namespace);
        Ok(())
    }

    async fn read(&self, session_id: &SessionId) -> Result<Vec<u8>> {
        let namespace = self.namespace()?;

        let data: Option<Vec<u8>> = sqlx::query_scalar(&format!(
            r#"SELECT data FROM "{}" WHERE name = ?1 AND session = ?2 LIMIT 1"#,
            self.table
        ))
        .bind(&namespace)
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::ReadDenied(format!("Failed to read session {}: {}", session_id, e)))?;

        Ok(data.unwrap_or_default())
    }

    async fn write(&self, session_id: &SessionId, data: &[u8]) -> Result<()> {
        let namespace = self.namespace()?;
        let now = chrono::Utc::now().timestamp();

        // Single statement upsert, so concurrent writers cannot race between
        // an existence check and the insert
        sqlx::query(&format!(
            r#"
            INSERT INTO "{}" (name, session, data, "createdAt")
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (name, session) DO UPDATE
            SET data = excluded.data,
                "updatedAt" = ?4
            "#,
            self.table
        ))
        .bind(&namespace)
        .bind(session_id.as_str())
        .bind(data)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::WriteDenied(format!("Failed to write session {}: {}", session_id, e))
        })?;

        debug!("Wrote {} bytes for session {}", data.len(), session_id);
        Ok(())
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<()> {
        let namespace = self.namespace()?;

        sqlx::query(&format!(
            r#"DELETE FROM "{}" WHERE name = ?1 AND session = ?2"#,
            self.table
        ))
        .bind(&namespace)
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::WriteDenied(format!("Failed to destroy session {}: {}", session_id, e))
        })?;

        Ok(())
    }

    async fn gc(&self, max_lifetime_secs: u64) -> Result<GcStats> {
        let namespace = self.namespace()?;
        let max_lifetime = i64::try_from(max_lifetime_secs).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now().timestamp().saturating_sub(max_lifetime);

        let result = sqlx::query(&format!(
            r#"
            DELETE FROM "{}"
            WHERE name = ?1
              AND COALESCE("updatedAt", "createdAt") < ?2
            "#,
            self.table
        ))
        .bind(&namespace)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::WriteDenied(format!("Failed to collect expired sessions: {}", e)))?;

        let stats = GcStats {
            removed: result.rows_affected(),
            failed: 0,
        };

        if stats.removed > 0 {
            info!(
                "Session gc in {} for {}: removed {}",
                self.table, namespace, stats.removed
            );
        }

        Ok(stats)
    }
}

/// Expand tilde (~) in path
fn expand_tilde(path: PathBuf) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or_else(|| {
                Error::Config("Could not determine home directory".to_string())
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    async fn open_store() -> SqliteSessionStore {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        store.open("", "TEST").await.unwrap();
        store
    }

    async fn timestamps(store: &SqliteSessionStore, sid: &str) -> (i64, Option<i64>) {
        sqlx::query_as(&format!(
            r#"SELECT "createdAt", "updatedAt" FROM "{}" WHERE session = ?1"#,
            store.table()
        ))
        .bind(sid)
        .fetch_one(store.pool())
        .await
        .unwrap()
    }

    async fn backdate(store: &SqliteSessionStore, sid: &str, created_ago: i64, updated_ago: Option<i64>) {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(&format!(
            r#"UPDATE "{}" SET "createdAt" = ?1, "updatedAt" = ?2 WHERE session = ?3"#,
            store.table()
        ))
        .bind(now - created_ago)
        .bind(updated_ago.map(|ago| now - ago))
        .bind(sid)
        .execute(store.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_store_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/sessions.db");

        let store = SqliteSessionStore::new(&db_path, None).await;
        assert!(store.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_custom_table_name() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sessions.db");

        let store = SqliteSessionStore::new(&db_path, Some("app_sessions"))
            .await
            .unwrap();
        assert_eq!(store.table(), "app_sessions");

        store.open("", "TEST").await.unwrap();
        store.write(&id("abc"), b"x").await.unwrap();
        assert_eq!(store.read(&id("abc")).await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_invalid_table_name_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sessions.db");

        let result = SqliteSessionStore::new(&db_path, Some("x; DROP TABLE y")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_read_before_open() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let result = store.read(&id("abc")).await;
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_insert_then_update_timestamps() {
        let store = open_store().await;
        let sid = id("stamped");

        store.write(&sid, b"v1").await.unwrap();
        let (created, updated) = timestamps(&store, "stamped").await;
        assert!(created > 0);
        assert!(updated.is_none());

        backdate(&store, "stamped", 100, None).await;
        store.write(&sid, b"v2").await.unwrap();

        let (created_after, updated_after) = timestamps(&store, "stamped").await;
        assert!(created_after < created, "createdAt must be preserved on update");
        assert!(updated_after.is_some());
        assert_eq!(store.read(&sid).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_single_row_per_session() {
        let store = open_store().await;
        let sid = id("once");

        for i in 0..5 {
            store.write(&sid, format!("v{}", i).as_bytes()).await.unwrap();
        }

        let count: i64 = sqlx::query_scalar(&format!(
            r#"SELECT COUNT(*) FROM "{}""#,
            store.table()
        ))
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.read(&sid).await.unwrap(), b"v4");
    }

    #[tokio::test]
    async fn test_gc_window_uses_created_at() {
        let store = open_store().await;
        let sid = id("aging");
        store.write(&sid, b"data").await.unwrap();

        // Written 30s ago, lifetime 50s: survives
        backdate(&store, "aging", 30, None).await;
        assert_eq!(store.gc(50).await.unwrap().removed, 0);
        assert_eq!(store.read(&sid).await.unwrap(), b"data");

        // Written 100s ago, lifetime 50s: removed
        backdate(&store, "aging", 100, None).await;
        assert_eq!(store.gc(50).await.unwrap().removed, 1);
        assert!(store.read(&sid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gc_prefers_updated_at() {
        let store = open_store().await;
        let sid = id("active");
        store.write(&sid, b"data").await.unwrap();

        // Created long ago but updated recently
        backdate(&store, "active", 10_000, Some(10)).await;
        assert_eq!(store.gc(50).await.unwrap().removed, 0);

        // Last update also expired
        backdate(&store, "active", 10_000, Some(100)).await;
        assert_eq!(store.gc(50).await.unwrap().removed, 1);
    }

    #[tokio::test]
    async fn test_gc_only_touches_current_namespace() {
        let store_a = open_store().await;
        let store_b = SqliteSessionStore::from_pool(store_a.pool().clone(), None).unwrap();
        store_b.open("", "OTHER").await.unwrap();

        store_a.write(&id("shared-id"), b"a").await.unwrap();
        store_b.write(&id("shared-id"), b"b").await.unwrap();

        let now = chrono::Utc::now().timestamp();
        sqlx::query(&format!(r#"UPDATE "{}" SET "createdAt" = ?1"#, store_a.table()))
            .bind(now - 1000)
            .execute(store_a.pool())
            .await
            .unwrap();

        assert_eq!(store_a.gc(60).await.unwrap().removed, 1);
        assert!(store_a.read(&id("shared-id")).await.unwrap().is_empty());
        assert_eq!(store_b.read(&id("shared-id")).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store_a = open_store().await;
        let store_b = SqliteSessionStore::from_pool(store_a.pool().clone(), None).unwrap();
        store_b.open("", "OTHER").await.unwrap();

        store_a.write(&id("abc"), b"from-a").await.unwrap();
        assert!(store_b.read(&id("abc")).await.unwrap().is_empty());

        store_b.destroy(&id("abc")).await.unwrap();
        assert_eq!(store_a.read(&id("abc")).await.unwrap(), b"from-a");
    }

    #[tokio::test]
    async fn test_empty_namespace_uses_default() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        store.open("", "").await.unwrap();
        store.write(&id("abc"), b"x").await.unwrap();

        let name: String = sqlx::query_scalar(&format!(
            r#"SELECT name FROM "{}" WHERE session = 'abc'"#,
            store.table()
        ))
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(name, satchel_core::table::DEFAULT_SESSION_NAME);
    }
}
