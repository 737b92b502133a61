//! Configuration for the PostgreSQL session store

use std::time::Duration;

/// Configuration for PostgreSQL connection pool
///
/// These settings control the behavior of the underlying sqlx connection pool.
///
/// # Example
/// ```
/// use satchel_session_postgres::PostgresSessionStoreConfig;
/// use std::time::Duration;
///
/// let config = PostgresSessionStoreConfig::default()
///     .with_max_connections(50)
///     .with_table("app_sessions");
/// ```
#[derive(Debug, Clone)]
pub struct PostgresSessionStoreConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,

    /// How long a connection can remain idle before being closed
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection (to handle connection refresh)
    pub max_lifetime: Duration,

    /// Session table name, `None` for the default
    pub table: Option<String>,
}

impl Default for PostgresSessionStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600), // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
            table: None,
        }
    }
}

impl PostgresSessionStoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of connections
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set minimum number of connections
    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections;
        self
    }

    /// Set acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set maximum lifetime
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Store sessions in a custom table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}
