//! Session store factory
//!
//! Builds the configured `SessionStore` implementation.

use satchel_core::{Error, Result, SessionStore};
use std::sync::Arc;

use crate::config::{Backend, StoreConfig};

const DEFAULT_SQLITE_PATH: &str = "~/.satchel/sessions.db";

/// Create a session store based on configuration
///
/// # Errors
/// - `Error::Config` for an unusable configuration (bad table name, missing
///   PostgreSQL URL, or PostgreSQL requested without the `postgres` feature)
/// - `Error::StorageUnavailable` if the database cannot be reached
pub async fn create_session_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        Backend::File => {
            tracing::info!("Using file session store at {}", config.save_path);
            let store =
                satchel_session_file::FileSessionStore::with_default_dir(&config.save_path)?;
            Ok(Arc::new(store))
        }
        Backend::Sqlite => {
            let path = config
                .database_url
                .as_deref()
                .unwrap_or(DEFAULT_SQLITE_PATH);
            let path = path.strip_prefix("sqlite://").unwrap_or(path);

            tracing::info!("Initializing SQLite session store at {}", path);
            let store = satchel_session_sqlite::SqliteSessionStore::new(
                path,
                Some(config.table.as_str()),
            )
            .await?;
            Ok(Arc::new(store))
        }
        Backend::Postgres => create_postgres_store(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn create_postgres_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        Error::Config("postgres backend requires database_url".to_string())
    })?;

    tracing::info!("Initializing PostgreSQL session store");
    let pg_config = satchel_session_postgres::PostgresSessionStoreConfig::default()
        .with_table(config.table.clone());
    let store = satchel_session_postgres::PostgresSessionStore::with_config(url, pg_config).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn create_postgres_store(_config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    Err(Error::Config(
        "postgres backend requires building satchel with the `postgres` feature".to_string(),
    ))
}
