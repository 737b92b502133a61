//! Schema migrations for PostgreSQL session tables
//!
//! The session table name is configurable, so each migration is a template
//! with a `{table}` placeholder and applied versions are tracked per table.

use satchel_core::{Error, Result};
use sqlx::PgPool;
use tracing::{debug, info};

/// Bookkeeping table shared by every session table in the database
pub const MIGRATIONS_TABLE: &str = "satchel_schema_migrations";

/// Represents a single database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique version number (must be sequential)
    pub version: i32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL template, `{table}` is replaced by the session table name
    pub up_sql: &'static str,
}

impl Migration {
    /// Render the SQL for a concrete table
    pub fn sql_for(&self, table: &str) -> String {
        self.up_sql.replace("{table}", table)
    }
}

/// All migrations in order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Create session table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                name VARCHAR(255) NOT NULL,
                session VARCHAR(255) NOT NULL,
                data BYTEA NOT NULL,
                "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                "updatedAt" TIMESTAMPTZ NULL,
                PRIMARY KEY (name, session)
            )
        "#,
    },
    Migration {
        version: 2,
        description: "Index last activity for expiry sweeps",
        up_sql: r#"
            CREATE INDEX IF NOT EXISTS "idx_{table}_activity"
                ON "{table}" (name, (COALESCE("updatedAt", "createdAt")))
        "#,
    },
];

/// Apply every pending migration for `table`
pub async fn run_migrations(pool: &PgPool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            table_name TEXT NOT NULL,
            version INTEGER NOT NULL,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (table_name, version)
        )
        "#,
        MIGRATIONS_TABLE
    ))
    .execute(pool)
    .await
    .map_err(|e| {
        Error::StorageUnavailable(format!("Failed to create {} table: {}", MIGRATIONS_TABLE, e))
    })?;

    let applied_versions: Vec<i32> = sqlx::query_scalar(&format!(
        "SELECT version FROM {} WHERE table_name = $1",
        MIGRATIONS_TABLE
    ))
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        Error::StorageUnavailable(format!("Failed to fetch applied migrations: {}", e))
    })?;

    debug!(
        "Found {} applied migrations for {}: {:?}",
        applied_versions.len(),
        table,
        applied_versions
    );

    for migration in MIGRATIONS {
        if applied_versions.contains(&migration.version) {
            continue;
        }

        info!(
            "Applying migration {} to {}: {}",
            migration.version, table, migration.description
        );

        sqlx::query(&migration.sql_for(table))
            .execute(pool)
            .await
            .map_err(|e| {
                Error::StorageUnavailable(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query(&format!(
            "INSERT INTO {} (table_name, version, description) VALUES ($1, $2, $3)
                ON CONFLICT (table_name, version) DO NOTHING",
            MIGRATIONS_TABLE
        ))
        .bind(table)
        .bind(migration.version)
        .bind(migration.description)
        .execute(pool)
        .await
        .map_err(|e| {
            Error::StorageUnavailable(format!(
                "Failed to record migration {}: {}",
                migration.version, e
            ))
        })?;
    }

    Ok(())
}

/// Highest applied migration version for `table`, if any
pub async fn get_current_version(pool: &PgPool, table: &str) -> Result<Option<i32>> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::StorageUnavailable(format!("Failed to inspect schema: {}", e)))?;

    if !exists {
        return Ok(None);
    }

    sqlx::query_scalar(&format!(
        "SELECT MAX(version) FROM {} WHERE table_name = $1",
        MIGRATIONS_TABLE
    ))
    .bind(table)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::StorageUnavailable(format!("Failed to read migration version: {}", e)))
}
