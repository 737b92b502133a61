use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use satchel_core::table::{DEFAULT_SESSION_NAME, DEFAULT_TABLE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One file per session under `save_path`
    #[default]
    File,
    /// SQLite database at `database_url`
    Sqlite,
    /// PostgreSQL server at `database_url`
    Postgres,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_save_path")]
    pub save_path: String,

    /// SQLite file path or PostgreSQL URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_sql_queries: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            namespace: default_namespace(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            save_path: default_save_path(),
            database_url: None,
            table: default_table(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_sql_queries: false,
        }
    }
}

impl CliConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("parsing TOML config {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing YAML config {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("SATCHEL_BACKEND") {
            match val.parse() {
                Ok(backend) => self.store.backend = backend,
                Err(e) => eprintln!(
                    "Warning: Invalid SATCHEL_BACKEND: {}, using {:?}",
                    e, self.store.backend
                ),
            }
        }

        if let Ok(val) = std::env::var("SATCHEL_SAVE_PATH") {
            self.store.save_path = val;
        }

        if let Ok(val) = std::env::var("SATCHEL_DATABASE_URL") {
            self.store.database_url = Some(val);
        }

        if let Ok(val) = std::env::var("SATCHEL_TABLE") {
            self.store.table = val;
        }

        if let Ok(val) = std::env::var("SATCHEL_NAMESPACE") {
            self.namespace = val;
        }

        if let Ok(val) = std::env::var("SATCHEL_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("SATCHEL_LOG_SQL_QUERIES")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.logging.log_sql_queries = enabled;
        }
    }
}

fn default_save_path() -> String {
    "./sessions".to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_namespace() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
