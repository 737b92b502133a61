//! Satchel CLI
//!
//! Command-line interface for inspecting and maintaining session stores

mod commands;
mod config;
mod session_factory;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::Target;
use config::CliConfig;
use satchel_core::SessionId;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Satchel - pluggable session-state store", long_about = None)]
struct Cli {
    /// Path to a YAML or TOML configuration file
    #[arg(short, long, env = "SATCHEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove sessions idle longer than the given lifetime
    Gc {
        /// Maximum idle time in seconds
        #[arg(long, default_value = "1440")]
        max_lifetime: u64,
    },
    /// Print every attribute of a session as JSON
    Show { id: SessionId },
    /// Print one attribute of a session
    Get { id: SessionId, key: String },
    /// Store a JSON value in a session
    Set {
        id: SessionId,
        key: String,
        /// Value as JSON, e.g. `42` or `'"text"'`
        value: String,
    },
    /// Delete a session record
    Destroy { id: SessionId },
}

fn init_tracing(config: &CliConfig) -> anyhow::Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::new(format!("{}", log_level));

    // sqlx logs every statement at debug level
    if !config.logging.log_sql_queries {
        match "sqlx=warn".parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Warning: Failed to set sqlx log filter: {}", e),
        }
    }

    // Logs go to stderr so command output stays pipeable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    config.merge_env();

    init_tracing(&config)?;
    match &cli.config {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Using default configuration"),
    }

    let store = session_factory::create_session_store(&config.store).await?;
    let target = Target {
        store,
        save_path: config.store.save_path.clone(),
        namespace: config.namespace.clone(),
    };

    match cli.command {
        Commands::Gc { max_lifetime } => {
            let stats = commands::gc(&target, max_lifetime).await?;
            println!("removed: {}, failed: {}", stats.removed, stats.failed);
        }
        Commands::Show { id } => {
            let attributes = commands::show(&target, id).await?;
            println!("{}", serde_json::to_string_pretty(&attributes)?);
        }
        Commands::Get { id, key } => {
            let value = commands::get(&target, id, &key).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Set { id, key, value } => {
            commands::set(&target, id, &key, &value).await?;
        }
        Commands::Destroy { id } => {
            commands::destroy(&target, id).await?;
        }
    }

    Ok(())
}
