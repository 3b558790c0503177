//! Command-line entry point for the Memoria store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use memoria_rs::config::{LayeredConfigOptions, MemoriaConfig, StoreBackendKind};
use memoria_rs::memory::{ImportPayload, MemoryStore};
use memoria_rs::server::AppState;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the memoria binary.
#[derive(Parser)]
#[command(name = "memoria", version, about = "Tiered conversational memory store")]
struct Cli {
    /// Extra memoria.json5 applied over the system, user, and cwd layers
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path; overrides store.path
    #[arg(long, global = true)]
    database: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address; overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write both tiers as JSON
    Export {
        /// Only export this user's records
        #[arg(long)]
        user: Option<String>,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load records from an export file
    Import {
        /// Export file to read
        file: PathBuf,
        /// Wipe both tiers before importing instead of merging
        #[arg(long)]
        replace: bool,
    },
    /// Print aggregate counts
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    memoria_rs::init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = memoria_rs::build_store(&config).context("failed to open memory store")?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = AppState::new(Arc::new(store), config.server.clone());
            memoria_rs::server::serve(state, &bind).await?;
        }
        Command::Export { user, output } => export(&store, user.as_deref(), output)?,
        Command::Import { file, replace } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let payload: ImportPayload = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            store.import(payload, !replace)?;
            info!("import finished (file={}, replace={replace})", file.display());
        }
        Command::Info => {
            let info = store.info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<MemoriaConfig> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let mut options = LayeredConfigOptions::new(cwd);
    if let Some(path) = &cli.config {
        options = options.with_runtime_path(path);
    }
    let mut config = MemoriaConfig::load_layered_with_options(options)?.config;
    if let Some(database) = &cli.database {
        config.store.backend = StoreBackendKind::Sqlite;
        config.store.path = database.clone();
    }
    Ok(config)
}

fn export(store: &MemoryStore, user: Option<&str>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let export = store.export(user)?;
    let json = serde_json::to_string_pretty(&export)?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "export written (path={}, records={})",
                path.display(),
                export.len()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
