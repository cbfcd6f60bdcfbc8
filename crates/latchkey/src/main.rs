// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Latchkey - a local encrypted record vault.
//!
//! This is the binary entry point. Every command runs the vault engine
//! in-process against the configured SQLite database.

mod shell;
mod status;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use latchkey_config::model::LatchkeyConfig;
use latchkey_core::{LatchkeyError, SystemClock};
use latchkey_security::ZxcvbnEstimator;
use latchkey_storage::SqliteStore;
use latchkey_vault::VaultService;
use tracing::debug;

/// Latchkey - a local encrypted record vault.
#[derive(Parser, Debug)]
#[command(name = "latchkey", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the vault has been initialized.
    Status {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Create a new vault protected by a master password.
    Init,
    /// Launch an interactive vault session.
    Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match latchkey_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            latchkey_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Init) => run_init(&config).await,
        Some(Commands::Shell) => shell::run_shell(&config).await,
        None => {
            println!("latchkey: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

/// Open the configured store and wire a vault service over it.
pub(crate) async fn open_vault(
    config: &LatchkeyConfig,
) -> Result<(Arc<SqliteStore>, VaultService), LatchkeyError> {
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    debug!(database = %config.storage.database_path, "vault store opened");
    let service = VaultService::new(
        config,
        store.clone(),
        Arc::new(ZxcvbnEstimator::new()),
        Arc::new(SystemClock),
    );
    Ok((store, service))
}

/// Checkpoint and close the store once the service holding it is gone.
pub(crate) async fn close_vault(
    store: Arc<SqliteStore>,
    service: VaultService,
) -> Result<(), LatchkeyError> {
    drop(service);
    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await,
        Err(_) => Ok(()),
    }
}

/// Run `latchkey init`.
async fn run_init(config: &LatchkeyConfig) -> Result<(), LatchkeyError> {
    let (store, service) = open_vault(config).await?;
    if service.status().await?.initialized {
        close_vault(store, service).await?;
        return Err(LatchkeyError::AlreadyInitialized);
    }

    let password = latchkey_vault::new_master_password()?;
    let outcome = service.initialize(&password).await;
    if let Err(LatchkeyError::WeakPassword {
        warning,
        suggestions,
        ..
    }) = &outcome
    {
        shell::print_strength_hints(warning.as_deref(), suggestions);
    }
    outcome?;

    println!(
        "{} vault created at {}",
        "✓".green(),
        config.storage.database_path
    );
    close_vault(store, service).await
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "latchkey={log_level},latchkey_vault={log_level},latchkey_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
