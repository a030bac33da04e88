//! Opengold server binary.
//!
//! Wires logging, configuration, the in-memory game engine, and the
//! long-poll HTTP server together.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line (run mode, config path)
//! 2. Initialize structured logging (tracing)
//! 3. Load the config file, generating one with fresh secrets if missing
//! 4. Resolve the mode's settings and apply environment overrides
//! 5. Build the engine and application state
//! 6. Serve until `Ctrl-C`

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use opengold_game::MemoryEngine;
use opengold_server::config::{ConfigFile, DEFAULT_CONFIG_PATH};
use opengold_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Long-poll server for Opengold.
#[derive(Debug, Parser)]
#[command(name = "opengold", version, about)]
struct Args {
    /// Run mode: a section of the config file (`production`, `staging`, `test`).
    mode: String,

    /// Path of the YAML config file. Created with random secrets if missing.
    #[arg(long, env = "OPENGOLD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, state construction, or the server
/// fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!(mode = %args.mode, config = %args.config.display(), "opengold starting");

    let file = ConfigFile::load_or_generate(&args.config)?;
    let mode = file.mode(&args.mode)?;
    let settings = mode.settings();
    info!(
        host = %mode.host,
        port = mode.port,
        longpoll_timeout_secs = mode.longpoll_timeout_secs,
        js_path = %mode.js_path,
        "Configuration loaded"
    );

    let engine = Arc::new(MemoryEngine::new());
    let state = Arc::new(AppState::new(engine, &settings)?);

    start_server(&mode.server_config(), state).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
