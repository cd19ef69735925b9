// Genesis autonomous agent
// Main entry point for the genesis binary

use clap::Parser;
use genesis_engine::cli::{Cli, Command};
use genesis_engine::config::Config;
use genesis_engine::handlers::{
    handle_chat, handle_reset, handle_run, handle_status, OutputFormat,
};
use genesis_engine::telemetry::init_telemetry_with_level;
use sdk::errors::{EngineError, GenesisErrorExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    if let Some(level) = &cli.log {
        config.core.log_level = level.to_lowercase();
        config.validate()?;
    }

    // RUST_LOG still wins over both
    init_telemetry_with_level(&config.core.log_level);

    tracing::info!("Genesis v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Workspace: {}", config.core.workspace.display());

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let result = match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => handle_chat(&config).await,

        Command::Run { task } => {
            tracing::info!("Executing task: {}", task);
            handle_run(task, &config, format).await
        }

        Command::Status { limit } => handle_status(&config, limit, format).await,

        Command::Reset => handle_reset(&config, format).await,
    };

    if let Err(e) = &result {
        if let Some(engine_error) = e.downcast_ref::<EngineError>() {
            eprintln!("hint: {}", engine_error.user_hint());
        }
    }

    result
}
