//! Scout CLI
//!
//! Main entry point for the scout command-line tool.
//! Runs agentic and plain retrieval queries against the workspace store.

mod commands;

use clap::{Parser, Subcommand};
use commands::{QueryCommand, SearchCommand, TopicsCommand};
use scout_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;

/// Scout - agentic retrieval over local topic stores
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(about = "Agentic retrieval over local topic stores", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SCOUT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan, retrieve, evaluate and refine a query
    Query(QueryCommand),

    /// Plain vector search without planning
    Search(SearchCommand),

    /// List topics in the store
    Topics(TopicsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is merged, so they are
    // resolved before the file layer is read
    let config = AppConfig::load_from(cli.workspace, cli.config)?;
    let config = config.with_overrides(None, None, cli.log_level, cli.verbose, cli.no_color);

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        LogFormat::parse(&config.log_format)?,
    )?;

    tracing::info!("Scout CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding: {}/{} ({} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    config.validate()?;
    config.ensure_scout_dir()?;

    let command_name = match &cli.command {
        Commands::Query(_) => "query",
        Commands::Search(_) => "search",
        Commands::Topics(_) => "topics",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Topics(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
