//! Draftdeck server - HTTP/WebSocket bridge for agent terminal sessions.

use anyhow::Result;
use clap::Parser;
use draftdeck_server::{config::Config, logging, routes, state::AppState};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use logging::{LogConfig, LogFormat};

/// Draftdeck server - hosts agent CLIs in PTYs and streams parsed events.
#[derive(Parser, Debug)]
#[command(name = "draftdeck-server")]
#[command(about = "HTTP/WebSocket bridge for agent terminal sessions")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging (INFO level for most targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (DEBUG level, excludes ping traces)
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "parser=debug" or "ws::ping=trace").
    /// Can be specified multiple times. Targets are prefixed with "draftdeck::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Parse a captured transcript, print events as JSON lines, and exit
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Feed the replayed transcript in chunks of N bytes (0 = whole file)
    #[arg(long, value_name = "N", default_value_t = 0, requires = "replay")]
    chunk_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    if let Some(path) = &cli.replay {
        return replay(path, cli.chunk_size);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!(
        target: "draftdeck::startup",
        "Loaded configuration (port: {}, shell: {:?}, max sessions: {})",
        config.port,
        config.shell,
        config.max_concurrent_sessions
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config));
    let app = routes::router(state);

    tracing::info!(target: "draftdeck::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Offline mode: one JSON event per line on stdout.
fn replay(path: &std::path::Path, chunk_size: usize) -> Result<()> {
    let events = draftdeck_core::replay_file(path, chunk_size)?;
    tracing::info!(target: "draftdeck::startup", "Replayed {:?}: {} events", path, events.len());

    let mut out = std::io::stdout().lock();
    for event in &events {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    Ok(())
}
