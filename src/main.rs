//! route-dispatch server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum fallback, request id, timeout, body limit)
//!                         │
//!                         ▼
//!                     dispatch::Dispatcher
//!                         │  routing snapshot → SegmentMatcher (most specific wins)
//!                         │  BeforeDispatch listeners (may answer early)
//!                         │  Container → middleware₁ → … → handler
//!                         │  AfterDispatch listeners
//!                         ▼
//!     Client Response ◀── Response (or logged fallback on any failure)
//!
//!     Startup: config → Framework → modules (dependency order) → listener
//!     Shutdown: signal → drain → ServerStopping → modules unloaded in reverse
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use route_dispatch::config::{load_config, FrameworkConfig};
use route_dispatch::lifecycle::{wait_for_shutdown, Application};
use route_dispatch::observability::{init_tracing, metrics, TracingLogger};

#[derive(Parser)]
#[command(name = "route-dispatch")]
#[command(about = "Modular request dispatch server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load modules and serve HTTP until interrupted (default)
    Serve,
    /// Print the module load order and registered routes as JSON
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FrameworkConfig::default(),
    };
    init_tracing(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        collision_policy = ?config.routing.collision_policy,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Routes => print_routes(config),
    }
}

async fn serve(config: FrameworkConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let app = Application::bootstrap(config, Application::default_modules(), Arc::new(TracingLogger))?;

    let shutdown = app.shutdown_handle();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        shutdown.trigger();
    });

    app.serve(listener).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_routes(config: FrameworkConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = Application::bootstrap(config, Application::default_modules(), Arc::new(TracingLogger))?;
    let inventory = app.inventory();
    println!("{}", serde_json::to_string_pretty(&inventory)?);
    app.unload();
    Ok(())
}
