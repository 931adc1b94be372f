//! bucketkv Server Binary
//!
//! Starts the TCP server for bucketkv.

use std::sync::Arc;

use bucketkv::network::Server;
use bucketkv::{Config, Engine, Service};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv Server
#[derive(Parser, Debug)]
#[command(name = "bucketkv-server")]
#[command(about = "Nested-bucket key-value store server")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./bucketkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    listen: String,

    /// Number of request worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Maximum number of open client connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Write transaction acquisition timeout in milliseconds
    #[arg(short, long, default_value = "1000")]
    tx_timeout_ms: u64,

    /// WAL size in MB that triggers a checkpoint (0 disables)
    #[arg(short = 'c', long, default_value = "64")]
    checkpoint_mb: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bucketkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bucketkv Server v{}", bucketkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .workers(args.workers)
        .max_connections(args.max_connections)
        .tx_timeout_ms(args.tx_timeout_ms)
        .checkpoint_threshold(args.checkpoint_mb * 1024 * 1024)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Service::new(Arc::clone(&engine))) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C / SIGTERM handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install signal handler: {}", e);
    }

    let run_result = server.run();

    // Checkpoint so the next start does not replay the WAL
    let closed = match Arc::try_unwrap(engine) {
        Ok(engine) => engine.close(),
        Err(engine) => engine.checkpoint(),
    };
    if let Err(e) = closed {
        tracing::error!("Failed to close engine: {}", e);
    }

    if let Err(e) = run_result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
