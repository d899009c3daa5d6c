#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::lifecycle::Lifecycle;
use server::store::MongoStore;
use server::telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let mut lifecycle = Lifecycle::new();

    let connected = lifecycle
        .connect(
            config.connect_timeout,
            MongoStore::connect(
                &config.mongodb_uri,
                &config.database,
                &config.collection,
                config.connect_timeout,
            ),
        )
        .await
        .with_context(|| format!("failed to connect to store at {}", config.mongodb_uri));

    let store = match connected {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("{e:#}");
            providers.shutdown();
            return Err(e);
        }
    };

    let result = lifecycle
        .serve(
            store,
            config.server_addr,
            config.shutdown_timeout,
            shutdown_signal(),
        )
        .await;

    providers.shutdown();
    result
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting country service with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting country service on {} (database `{}`, collection `{}`)",
            config.server_addr,
            config.database,
            config.collection
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
