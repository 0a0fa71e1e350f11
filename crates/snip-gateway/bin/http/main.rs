mod cli;

use crate::cli::{LogFormatArg, CLI};
use clap::Parser;
use snip_gateway::{App, AppState};
use snip_generator::RandomGenerator;
use snip_shortener::ShortenerService;
use snip_storage::{open_store, StoreConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::parse();
    init_tracing(&config);

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage = if config.database_dsn().is_some() { "postgres" } else { "memory" },
        "starting gateway server"
    );

    let store_config = StoreConfig::builder()
        .snapshot_path_opt(config.snapshot_path())
        .database_url_opt(config.database_dsn().map(str::to_string))
        .max_connections(config.max_connections)
        .build();
    let store = open_store(&store_config).await?;

    let shortener = ShortenerService::new(
        Arc::clone(&store),
        RandomGenerator::with_length(config.code_length),
        config.base_url.as_str(),
    );
    let app = App::router(AppState::new(shortener));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped, closing store");
    store.close().await?;
    Ok(())
}

fn init_tracing(config: &CLI) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormatArg::Json => builder.json().init(),
        LogFormatArg::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => warn!(error = %err, "failed to listen for ctrl-c, shutting down"),
    }
}
