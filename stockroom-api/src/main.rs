use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use stockroom_api::{app, AppState};
use stockroom_core::InventoryLedger;
use stockroom_store::{app_config::Config, DbClient, SqliteInventoryRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockroom_api=debug,stockroom_core=info,stockroom_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Stockroom API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .with_context(|| format!("Failed to connect to database at {}", config.database.url))?;
    db.ensure_schema().await.context("Failed to prepare schema")?;

    let repo = SqliteInventoryRepository::new(db.pool.clone());
    let ledger = InventoryLedger::new(Arc::new(repo), config.ledger.limits());

    let app = app(AppState::new(db, ledger));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
}
