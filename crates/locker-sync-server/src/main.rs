use anyhow::{Context, Result};
use locker_sync::{api, store, Config, Reconciler};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("locker_sync=info,locker_sync_server=info,tower_http=info")),
        )
        .init();

    let config_path =
        std::env::var("LOCKER_SYNC_CONFIG").unwrap_or_else(|_| "locker-sync.toml".to_string());
    let config = Config::load(&config_path)?.with_env()?;

    let store = store::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to package store")?;
    store
        .ensure_schema()
        .await
        .context("Failed to create package schema")?;
    info!("Package store ready ({})", store.name());

    let app = api::router(Reconciler::new(store));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("locker-sync listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("locker-sync stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
