//! Leibniz API server entry point.

use leibniz_api::config::Config;
use leibniz_api::error::AppError;
use leibniz_api::{bootstrap, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Leibniz API server");

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;

    let app_state = bootstrap(&config).await?;
    tracing::info!(
        nodes = app_state.graph.len(),
        graph_version = app_state.graph.version_hash(),
        "story loaded"
    );

    let app = build_router(app_state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
