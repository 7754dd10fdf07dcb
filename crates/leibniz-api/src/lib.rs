//! Leibniz story engine — HTTP API.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use leibniz_core::clock::{Clock, SystemClock};
use leibniz_core::storage::Storage;
use leibniz_store::{MemStorage, PgStorage, run_migrations};
use leibniz_story::application::command_handlers;
use leibniz_story::content;
use leibniz_story::domain::graph::StoryGraph;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/story", routes::story::router())
        .nest("/api/progress", routes::progress::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads and validates the story, connects storage, and publishes the story
/// nodes into it.
///
/// # Errors
///
/// Returns `AppError` if the story cannot be loaded or validated, or if
/// storage cannot be reached.
pub async fn bootstrap(config: &Config) -> Result<AppState, AppError> {
    let nodes = match &config.story_content_path {
        Some(path) => {
            info!(path = %path.display(), "loading story content");
            content::load_story_file(path).await?
        }
        None => content::genesis_nodes()?,
    };

    let graph = StoryGraph::build(nodes, config.dangling_policy)?
        .with_availability_source(config.availability_source);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            run_migrations(&pool).await?;
            info!("using postgres storage");
            Arc::new(PgStorage::new(pool, Arc::clone(&clock)))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemStorage::new(Arc::clone(&clock)))
        }
    };

    command_handlers::publish_story(&graph, storage.as_ref()).await?;

    Ok(AppState::new(Arc::new(graph), storage, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leibniz_story::domain::graph::DanglingPolicy;

    #[tokio::test]
    async fn test_bootstrap_with_defaults_serves_genesis_from_memory() {
        let state = bootstrap(&Config::default()).await.unwrap();

        assert_eq!(state.graph.len(), 10);
        assert_eq!(state.storage.get_all_story_nodes().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_dangling_story_when_strict() {
        let config = Config {
            dangling_policy: DanglingPolicy::Reject,
            ..Config::default()
        };

        let result = bootstrap(&config).await;

        assert!(matches!(result, Err(AppError::Story(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_reports_missing_content_file() {
        let config = Config {
            story_content_path: Some("/nonexistent/story.yaml".into()),
            ..Config::default()
        };

        let result = bootstrap(&config).await;

        assert!(matches!(result, Err(AppError::Story(_))));
    }
}
