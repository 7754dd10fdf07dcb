//! Routes for reader progress.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use leibniz_core::model::{ProgressPatch, UserProgress};
use leibniz_story::application::{command_handlers, query_handlers};
use leibniz_story::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{user_id}
#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProgress>, ApiError> {
    let progress = query_handlers::get_progress(
        &user_id,
        state.clock.as_ref(),
        state.storage.as_ref(),
        &state.locks,
    )
    .await?;
    Ok(Json(progress))
}

/// PATCH /{user_id}
#[instrument(skip(state, patch))]
async fn update_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(patch): Json<ProgressPatch>,
) -> Result<Json<UserProgress>, ApiError> {
    let command = commands::UpdateProgress {
        correlation_id: Uuid::new_v4(),
        user_id,
        patch,
    };

    info!(correlation_id = %command.correlation_id, "handling update_progress command");

    let progress = command_handlers::handle_update_progress(
        &command,
        &state.graph,
        state.clock.as_ref(),
        state.storage.as_ref(),
        &state.locks,
    )
    .await?;

    Ok(Json(progress))
}

/// Returns the router for reader progress.
pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(get_progress).patch(update_progress))
}
