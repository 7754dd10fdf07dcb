//! Routes for story content, choices, and the reader's map.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use leibniz_core::model::{StoryNode, UserProgress};
use leibniz_story::application::query_handlers::StoryMapView;
use leibniz_story::application::{command_handlers, query_handlers};
use leibniz_story::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /choice.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeChoiceRequest {
    /// The reader making the choice.
    pub user_id: String,
    /// The node the choice is offered on.
    pub node_id: String,
    /// The choice taken.
    pub choice_id: String,
}

/// Request body for POST /revisit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisitRequest {
    /// The reader moving.
    pub user_id: String,
    /// A node the reader has already visited.
    pub node_id: String,
}

/// GET /nodes
#[instrument(skip(state))]
async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<StoryNode>>, ApiError> {
    let nodes = query_handlers::get_story_nodes(state.storage.as_ref()).await?;
    Ok(Json(nodes))
}

/// GET /nodes/{id}
#[instrument(skip(state))]
async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoryNode>, ApiError> {
    let node = query_handlers::get_story_node(&id, state.storage.as_ref()).await?;
    Ok(Json(node))
}

/// POST /choice
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn make_choice(
    State(state): State<AppState>,
    Json(request): Json<MakeChoiceRequest>,
) -> Result<Json<UserProgress>, ApiError> {
    let command = commands::MakeChoice {
        correlation_id: Uuid::new_v4(),
        user_id: request.user_id,
        node_id: request.node_id,
        choice_id: request.choice_id,
    };

    info!(
        correlation_id = %command.correlation_id,
        node_id = %command.node_id,
        choice_id = %command.choice_id,
        "handling make_choice command"
    );

    let progress = command_handlers::handle_make_choice(
        &command,
        &state.graph,
        state.clock.as_ref(),
        state.storage.as_ref(),
        &state.locks,
    )
    .await?;

    Ok(Json(progress))
}

/// POST /revisit
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn revisit_node(
    State(state): State<AppState>,
    Json(request): Json<RevisitRequest>,
) -> Result<Json<UserProgress>, ApiError> {
    let command = commands::RevisitNode {
        correlation_id: Uuid::new_v4(),
        user_id: request.user_id,
        node_id: request.node_id,
    };

    info!(correlation_id = %command.correlation_id, node_id = %command.node_id, "handling revisit_node command");

    let progress = command_handlers::handle_revisit_node(
        &command,
        &state.graph,
        state.clock.as_ref(),
        state.storage.as_ref(),
        &state.locks,
    )
    .await?;

    Ok(Json(progress))
}

/// GET /map/{user_id}
#[instrument(skip(state))]
async fn story_map(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StoryMapView>, ApiError> {
    let map = query_handlers::get_story_map(
        &user_id,
        &state.graph,
        state.clock.as_ref(),
        state.storage.as_ref(),
        &state.locks,
    )
    .await?;
    Ok(Json(map))
}

/// Returns the router for story content and traversal.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nodes", get(list_nodes))
        .route("/nodes/{id}", get(get_node))
        .route("/choice", post(make_choice))
        .route("/revisit", post(revisit_node))
        .route("/map/{user_id}", get(story_map))
}
