//! Query handlers for story content and reader progress.

use leibniz_core::clock::Clock;
use leibniz_core::error::DomainError;
use leibniz_core::model::{Position, StoryNode, UserProgress};
use leibniz_core::storage::Storage;
use serde::Serialize;

use crate::application::command_handlers;
use crate::application::locks::ProgressLocks;
use crate::domain::availability::{NodeState, classify_all};
use crate::domain::graph::StoryGraph;

/// How many trailing visited nodes make up the breadcrumb path.
const RECENT_PATH_LEN: usize = 3;

/// One node as it appears on a reader's map.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNodeView {
    /// The node identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Map coordinates.
    #[serde(flatten)]
    pub position: Position,
    /// Display adjacency.
    pub connected_nodes: Vec<String>,
    /// Visibility for this reader.
    pub state: NodeState,
    /// Whether the reader may select the node.
    pub clickable: bool,
}

/// A reader's view of the whole story map.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMapView {
    /// The reader.
    pub user_id: String,
    /// The node being read.
    pub current_node: String,
    /// Every node with its state, in authored order.
    pub nodes: Vec<MapNodeView>,
    /// Number of visited nodes.
    pub visited_count: usize,
    /// Number of nodes in the story.
    pub total_count: usize,
    /// `visited_count / total_count` as a rounded percentage.
    pub progress_percentage: u64,
    /// The last few visited nodes, oldest first.
    pub recent_path: Vec<String>,
}

/// Retrieves every story node.
///
/// # Errors
///
/// Returns `DomainError` if storage fails.
pub async fn get_story_nodes(storage: &dyn Storage) -> Result<Vec<StoryNode>, DomainError> {
    storage.get_all_story_nodes().await
}

/// Retrieves one story node.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no node has this id.
pub async fn get_story_node(id: &str, storage: &dyn Storage) -> Result<StoryNode, DomainError> {
    storage
        .get_story_node(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("story node {id}")))
}

/// Retrieves a reader's progress, creating the default on first access.
///
/// # Errors
///
/// Returns `DomainError` if storage fails.
pub async fn get_progress(
    user_id: &str,
    clock: &dyn Clock,
    storage: &dyn Storage,
    locks: &ProgressLocks,
) -> Result<UserProgress, DomainError> {
    let _guard = locks.lock(user_id).await;
    command_handlers::load_or_create(user_id, clock, storage).await
}

/// Builds the reader's story map: every node's state plus completion
/// figures.
///
/// # Errors
///
/// Returns `DomainError` if storage fails.
pub async fn get_story_map(
    user_id: &str,
    graph: &StoryGraph,
    clock: &dyn Clock,
    storage: &dyn Storage,
    locks: &ProgressLocks,
) -> Result<StoryMapView, DomainError> {
    let progress = get_progress(user_id, clock, storage, locks).await?;
    Ok(build_story_map(graph, &progress))
}

fn build_story_map(graph: &StoryGraph, progress: &UserProgress) -> StoryMapView {
    let nodes = classify_all(graph, progress)
        .into_iter()
        .zip(graph.nodes())
        .map(|((_, state), node)| MapNodeView {
            id: node.id.clone(),
            title: node.title.clone(),
            position: node.position,
            connected_nodes: node.connected_nodes.clone(),
            state,
            clickable: state.is_clickable(),
        })
        .collect();

    let visited_count = progress.visited_nodes.len();
    let total_count = graph.len();
    let skip = visited_count.saturating_sub(RECENT_PATH_LEN);

    StoryMapView {
        user_id: progress.user_id.clone(),
        current_node: progress.current_node.clone(),
        nodes,
        visited_count,
        total_count,
        progress_percentage: percentage(visited_count, total_count),
        recent_path: progress.visited_nodes[skip..].to_vec(),
    }
}

/// Rounds half up, like the map's completion badge.
fn percentage(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (part as u64, whole as u64);
    (part * 100 + whole / 2) / whole
}
