//! Command handlers for reader progress.
//!
//! Each handler takes the reader's lock, loads (or creates) their progress,
//! applies domain logic, and persists the result through `Storage`.

use leibniz_core::clock::Clock;
use leibniz_core::command::Command;
use leibniz_core::error::DomainError;
use leibniz_core::model::UserProgress;
use leibniz_core::storage::Storage;
use tracing::{debug, info, warn};

use crate::application::locks::ProgressLocks;
use crate::domain::commands::{MakeChoice, RevisitNode, UpdateProgress};
use crate::domain::graph::StoryGraph;
use crate::domain::resolver;

/// Loads a reader's progress, creating the default record on first access.
///
/// Callers must hold the reader's lock.
///
/// # Errors
///
/// Returns `DomainError` if loading or creating fails.
pub(crate) async fn load_or_create(
    user_id: &str,
    clock: &dyn Clock,
    storage: &dyn Storage,
) -> Result<UserProgress, DomainError> {
    if let Some(progress) = storage.get_user_progress(user_id).await? {
        return Ok(progress);
    }
    let created = storage
        .create_user_progress(UserProgress::new(user_id, clock.now()))
        .await?;
    info!(user_id, "created default progress");
    Ok(created)
}

/// Replaces the stored story nodes with the graph's, in authored order, so
/// the content endpoints serve the same story the resolver walks.
///
/// # Errors
///
/// Returns `DomainError` if storage fails.
pub async fn publish_story(graph: &StoryGraph, storage: &dyn Storage) -> Result<usize, DomainError> {
    storage.replace_story_nodes(graph.nodes().to_vec()).await?;
    info!(
        nodes = graph.len(),
        version = graph.version_hash(),
        "story published"
    );
    Ok(graph.len())
}

/// Handles the `MakeChoice` command: resolves the choice against the graph
/// and persists the new position and history.
///
/// Resolution runs inside `Storage::modify_user_progress`, so a choice made
/// by another process between the read and the write is never overwritten.
///
/// # Errors
///
/// Returns `DomainError::InvalidNode` or `DomainError::InvalidChoice` for a
/// choice the graph does not offer, or any storage error.
pub async fn handle_make_choice(
    command: &MakeChoice,
    graph: &StoryGraph,
    clock: &dyn Clock,
    storage: &dyn Storage,
    locks: &ProgressLocks,
) -> Result<UserProgress, DomainError> {
    let _guard = locks.lock(&command.user_id).await;
    load_or_create(&command.user_id, clock, storage).await?;

    let now = clock.now();
    let progress = storage
        .modify_user_progress(
            &command.user_id,
            Box::new(move |progress: UserProgress| {
                resolver::resolve_choice(
                    graph,
                    &progress,
                    &command.node_id,
                    &command.choice_id,
                    now,
                )
            }),
        )
        .await?;

    debug!(
        correlation_id = %command.correlation_id(),
        to = %progress.current_node,
        "{} resolved",
        command.command_type()
    );
    Ok(progress)
}

/// Handles the `UpdateProgress` command: merges the patch into the reader's
/// progress, creating default progress first if there is none.
///
/// The patch is applied verbatim. Node ids it names that the graph does not
/// know are logged, not rejected.
///
/// # Errors
///
/// Returns `DomainError` if storage fails.
pub async fn handle_update_progress(
    command: &UpdateProgress,
    graph: &StoryGraph,
    clock: &dyn Clock,
    storage: &dyn Storage,
    locks: &ProgressLocks,
) -> Result<UserProgress, DomainError> {
    let _guard = locks.lock(&command.user_id).await;

    for unknown in command
        .patch
        .referenced_nodes()
        .filter(|id| !graph.contains(id))
    {
        warn!(
            correlation_id = %command.correlation_id(),
            user_id = %command.user_id,
            node_id = unknown,
            "restored progress names a node missing from the story graph"
        );
    }

    match storage
        .update_user_progress(&command.user_id, command.patch.clone())
        .await
    {
        Err(DomainError::NotFound(_)) => {
            // Another process may create the record first; the patch is
            // merged into whichever record wins.
            load_or_create(&command.user_id, clock, storage).await?;
            storage
                .update_user_progress(&command.user_id, command.patch.clone())
                .await
        }
        other => other,
    }
}

/// Handles the `RevisitNode` command: moves the reader back to a node they
/// have already reached. History is not touched.
///
/// # Errors
///
/// Returns `DomainError::InvalidNode` if the node is unknown or has not been
/// visited, or any storage error.
pub async fn handle_revisit_node(
    command: &RevisitNode,
    graph: &StoryGraph,
    clock: &dyn Clock,
    storage: &dyn Storage,
    locks: &ProgressLocks,
) -> Result<UserProgress, DomainError> {
    let _guard = locks.lock(&command.user_id).await;
    load_or_create(&command.user_id, clock, storage).await?;

    let now = clock.now();
    storage
        .modify_user_progress(
            &command.user_id,
            Box::new(move |mut progress: UserProgress| {
                if !graph.contains(&command.node_id) || !progress.has_visited(&command.node_id) {
                    return Err(DomainError::InvalidNode(command.node_id.clone()));
                }
                progress.current_node.clone_from(&command.node_id);
                progress.updated_at = now;
                Ok(progress)
            }),
        )
        .await
}
