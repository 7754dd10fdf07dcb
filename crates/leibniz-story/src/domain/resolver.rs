//! Choice resolution: the transition function of the story state machine.
//!
//! States are node ids; transitions are keyed by choice id and defined
//! entirely by the authored graph. A node without choices is terminal.

use chrono::{DateTime, Utc};
use leibniz_core::error::DomainError;
use leibniz_core::model::{ChoiceRecord, UserProgress};
use tracing::warn;

use super::graph::StoryGraph;

/// Applies a reader's choice and returns the resulting progress.
///
/// The choice is always appended to the history. The reader moves only when
/// the choice names a `nextNode` that exists; a target missing from the graph
/// leaves the reader where they are.
///
/// # Errors
///
/// Returns `DomainError::InvalidNode` if `node_id` is unknown or offers no
/// choices, and `DomainError::InvalidChoice` if the node has no choice with
/// `choice_id`.
pub fn resolve_choice(
    graph: &StoryGraph,
    progress: &UserProgress,
    node_id: &str,
    choice_id: &str,
    now: DateTime<Utc>,
) -> Result<UserProgress, DomainError> {
    let node = graph
        .get(node_id)
        .filter(|n| !n.is_terminal())
        .ok_or_else(|| DomainError::InvalidNode(node_id.to_owned()))?;

    let choice = node
        .choice(choice_id)
        .ok_or_else(|| DomainError::InvalidChoice {
            node_id: node_id.to_owned(),
            choice_id: choice_id.to_owned(),
        })?;

    let mut next = progress.clone();
    next.choices.push(ChoiceRecord {
        node_id: node_id.to_owned(),
        choice_id: choice_id.to_owned(),
        timestamp: now,
    });

    if let Some(target) = &choice.next_node {
        if graph.contains(target) {
            next.current_node.clone_from(target);
            next.visit(target);
        } else {
            warn!(
                user_id = %progress.user_id,
                node_id,
                choice_id,
                target = %target,
                "choice leads to missing node; reader stays put"
            );
        }
    }

    next.updated_at = now;
    Ok(next)
}
