//! Node availability: how each node should appear on the reader's map.

use std::collections::HashSet;

use leibniz_core::model::{ORIGIN_NODE_ID, UserProgress};
use serde::Serialize;

use super::graph::StoryGraph;

/// Visibility of a node for one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// The node being read.
    Current,
    /// Reached before.
    Visited,
    /// Not reached yet, but adjacent to something that was.
    Available,
    /// Out of reach.
    Locked,
}

impl NodeState {
    /// Whether the reader may select the node on the map.
    #[must_use]
    pub fn is_clickable(self) -> bool {
        !matches!(self, Self::Locked)
    }
}

/// Classifies one node. First match wins: current, visited, available,
/// locked. Unknown ids are locked.
#[must_use]
pub fn classify(
    graph: &StoryGraph,
    visited_nodes: &[String],
    current_node_id: &str,
    node_id: &str,
) -> NodeState {
    state_of(
        graph,
        |id| visited_nodes.iter().any(|visited| visited == id),
        current_node_id,
        node_id,
    )
}

/// Classifies every node of the graph, in authored order.
#[must_use]
pub fn classify_all<'g>(graph: &'g StoryGraph, progress: &UserProgress) -> Vec<(&'g str, NodeState)> {
    let visited: HashSet<&str> = progress.visited_nodes.iter().map(String::as_str).collect();
    graph
        .nodes()
        .iter()
        .map(|node| {
            let state = state_of(
                graph,
                |id| visited.contains(id),
                &progress.current_node,
                &node.id,
            );
            (node.id.as_str(), state)
        })
        .collect()
}

fn state_of(
    graph: &StoryGraph,
    is_visited: impl Fn(&str) -> bool,
    current_node_id: &str,
    node_id: &str,
) -> NodeState {
    if node_id == current_node_id {
        return NodeState::Current;
    }
    if is_visited(node_id) {
        return NodeState::Visited;
    }
    if !graph.contains(node_id) {
        return NodeState::Locked;
    }
    if node_id == ORIGIN_NODE_ID || graph.unlocked_by(node_id).any(|n| is_visited(&n.id)) {
        return NodeState::Available;
    }
    NodeState::Locked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{AvailabilitySource, DanglingPolicy};
    use leibniz_test_support::{choice, fixed_now, story_node};

    fn graph() -> StoryGraph {
        StoryGraph::build(
            vec![
                story_node(
                    "origin",
                    &["discovery", "alternative-path"],
                    vec![choice("investigate", "discovery"), choice("report", "evacuation")],
                ),
                story_node("discovery", &["revelation"], vec![]),
                story_node("alternative-path", &[], vec![]),
                story_node("revelation", &[], vec![]),
                story_node("evacuation", &["origin"], vec![]),
            ],
            DanglingPolicy::Reject,
        )
        .unwrap()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_current_takes_priority_over_visited() {
        let graph = graph();
        let visited = ids(&["origin", "discovery"]);

        assert_eq!(
            classify(&graph, &visited, "discovery", "discovery"),
            NodeState::Current
        );
        assert_eq!(
            classify(&graph, &visited, "discovery", "origin"),
            NodeState::Visited
        );
    }

    #[test]
    fn test_origin_is_available_with_nothing_visited() {
        let graph = graph();

        assert_eq!(
            classify(&graph, &[], "discovery", "origin"),
            NodeState::Available
        );
    }

    #[test]
    fn test_connection_of_visited_node_is_available() {
        let graph = graph();
        let visited = ids(&["origin"]);

        assert_eq!(
            classify(&graph, &visited, "origin", "alternative-path"),
            NodeState::Available
        );
        assert_eq!(
            classify(&graph, &visited, "origin", "revelation"),
            NodeState::Locked
        );
        // Reachable by choice only, not listed in origin's connections.
        assert_eq!(
            classify(&graph, &visited, "origin", "evacuation"),
            NodeState::Locked
        );
    }

    #[test]
    fn test_choice_target_source_ignores_connections() {
        let graph = graph().with_availability_source(AvailabilitySource::ChoiceTargets);
        let visited = ids(&["origin"]);

        assert_eq!(
            classify(&graph, &visited, "origin", "evacuation"),
            NodeState::Available
        );
        assert_eq!(
            classify(&graph, &visited, "origin", "alternative-path"),
            NodeState::Locked
        );
    }

    #[test]
    fn test_unknown_node_is_locked() {
        let graph = graph();
        let visited = ids(&["origin"]);

        assert_eq!(
            classify(&graph, &visited, "origin", "salvation"),
            NodeState::Locked
        );
    }

    #[test]
    fn test_clickable_states() {
        assert!(NodeState::Current.is_clickable());
        assert!(NodeState::Visited.is_clickable());
        assert!(NodeState::Available.is_clickable());
        assert!(!NodeState::Locked.is_clickable());
    }

    #[test]
    fn test_classify_all_agrees_with_classify() {
        // Arrange
        let graph = graph();
        let mut progress = UserProgress::new("reader-1", fixed_now());
        progress.visit("discovery");
        progress.current_node = "discovery".to_owned();

        // Act
        let states = classify_all(&graph, &progress);

        // Assert
        assert_eq!(states.len(), graph.len());
        for (id, state) in states {
            assert_eq!(
                state,
                classify(&graph, &progress.visited_nodes, &progress.current_node, id),
                "state mismatch for {id}"
            );
        }
    }

    #[test]
    fn test_classify_all_uses_choice_targets_when_configured() {
        // Arrange
        let graph = graph().with_availability_source(AvailabilitySource::ChoiceTargets);
        let progress = UserProgress::new("reader-1", fixed_now());

        // Act
        let states: Vec<NodeState> = classify_all(&graph, &progress)
            .into_iter()
            .map(|(_, state)| state)
            .collect();

        // Assert
        assert_eq!(
            states,
            vec![
                NodeState::Current,
                NodeState::Available,
                NodeState::Locked,
                NodeState::Locked,
                NodeState::Available,
            ]
        );
    }
}
