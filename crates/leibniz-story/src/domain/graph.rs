//! The story graph: an immutable, validated index over authored nodes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use leibniz_core::error::DomainError;
use leibniz_core::model::StoryNode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Which authored edge set decides whether an unvisited node is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilitySource {
    /// A node is available when a visited node lists it in `connectedNodes`.
    #[default]
    Connections,
    /// A node is available when a visited node has a choice leading to it.
    ChoiceTargets,
}

/// What to do with references to nodes that do not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DanglingPolicy {
    /// Log each dangling reference and keep the authored data.
    #[default]
    Warn,
    /// Refuse to build the graph.
    Reject,
}

/// The field a dangling reference was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReferenceKind {
    /// An entry of `connectedNodes`.
    Connection,
    /// The `nextNode` of a choice.
    ChoiceTarget {
        /// The choice holding the reference.
        choice_id: String,
    },
    /// An entry of a choice's `unlocks`.
    Unlock {
        /// The choice holding the reference.
        choice_id: String,
    },
}

/// A reference from one node to an id that no node carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    /// Node holding the reference.
    pub node_id: String,
    /// Where in the node the reference sits.
    pub kind: ReferenceKind,
    /// The id that does not resolve.
    pub target: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ReferenceKind::Connection => {
                write!(f, "{} connects to missing node {}", self.node_id, self.target)
            }
            ReferenceKind::ChoiceTarget { choice_id } => write!(
                f,
                "{}/{} leads to missing node {}",
                self.node_id, choice_id, self.target
            ),
            ReferenceKind::Unlock { choice_id } => write!(
                f,
                "{}/{} unlocks missing node {}",
                self.node_id, choice_id, self.target
            ),
        }
    }
}

/// Read-only story graph shared by every request.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    nodes: Vec<StoryNode>,
    index: HashMap<String, usize>,
    /// target id -> nodes listing it in `connectedNodes`.
    connected_from: HashMap<String, Vec<usize>>,
    /// target id -> nodes with a choice leading to it.
    chosen_from: HashMap<String, Vec<usize>>,
    availability: AvailabilitySource,
    dangling: Vec<DanglingReference>,
    version_hash: String,
}

impl StoryGraph {
    /// Validates the authored nodes and builds the lookup indexes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if two nodes share an id, if a node
    /// repeats a choice id, or if `policy` is `Reject` and any reference is
    /// dangling.
    pub fn build(nodes: Vec<StoryNode>, policy: DanglingPolicy) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate story node id: {}",
                    node.id
                )));
            }
            let mut choice_ids = HashSet::new();
            for choice in &node.choices {
                if !choice_ids.insert(choice.id.as_str()) {
                    return Err(DomainError::Validation(format!(
                        "duplicate choice id {} in node {}",
                        choice.id, node.id
                    )));
                }
            }
        }

        let dangling = find_dangling(&nodes, &index);
        if !dangling.is_empty() {
            match policy {
                DanglingPolicy::Reject => {
                    let listed: Vec<String> = dangling.iter().map(ToString::to_string).collect();
                    return Err(DomainError::Validation(format!(
                        "story graph has {} dangling references: {}",
                        dangling.len(),
                        listed.join("; ")
                    )));
                }
                DanglingPolicy::Warn => {
                    for reference in &dangling {
                        warn!(node_id = %reference.node_id, target = %reference.target, "dangling story reference: {reference}");
                    }
                }
            }
        }

        let mut connected_from: HashMap<String, Vec<usize>> = HashMap::new();
        let mut chosen_from: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            for target in &node.connected_nodes {
                push_unique(connected_from.entry(target.clone()).or_default(), position);
            }
            for target in node.choices.iter().filter_map(|c| c.next_node.as_ref()) {
                push_unique(chosen_from.entry(target.clone()).or_default(), position);
            }
        }

        let version_hash = content_hash(&nodes)?;

        Ok(Self {
            nodes,
            index,
            connected_from,
            chosen_from,
            availability: AvailabilitySource::default(),
            dangling,
            version_hash,
        })
    }

    /// Selects the edge set used for availability.
    #[must_use]
    pub fn with_availability_source(mut self, source: AvailabilitySource) -> Self {
        self.availability = source;
        self
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StoryNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Returns true if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in authored order.
    #[must_use]
    pub fn nodes(&self) -> &[StoryNode] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The edge set availability is computed from.
    #[must_use]
    pub fn availability_source(&self) -> AvailabilitySource {
        self.availability
    }

    /// References that did not resolve when the graph was built.
    #[must_use]
    pub fn dangling_references(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Hex SHA-256 of the authored content.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// Nodes whose visit makes `target` available, under the configured
    /// availability source.
    pub fn unlocked_by(&self, target: &str) -> impl Iterator<Item = &StoryNode> {
        let reverse = match self.availability {
            AvailabilitySource::Connections => &self.connected_from,
            AvailabilitySource::ChoiceTargets => &self.chosen_from,
        };
        reverse
            .get(target)
            .into_iter()
            .flatten()
            .map(|&i| &self.nodes[i])
    }
}

fn push_unique(list: &mut Vec<usize>, position: usize) {
    if list.last() != Some(&position) {
        list.push(position);
    }
}

fn find_dangling(nodes: &[StoryNode], index: &HashMap<String, usize>) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();
    for node in nodes {
        for target in &node.connected_nodes {
            if !index.contains_key(target) {
                dangling.push(DanglingReference {
                    node_id: node.id.clone(),
                    kind: ReferenceKind::Connection,
                    target: target.clone(),
                });
            }
        }
        for choice in &node.choices {
            if let Some(target) = &choice.next_node {
                if !index.contains_key(target) {
                    dangling.push(DanglingReference {
                        node_id: node.id.clone(),
                        kind: ReferenceKind::ChoiceTarget {
                            choice_id: choice.id.clone(),
                        },
                        target: target.clone(),
                    });
                }
            }
            for target in &choice.unlocks {
                if !index.contains_key(target) {
                    dangling.push(DanglingReference {
                        node_id: node.id.clone(),
                        kind: ReferenceKind::Unlock {
                            choice_id: choice.id.clone(),
                        },
                        target: target.clone(),
                    });
                }
            }
        }
    }
    dangling
}

fn content_hash(nodes: &[StoryNode]) -> Result<String, DomainError> {
    let canonical = serde_json::to_vec(nodes)
        .map_err(|e| DomainError::Validation(format!("story content is not serializable: {e}")))?;
    let digest = Sha256::digest(&canonical);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leibniz_test_support::{choice, flavor_choice, story_node};

    fn three_nodes() -> Vec<StoryNode> {
        vec![
            story_node(
                "origin",
                &["discovery"],
                vec![choice("investigate", "discovery"), choice("report", "authority")],
            ),
            story_node("discovery", &["origin"], vec![flavor_choice("wait")]),
            story_node("authority", &[], vec![]),
        ]
    }

    #[test]
    fn test_build_indexes_nodes_by_id() {
        // Arrange & Act
        let graph = StoryGraph::build(three_nodes(), DanglingPolicy::Reject).unwrap();

        // Assert
        assert_eq!(graph.len(), 3);
        assert!(graph.contains("discovery"));
        assert_eq!(graph.get("authority").unwrap().id, "authority");
        assert!(graph.get("missing").is_none());
        assert!(graph.dangling_references().is_empty());
    }

    #[test]
    fn test_build_rejects_duplicate_node_ids() {
        let mut nodes = three_nodes();
        nodes.push(story_node("discovery", &[], vec![]));

        let result = StoryGraph::build(nodes, DanglingPolicy::Warn);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("discovery")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_duplicate_choice_ids_within_node() {
        let nodes = vec![story_node(
            "origin",
            &[],
            vec![flavor_choice("look"), flavor_choice("look")],
        )];

        let result = StoryGraph::build(nodes, DanglingPolicy::Warn);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_warn_policy_keeps_dangling_references() {
        // Arrange
        let mut nodes = three_nodes();
        nodes[1].choices.push(choice("enter", "paradox"));
        nodes[2].connected_nodes.push("salvation".to_owned());

        // Act
        let graph = StoryGraph::build(nodes, DanglingPolicy::Warn).unwrap();

        // Assert
        let dangling = graph.dangling_references();
        assert_eq!(dangling.len(), 2);
        assert_eq!(dangling[0].node_id, "discovery");
        assert_eq!(
            dangling[0].kind,
            ReferenceKind::ChoiceTarget {
                choice_id: "enter".to_owned()
            }
        );
        assert_eq!(dangling[1].target, "salvation");
        // Authored data is left intact.
        let discovery = graph.get("discovery").unwrap();
        assert_eq!(
            discovery.choice("enter").unwrap().next_node.as_deref(),
            Some("paradox")
        );
    }

    #[test]
    fn test_reject_policy_fails_on_dangling_unlock() {
        let mut nodes = three_nodes();
        nodes[0].choices[0].unlocks.push("nowhere".to_owned());

        let result = StoryGraph::build(nodes, DanglingPolicy::Reject);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("unlocks missing node nowhere")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_unlocked_by_follows_configured_source() {
        let graph = StoryGraph::build(three_nodes(), DanglingPolicy::Reject).unwrap();

        let by_connection: Vec<&str> = graph
            .unlocked_by("authority")
            .map(|n| n.id.as_str())
            .collect();
        assert!(by_connection.is_empty());

        let graph = graph.with_availability_source(AvailabilitySource::ChoiceTargets);
        let by_choice: Vec<&str> = graph
            .unlocked_by("authority")
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(by_choice, vec!["origin"]);
    }

    #[test]
    fn test_version_hash_tracks_content() {
        let first = StoryGraph::build(three_nodes(), DanglingPolicy::Warn).unwrap();
        let same = StoryGraph::build(three_nodes(), DanglingPolicy::Warn).unwrap();
        let mut edited_nodes = three_nodes();
        edited_nodes[2].title = "Edited".to_owned();
        let edited = StoryGraph::build(edited_nodes, DanglingPolicy::Warn).unwrap();

        assert_eq!(first.version_hash().len(), 64);
        assert_eq!(first.version_hash(), same.version_hash());
        assert_ne!(first.version_hash(), edited.version_hash());
    }
}
