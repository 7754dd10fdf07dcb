//! Story and progress records shared across the workspace.
//!
//! These are the wire shapes of the REST boundary as well as the values the
//! storage layer persists, so every type serializes in camelCase.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the node every reader starts from.
pub const ORIGIN_NODE_ID: &str = "origin";

/// Map coordinates of a node. Only the presentation layer reads these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

/// An option offered to the reader while a node is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Identifier, unique within the owning node's choice list.
    pub id: String,
    /// Short label.
    pub text: String,
    /// Longer explanation shown under the label.
    pub description: String,
    /// Icon class name.
    pub icon: String,
    /// Node this choice leads to. `None` marks a flavor choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,
    /// Nodes the authored content marks as unlocked by this choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlocks: Vec<String>,
}

/// A narrative unit of the story graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryNode {
    /// Unique node identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Where the scene takes place.
    pub location: String,
    /// Estimated reading time label.
    pub read_time: String,
    /// Map coordinates, serialized flat as `x` and `y`.
    #[serde(flatten)]
    pub position: Position,
    /// Undirected display adjacency, in authored order.
    #[serde(default)]
    pub connected_nodes: Vec<String>,
    /// Choices available while this node is current.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl StoryNode {
    /// Looks up a choice by identifier.
    #[must_use]
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    /// A node with no choices ends the story branch.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }
}

/// One entry of a reader's choice history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    /// Node the choice was made from.
    pub node_id: String,
    /// The choice taken.
    pub choice_id: String,
    /// When the choice was made.
    pub timestamp: DateTime<Utc>,
}

/// Per-user traversal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// External user identifier.
    pub user_id: String,
    /// Nodes reached so far, in visit order, without duplicates.
    pub visited_nodes: Vec<String>,
    /// The node being read.
    pub current_node: String,
    /// Every choice ever made, oldest first.
    pub choices: Vec<ChoiceRecord>,
    /// Audio preference.
    pub is_audio_enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// Default progress for a reader who has just arrived: standing on the
    /// origin node, which counts as visited.
    #[must_use]
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            visited_nodes: vec![ORIGIN_NODE_ID.to_owned()],
            current_node: ORIGIN_NODE_ID.to_owned(),
            choices: Vec::new(),
            is_audio_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the node has been reached.
    #[must_use]
    pub fn has_visited(&self, node_id: &str) -> bool {
        self.visited_nodes.iter().any(|id| id == node_id)
    }

    /// Marks a node visited. Returns false if it already was.
    pub fn visit(&mut self, node_id: &str) -> bool {
        if self.has_visited(node_id) {
            return false;
        }
        self.visited_nodes.push(node_id.to_owned());
        true
    }

    /// Shallow-merges a patch and refreshes `updated_at`.
    ///
    /// Patched fields overwrite wholesale; nothing is checked against the
    /// story graph. Duplicate ids in a patched visited list are collapsed to
    /// their first occurrence.
    pub fn apply_patch(&mut self, patch: ProgressPatch, now: DateTime<Utc>) {
        if let Some(visited) = patch.visited_nodes {
            self.visited_nodes = dedup_preserving_order(visited);
        }
        if let Some(current) = patch.current_node {
            self.current_node = current;
        }
        if let Some(choices) = patch.choices {
            self.choices = choices;
        }
        if let Some(audio) = patch.is_audio_enabled {
            self.is_audio_enabled = audio;
        }
        self.updated_at = now;
    }
}

/// Partial progress record used by save/load and preference toggles.
///
/// Server-owned fields (`userId`, timestamps) are not part of the patch and
/// are ignored if a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressPatch {
    /// Replacement visited list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visited_nodes: Option<Vec<String>>,
    /// Replacement current node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    /// Replacement choice history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceRecord>>,
    /// Replacement audio preference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_audio_enabled: Option<bool>,
}

impl ProgressPatch {
    /// Node ids this patch refers to, for checking against a graph.
    pub fn referenced_nodes(&self) -> impl Iterator<Item = &str> {
        self.current_node
            .iter()
            .map(String::as_str)
            .chain(self.visited_nodes.iter().flatten().map(String::as_str))
    }
}

/// Account record. Scaffolding: nothing authenticates against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sequential identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Stored credential.
    pub password: String,
}

/// Input for creating a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Stored credential.
    pub password: String,
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
