//! Builders for small hand-made story graphs.

use leibniz_core::model::{Choice, Position, StoryNode};

/// A node with the given adjacency and choices and placeholder display text.
#[must_use]
pub fn story_node(id: &str, connected: &[&str], choices: Vec<Choice>) -> StoryNode {
    StoryNode {
        id: id.to_owned(),
        title: format!("Title of {id}"),
        content: format!("Content of {id}"),
        location: "Test Laboratory".to_owned(),
        read_time: "1 min read".to_owned(),
        position: Position::default(),
        connected_nodes: connected.iter().map(|s| (*s).to_owned()).collect(),
        choices,
    }
}

/// A choice that leads to `next`.
#[must_use]
pub fn choice(id: &str, next: &str) -> Choice {
    Choice {
        next_node: Some(next.to_owned()),
        ..flavor_choice(id)
    }
}

/// A choice with no navigational effect.
#[must_use]
pub fn flavor_choice(id: &str) -> Choice {
    Choice {
        id: id.to_owned(),
        text: format!("Choose {id}"),
        description: String::new(),
        icon: "fas fa-circle".to_owned(),
        next_node: None,
        unlocks: Vec::new(),
    }
}
