//! Authored story content.
//!
//! The shipped story is embedded at build time; an alternative YAML document
//! can be loaded from disk.

use std::path::Path;

use leibniz_core::error::DomainError;
use leibniz_core::model::StoryNode;

const GENESIS_YAML: &str = include_str!("../content/genesis.yaml");

/// Parses a YAML list of story nodes.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the document is not a list of nodes.
pub fn parse_story_yaml(source: &str) -> Result<Vec<StoryNode>, DomainError> {
    serde_yaml::from_str(source)
        .map_err(|e| DomainError::Validation(format!("story content parse failed: {e}")))
}

/// The shipped story, "The Genesis Protocol".
///
/// # Errors
///
/// Returns `DomainError::Validation` if the embedded document is malformed.
pub fn genesis_nodes() -> Result<Vec<StoryNode>, DomainError> {
    parse_story_yaml(GENESIS_YAML)
}

/// Reads and parses a story file.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the file cannot be read and
/// `DomainError::Validation` if it cannot be parsed.
pub async fn load_story_file(path: &Path) -> Result<Vec<StoryNode>, DomainError> {
    let source = tokio::fs::read_to_string(path).await.map_err(|e| {
        DomainError::Infrastructure(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_story_yaml(&source)
}
