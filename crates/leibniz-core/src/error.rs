//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A story node, progress record, or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The node a choice was made from is unknown or offers no choices.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// The choice is not part of the node's choice list.
    #[error("invalid choice {choice_id} for node {node_id}")]
    InvalidChoice {
        /// The node the choice was made from.
        node_id: String,
        /// The rejected choice identifier.
        choice_id: String,
    },

    /// Malformed content or input that fails structural checks.
    #[error("validation error: {0}")]
    Validation(String),

    /// A storage/persistence failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
