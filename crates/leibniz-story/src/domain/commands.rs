//! Commands that change a reader's progress.

use leibniz_core::command::Command;
use leibniz_core::model::ProgressPatch;
use uuid::Uuid;

/// Command to take a choice from a node.
#[derive(Debug, Clone)]
pub struct MakeChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The reader making the choice.
    pub user_id: String,
    /// The node the choice is offered on.
    pub node_id: String,
    /// The choice taken.
    pub choice_id: String,
}

impl Command for MakeChoice {
    fn command_type(&self) -> &'static str {
        "story.make_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to merge a partial progress record (save/load, audio toggle).
#[derive(Debug, Clone)]
pub struct UpdateProgress {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The reader whose progress changes.
    pub user_id: String,
    /// Fields to overwrite.
    pub patch: ProgressPatch,
}

impl Command for UpdateProgress {
    fn command_type(&self) -> &'static str {
        "story.update_progress"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to return to a node the reader has already visited.
#[derive(Debug, Clone)]
pub struct RevisitNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The reader moving.
    pub user_id: String,
    /// The node to return to.
    pub node_id: String,
}

impl Command for RevisitNode {
    fn command_type(&self) -> &'static str {
        "story.revisit_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
