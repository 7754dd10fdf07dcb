//! Shared application state.

use std::sync::Arc;

use leibniz_core::clock::Clock;
use leibniz_core::storage::Storage;
use leibniz_story::application::locks::ProgressLocks;
use leibniz_story::domain::graph::StoryGraph;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The validated, read-only story graph.
    pub graph: Arc<StoryGraph>,
    /// Users, story nodes, and progress.
    pub storage: Arc<dyn Storage>,
    /// Time source for progress timestamps.
    pub clock: Arc<dyn Clock>,
    /// Per-reader locks around progress updates.
    pub locks: ProgressLocks,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(graph: Arc<StoryGraph>, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            graph,
            storage,
            clock,
            locks: ProgressLocks::new(),
        }
    }
}
