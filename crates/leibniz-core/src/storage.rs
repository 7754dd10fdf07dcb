//! Storage abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::model::{NewUser, ProgressPatch, StoryNode, User, UserProgress};

/// A change to one reader's progress, run against the stored record.
pub type ProgressUpdate<'a> =
    Box<dyn FnOnce(UserProgress) -> Result<UserProgress, DomainError> + Send + 'a>;

/// Capability interface over users, story nodes, and reader progress.
///
/// Implementations are constructed explicitly and injected into request
/// handlers; there is no process-wide instance.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load a user by identifier.
    async fn get_user(&self, id: i64) -> Result<Option<User>, DomainError>;

    /// Load a user by login name.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Create a user and assign the next identifier.
    async fn create_user(&self, user: NewUser) -> Result<User, DomainError>;

    /// Load one story node.
    async fn get_story_node(&self, id: &str) -> Result<Option<StoryNode>, DomainError>;

    /// Load every story node, in authored order.
    async fn get_all_story_nodes(&self) -> Result<Vec<StoryNode>, DomainError>;

    /// Insert a story node, replacing one with the same identifier.
    async fn create_story_node(&self, node: StoryNode) -> Result<StoryNode, DomainError>;

    /// Replace every stored story node with `nodes`, kept in the given order.
    async fn replace_story_nodes(&self, nodes: Vec<StoryNode>) -> Result<(), DomainError>;

    /// Load a reader's progress.
    async fn get_user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, DomainError>;

    /// Shallow-merge `patch` into existing progress and refresh `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no progress exists for `user_id`.
    async fn update_user_progress(
        &self,
        user_id: &str,
        patch: ProgressPatch,
    ) -> Result<UserProgress, DomainError>;

    /// Run `update` on the stored progress and persist what it returns. No
    /// other writer can change the record between the read and the write.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no progress exists for `user_id`,
    /// or the error `update` returns, in which case nothing is written.
    async fn modify_user_progress<'a>(
        &self,
        user_id: &str,
        update: ProgressUpdate<'a>,
    ) -> Result<UserProgress, DomainError>;

    /// Store a new progress record. If one already exists for the user, the
    /// existing record is returned unchanged.
    async fn create_user_progress(&self, progress: UserProgress)
    -> Result<UserProgress, DomainError>;
}
