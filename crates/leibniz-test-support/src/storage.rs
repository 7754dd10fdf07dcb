//! Test storage backends: one that fails every call, one that yields before
//! reads.

use async_trait::async_trait;
use leibniz_core::error::DomainError;
use leibniz_core::model::{NewUser, ProgressPatch, StoryNode, User, UserProgress};
use leibniz_core::storage::{ProgressUpdate, Storage};

/// A storage backend that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingStorage;

fn refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl Storage for FailingStorage {
    async fn get_user(&self, _id: i64) -> Result<Option<User>, DomainError> {
        Err(refused())
    }

    async fn get_user_by_username(&self, _username: &str) -> Result<Option<User>, DomainError> {
        Err(refused())
    }

    async fn create_user(&self, _user: NewUser) -> Result<User, DomainError> {
        Err(refused())
    }

    async fn get_story_node(&self, _id: &str) -> Result<Option<StoryNode>, DomainError> {
        Err(refused())
    }

    async fn get_all_story_nodes(&self) -> Result<Vec<StoryNode>, DomainError> {
        Err(refused())
    }

    async fn create_story_node(&self, _node: StoryNode) -> Result<StoryNode, DomainError> {
        Err(refused())
    }

    async fn replace_story_nodes(&self, _nodes: Vec<StoryNode>) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn get_user_progress(&self, _user_id: &str) -> Result<Option<UserProgress>, DomainError> {
        Err(refused())
    }

    async fn update_user_progress(
        &self,
        _user_id: &str,
        _patch: ProgressPatch,
    ) -> Result<UserProgress, DomainError> {
        Err(refused())
    }

    async fn modify_user_progress<'a>(
        &self,
        _user_id: &str,
        _update: ProgressUpdate<'a>,
    ) -> Result<UserProgress, DomainError> {
        Err(refused())
    }

    async fn create_user_progress(
        &self,
        _progress: UserProgress,
    ) -> Result<UserProgress, DomainError> {
        Err(refused())
    }
}

/// Wraps another backend and yields to the scheduler before every read, so
/// concurrent handlers interleave the way they do against a remote database.
#[derive(Debug)]
pub struct YieldingStorage<S> {
    inner: S,
}

impl<S> YieldingStorage<S> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: Storage> Storage for YieldingStorage<S> {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DomainError> {
        tokio::task::yield_now().await;
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        tokio::task::yield_now().await;
        self.inner.get_user_by_username(username).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        self.inner.create_user(user).await
    }

    async fn get_story_node(&self, id: &str) -> Result<Option<StoryNode>, DomainError> {
        tokio::task::yield_now().await;
        self.inner.get_story_node(id).await
    }

    async fn get_all_story_nodes(&self) -> Result<Vec<StoryNode>, DomainError> {
        tokio::task::yield_now().await;
        self.inner.get_all_story_nodes().await
    }

    async fn create_story_node(&self, node: StoryNode) -> Result<StoryNode, DomainError> {
        self.inner.create_story_node(node).await
    }

    async fn replace_story_nodes(&self, nodes: Vec<StoryNode>) -> Result<(), DomainError> {
        self.inner.replace_story_nodes(nodes).await
    }

    async fn get_user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, DomainError> {
        tokio::task::yield_now().await;
        self.inner.get_user_progress(user_id).await
    }

    async fn update_user_progress(
        &self,
        user_id: &str,
        patch: ProgressPatch,
    ) -> Result<UserProgress, DomainError> {
        self.inner.update_user_progress(user_id, patch).await
    }

    async fn modify_user_progress<'a>(
        &self,
        user_id: &str,
        update: ProgressUpdate<'a>,
    ) -> Result<UserProgress, DomainError> {
        self.inner.modify_user_progress(user_id, update).await
    }

    async fn create_user_progress(
        &self,
        progress: UserProgress,
    ) -> Result<UserProgress, DomainError> {
        self.inner.create_user_progress(progress).await
    }
}
