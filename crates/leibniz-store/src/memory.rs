//! In-memory `Storage` implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use leibniz_core::clock::Clock;
use leibniz_core::error::DomainError;
use leibniz_core::model::{NewUser, ProgressPatch, StoryNode, User, UserProgress};
use leibniz_core::storage::{ProgressUpdate, Storage};

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<i64, User>,
    next_id: i64,
}

/// Volatile storage backed by process memory. Contents are lost on restart.
pub struct MemStorage {
    clock: Arc<dyn Clock>,
    users: RwLock<Users>,
    /// Kept in insertion order so listings follow the authored order.
    story_nodes: RwLock<Vec<StoryNode>>,
    progress: RwLock<HashMap<String, UserProgress>>,
}

impl fmt::Debug for MemStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemStorage").finish_non_exhaustive()
    }
}

impl MemStorage {
    /// Creates an empty store. `clock` stamps progress updates.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            users: RwLock::new(Users {
                by_id: HashMap::new(),
                next_id: 1,
            }),
            story_nodes: RwLock::new(Vec::new()),
            progress: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned() -> DomainError {
    DomainError::Infrastructure("in-memory store lock poisoned".into())
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DomainError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.by_id.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users
            .by_id
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.by_id.values().any(|u| u.username == user.username) {
            return Err(DomainError::Validation(format!(
                "username already taken: {}",
                user.username
            )));
        }
        let created = User {
            id: users.next_id,
            username: user.username,
            password: user.password,
        };
        users.next_id += 1;
        users.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_story_node(&self, id: &str) -> Result<Option<StoryNode>, DomainError> {
        let nodes = self.story_nodes.read().map_err(|_| poisoned())?;
        Ok(nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn get_all_story_nodes(&self) -> Result<Vec<StoryNode>, DomainError> {
        let nodes = self.story_nodes.read().map_err(|_| poisoned())?;
        Ok(nodes.clone())
    }

    async fn create_story_node(&self, node: StoryNode) -> Result<StoryNode, DomainError> {
        let mut nodes = self.story_nodes.write().map_err(|_| poisoned())?;
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => existing.clone_from(&node),
            None => nodes.push(node.clone()),
        }
        Ok(node)
    }

    async fn replace_story_nodes(&self, new_nodes: Vec<StoryNode>) -> Result<(), DomainError> {
        let mut nodes = self.story_nodes.write().map_err(|_| poisoned())?;
        *nodes = new_nodes;
        Ok(())
    }

    async fn get_user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, DomainError> {
        let progress = self.progress.read().map_err(|_| poisoned())?;
        Ok(progress.get(user_id).cloned())
    }

    async fn update_user_progress(
        &self,
        user_id: &str,
        patch: ProgressPatch,
    ) -> Result<UserProgress, DomainError> {
        let now = self.clock.now();
        self.modify_user_progress(
            user_id,
            Box::new(move |mut progress: UserProgress| {
                progress.apply_patch(patch, now);
                Ok(progress)
            }),
        )
        .await
    }

    async fn modify_user_progress<'a>(
        &self,
        user_id: &str,
        update: ProgressUpdate<'a>,
    ) -> Result<UserProgress, DomainError> {
        let mut progress = self.progress.write().map_err(|_| poisoned())?;
        let existing = progress
            .get_mut(user_id)
            .ok_or_else(|| DomainError::NotFound(format!("progress for user {user_id}")))?;
        let next = update(existing.clone())?;
        existing.clone_from(&next);
        Ok(next)
    }

    async fn create_user_progress(
        &self,
        new_progress: UserProgress,
    ) -> Result<UserProgress, DomainError> {
        let mut progress = self.progress.write().map_err(|_| poisoned())?;
        Ok(progress
            .entry(new_progress.user_id.clone())
            .or_insert(new_progress)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use leibniz_test_support::{FixedClock, fixed_now, story_node};

    fn store() -> MemStorage {
        MemStorage::new(Arc::new(FixedClock(fixed_now())))
    }

    #[tokio::test]
    async fn test_update_missing_progress_is_not_found() {
        let storage = store();

        let result = storage
            .update_user_progress("nobody", ProgressPatch::default())
            .await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_progress_merges_and_stamps_with_clock() {
        // Arrange
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let storage = store();
        storage
            .create_user_progress(UserProgress::new("reader-1", created_at))
            .await
            .unwrap();

        // Act
        let updated = storage
            .update_user_progress(
                "reader-1",
                ProgressPatch {
                    current_node: Some("discovery".to_owned()),
                    ..ProgressPatch::default()
                },
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(updated.current_node, "discovery");
        assert_eq!(updated.visited_nodes, vec!["origin"]);
        assert_eq!(updated.created_at, created_at);
        assert_eq!(updated.updated_at, fixed_now());
    }

    #[tokio::test]
    async fn test_failed_modify_leaves_progress_untouched() {
        // Arrange
        let storage = store();
        let original = storage
            .create_user_progress(UserProgress::new("reader-1", fixed_now()))
            .await
            .unwrap();

        // Act
        let result = storage
            .modify_user_progress(
                "reader-1",
                Box::new(|mut progress: UserProgress| -> Result<UserProgress, DomainError> {
                    progress.current_node = "discovery".to_owned();
                    Err(DomainError::InvalidNode("discovery".to_owned()))
                }),
            )
            .await;

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidNode(_))));
        let stored = storage.get_user_progress("reader-1").await.unwrap().unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn test_replace_story_nodes_drops_retired_nodes_and_reorders() {
        // Arrange
        let storage = store();
        for id in ["origin", "discovery", "revelation"] {
            storage
                .create_story_node(story_node(id, &[], vec![]))
                .await
                .unwrap();
        }

        // Act
        storage
            .replace_story_nodes(vec![
                story_node("revelation", &[], vec![]),
                story_node("origin", &[], vec![]),
            ])
            .await
            .unwrap();

        // Assert
        let ids: Vec<String> = storage
            .get_all_story_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["revelation", "origin"]);
        assert!(storage.get_story_node("discovery").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_progress_keeps_existing_record() {
        let storage = store();
        let mut first = UserProgress::new("reader-1", fixed_now());
        first.is_audio_enabled = false;
        storage.create_user_progress(first.clone()).await.unwrap();

        let second = storage
            .create_user_progress(UserProgress::new("reader-1", fixed_now()))
            .await
            .unwrap();

        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_story_nodes_keep_insertion_order_and_replace_by_id() {
        // Arrange
        let storage = store();
        for id in ["origin", "discovery", "revelation"] {
            storage
                .create_story_node(story_node(id, &[], vec![]))
                .await
                .unwrap();
        }
        let mut edited = story_node("discovery", &[], vec![]);
        edited.title = "Edited".to_owned();

        // Act
        storage.create_story_node(edited).await.unwrap();

        // Assert
        let ids: Vec<String> = storage
            .get_all_story_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["origin", "discovery", "revelation"]);
        let discovery = storage.get_story_node("discovery").await.unwrap().unwrap();
        assert_eq!(discovery.title, "Edited");
    }

    #[tokio::test]
    async fn test_users_get_sequential_ids_and_unique_names() {
        let storage = store();
        let alice = NewUser {
            username: "alice".to_owned(),
            password: "pw".to_owned(),
        };

        let first = storage.create_user(alice.clone()).await.unwrap();
        let second = storage
            .create_user(NewUser {
                username: "bob".to_owned(),
                password: "pw".to_owned(),
            })
            .await
            .unwrap();
        let duplicate = storage.create_user(alice).await;

        assert_eq!((first.id, second.id), (1, 2));
        assert!(matches!(duplicate, Err(DomainError::Validation(_))));
        assert_eq!(storage.get_user(2).await.unwrap().unwrap().username, "bob");
        assert_eq!(
            storage.get_user_by_username("alice").await.unwrap().unwrap().id,
            1
        );
        assert!(storage.get_user(3).await.unwrap().is_none());
    }
}
