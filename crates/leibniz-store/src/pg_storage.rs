//! `PostgreSQL` implementation of the `Storage` trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use sqlx::types::Json;
use tracing::debug;

use leibniz_core::clock::Clock;
use leibniz_core::error::DomainError;
use leibniz_core::model::{
    Choice, ChoiceRecord, NewUser, Position, ProgressPatch, StoryNode, User, UserProgress,
};
use leibniz_core::storage::{ProgressUpdate, Storage};

/// Applies the SQL migrations under `migrations/`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))
}

fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password: row.password,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StoryNodeRow {
    id: String,
    title: String,
    content: String,
    location: String,
    read_time: String,
    x: i32,
    y: i32,
    connected_nodes: Vec<String>,
    choices: Json<Vec<Choice>>,
}

impl From<StoryNodeRow> for StoryNode {
    fn from(row: StoryNodeRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            location: row.location,
            read_time: row.read_time,
            position: Position { x: row.x, y: row.y },
            connected_nodes: row.connected_nodes,
            choices: row.choices.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    user_id: String,
    visited_nodes: Vec<String>,
    current_node: String,
    choices: Json<Vec<ChoiceRecord>>,
    is_audio_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for UserProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            visited_nodes: row.visited_nodes,
            current_node: row.current_node,
            choices: row.choices.0,
            is_audio_enabled: row.is_audio_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const STORY_NODE_COLUMNS: &str =
    "id, title, content, location, read_time, x, y, connected_nodes, choices";

const PROGRESS_COLUMNS: &str =
    "user_id, visited_nodes, current_node, choices, is_audio_enabled, created_at, updated_at";

async fn upsert_story_node(conn: &mut PgConnection, node: &StoryNode) -> Result<(), DomainError> {
    sqlx::query(
        "INSERT INTO story_nodes \
             (id, title, content, location, read_time, x, y, connected_nodes, choices) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (id) DO UPDATE SET \
             title = EXCLUDED.title, content = EXCLUDED.content, \
             location = EXCLUDED.location, read_time = EXCLUDED.read_time, \
             x = EXCLUDED.x, y = EXCLUDED.y, \
             connected_nodes = EXCLUDED.connected_nodes, choices = EXCLUDED.choices",
    )
    .bind(&node.id)
    .bind(&node.title)
    .bind(&node.content)
    .bind(&node.location)
    .bind(&node.read_time)
    .bind(node.position.x)
    .bind(node.position.y)
    .bind(&node.connected_nodes)
    .bind(Json(&node.choices))
    .execute(conn)
    .await
    .map_err(infra)?;
    Ok(())
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for PgStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStorage")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl PgStorage {
    /// Creates a new `PgStorage`. `clock` stamps progress updates.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "INSERT INTO users (username, password) VALUES ($1, $2) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING id, username, password",
        )
        .bind(&user.username)
        .bind(&user.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(User::from).ok_or_else(|| {
            DomainError::Validation(format!("username already taken: {}", user.username))
        })
    }

    async fn get_story_node(&self, id: &str) -> Result<Option<StoryNode>, DomainError> {
        let row: Option<StoryNodeRow> = sqlx::query_as(&format!(
            "SELECT {STORY_NODE_COLUMNS} FROM story_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(row.map(StoryNode::from))
    }

    async fn get_all_story_nodes(&self) -> Result<Vec<StoryNode>, DomainError> {
        let rows: Vec<StoryNodeRow> = sqlx::query_as(&format!(
            "SELECT {STORY_NODE_COLUMNS} FROM story_nodes ORDER BY ordinal"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(StoryNode::from).collect())
    }

    async fn create_story_node(&self, node: StoryNode) -> Result<StoryNode, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(infra)?;
        upsert_story_node(&mut *conn, &node).await?;
        Ok(node)
    }

    async fn replace_story_nodes(&self, nodes: Vec<StoryNode>) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        // Fresh rows take new ordinals, so listing order follows `nodes`.
        sqlx::query("DELETE FROM story_nodes")
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        for node in &nodes {
            upsert_story_node(&mut *tx, node).await?;
        }

        tx.commit().await.map_err(infra)?;
        debug!(nodes = nodes.len(), "story nodes replaced");
        Ok(())
    }

    async fn get_user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, DomainError> {
        let row: Option<ProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(row.map(UserProgress::from))
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
        let mut tx = self.pool.begin().await.map_err(infra)?;

        let row: Option<ProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(infra)?;

        let current = row
            .map(UserProgress::from)
            .ok_or_else(|| DomainError::NotFound(format!("progress for user {user_id}")))?;
        // An error here drops `tx`, which rolls back and releases the row.
        let progress = update(current)?;

        sqlx::query(
            "UPDATE user_progress SET \
                 visited_nodes = $2, current_node = $3, choices = $4, \
                 is_audio_enabled = $5, updated_at = $6 \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(&progress.visited_nodes)
        .bind(&progress.current_node)
        .bind(Json(&progress.choices))
        .bind(progress.is_audio_enabled)
        .bind(progress.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;

        tx.commit().await.map_err(infra)?;
        debug!(user_id, "progress updated");
        Ok(progress)
    }

    async fn create_user_progress(
        &self,
        progress: UserProgress,
    ) -> Result<UserProgress, DomainError> {
        sqlx::query(
            "INSERT INTO user_progress \
                 (user_id, visited_nodes, current_node, choices, is_audio_enabled, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(&progress.user_id)
        .bind(&progress.visited_nodes)
        .bind(&progress.current_node)
        .bind(Json(&progress.choices))
        .bind(progress.is_audio_enabled)
        .bind(progress.created_at)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        self.get_user_progress(&progress.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "progress for user {} vanished after insert",
                    progress.user_id
                ))
            })
    }
}
