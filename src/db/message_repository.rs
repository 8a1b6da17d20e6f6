use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::error;

use crate::errors::AppError;
use crate::models::{ChatMessage, MessageRole};

/// Seam between the services and chat-history storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// A project's messages in insertion order, which is also the
    /// conversational order the briefing generator relies on.
    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<ChatMessage>, AppError>;
    async fn save(&self, message: &ChatMessage) -> Result<ChatMessage, AppError>;
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query(
            "SELECT id, project_id, role, content, created_at
             FROM chat_messages
             WHERE project_id = $1
             ORDER BY created_at ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load history for project {project_id}: {e}");
            AppError::db_query(format!("Failed to load history for project {project_id}"), e)
        })?;

        rows.into_iter().map(from_row).collect()
    }

    async fn save(&self, message: &ChatMessage) -> Result<ChatMessage, AppError> {
        sqlx::query(
            "INSERT INTO chat_messages (id, project_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&message.id)
        .bind(&message.project_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to store {} message on project {}: {e}", message.role.as_str(), message.project_id);
            AppError::db_query("Failed to store chat message", e)
        })?;
        Ok(message.clone())
    }
}

fn from_row(row: PgRow) -> Result<ChatMessage, AppError> {
    let role_str: String = row
        .try_get("role")
        .map_err(|e| AppError::db_query("Failed to read role", e))?;
    let role = MessageRole::try_from(role_str)
        .map_err(|e| AppError::Unexpected(format!("Unknown message role: {e}")))?;
    Ok(ChatMessage {
        id: row.try_get("id").map_err(|e| AppError::db_query("Failed to read id", e))?,
        project_id: row
            .try_get("project_id")
            .map_err(|e| AppError::db_query("Failed to read project_id", e))?,
        role,
        content: row
            .try_get("content")
            .map_err(|e| AppError::db_query("Failed to read content", e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::db_query("Failed to read created_at", e))?,
    })
}
