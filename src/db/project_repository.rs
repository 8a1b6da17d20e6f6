use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::error;

use crate::errors::AppError;
use crate::models::{Project, ProjectStatus};

/// Seam between the services and project storage.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Project>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Project>, AppError>;
    async fn save(&self, project: &Project) -> Result<Project, AppError>;
    /// Marks a project as finalized: status moves to `analyzing` and the
    /// briefing file reference is recorded. One statement, so either both
    /// fields change or neither does.
    async fn mark_analyzing(&self, id: &str, summary_file_path: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, status, summary_file_path, owner_username, created_at
             FROM projects
             WHERE owner_username = $1
             ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch projects for {owner}: {e}");
            AppError::db_query(format!("Failed to fetch projects for {owner}"), e)
        })?;

        rows.into_iter().map(from_row).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, status, summary_file_path, owner_username, created_at
             FROM projects
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find project {id}: {e}");
            AppError::db_query(format!("Failed to find project {id}"), e)
        })?;

        row.map(from_row).transpose()
    }

    async fn save(&self, project: &Project) -> Result<Project, AppError> {
        sqlx::query(
            "INSERT INTO projects (id, name, status, summary_file_path, owner_username, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(project.status.as_str())
        .bind(&project.summary_file_path)
        .bind(&project.owner_username)
        .bind(project.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save project {}: {e}", project.id);
            AppError::db_query("Failed to save project", e)
        })?;
        Ok(project.clone())
    }

    async fn mark_analyzing(&self, id: &str, summary_file_path: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE projects SET status = $1, summary_file_path = $2 WHERE id = $3")
            .bind(ProjectStatus::Analyzing.as_str())
            .bind(summary_file_path)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to finalize project {id}: {e}");
                AppError::db_query(format!("Failed to finalize project {id}"), e)
            })?;
        Ok(())
    }
}

fn from_row(row: sqlx::postgres::PgRow) -> Result<Project, AppError> {
    let status_str: String = row
        .try_get("status")
        .map_err(|e| AppError::db_query("Failed to read status", e))?;
    let status = ProjectStatus::try_from(status_str)
        .map_err(|e| AppError::Unexpected(format!("Unknown project status: {e}")))?;
    Ok(Project {
        id: row.try_get("id").map_err(|e| AppError::db_query("Failed to read id", e))?,
        name: row.try_get("name").map_err(|e| AppError::db_query("Failed to read name", e))?,
        status,
        summary_file_path: row
            .try_get("summary_file_path")
            .map_err(|e| AppError::db_query("Failed to read summary_file_path", e))?,
        owner_username: row
            .try_get("owner_username")
            .map_err(|e| AppError::db_query("Failed to read owner_username", e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::db_query("Failed to read created_at", e))?,
    })
}
