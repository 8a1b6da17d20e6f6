use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error. All variants carry a human-readable message
/// suitable for display or logging; raw backend/database errors are never
/// forwarded into a conversation transcript without going through one of
/// these variants first.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Generative backend errors ────────────────────────────────────────────
    #[error("The language backend did not answer within the configured timeout")]
    BackendTimeout,

    #[error("Could not reach the language backend at {host}")]
    BackendUnreachable { host: String },

    #[error("Language backend failed: {0}")]
    BackendUnexpected(String),

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("System prompt file not found: {}", .path.display())]
    PromptConfigMissing { path: PathBuf },

    // ── Persistence errors ───────────────────────────────────────────────────
    #[error("Failed to persist {what}: {source}")]
    PersistenceFailure {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{entity} with id '{id}' not found")]
    RecordNotFound { entity: &'static str, id: String },

    // ── Request errors ───────────────────────────────────────────────────────
    #[error("Not authorized to access this project")]
    AuthorizationDenied,

    #[error("Field '{field}' cannot be empty")]
    ValidationFailure { field: &'static str },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn persistence(what: impl Into<String>, source: std::io::Error) -> Self {
        AppError::PersistenceFailure { what: what.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::RecordNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::ValidationFailure { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AppError::AuthorizationDenied)
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, AppError::BackendTimeout | AppError::BackendUnreachable { .. })
    }
}
