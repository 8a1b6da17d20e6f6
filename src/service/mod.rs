pub mod briefing_service;
pub mod chat_service;

use std::path::Path;

use crate::errors::AppError;

/// Loads the system prompt used by the project chat and briefing generator.
/// Read per request so edits apply without a restart; a missing file is
/// fatal for the request, not recoverable within it.
pub async fn load_system_prompt(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::PromptConfigMissing { path: path.to_path_buf() }
        } else {
            AppError::persistence(format!("prompt file {}", path.display()), e)
        }
    })
}
