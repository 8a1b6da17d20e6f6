use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::backend::{to_chat_turns, ChatTurn, CompletionBackend};
use crate::db::message_repository::MessageStore;
use crate::db::project_repository::ProjectStore;
use crate::errors::AppError;
use crate::models::{ChatMessage, MessageRole, Project};

use super::load_system_prompt;

/// Free-form chat for an authenticated project. Every turn replays the full
/// stored history to the backend; no summarization chunking.
#[derive(Clone)]
pub struct ChatService {
    projects: Arc<dyn ProjectStore>,
    messages: Arc<dyn MessageStore>,
    backend: Arc<dyn CompletionBackend>,
    prompt_path: PathBuf,
}

impl ChatService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        messages: Arc<dyn MessageStore>,
        backend: Arc<dyn CompletionBackend>,
        prompt_path: PathBuf,
    ) -> Self {
        Self { projects, messages, backend, prompt_path }
    }

    /// Resolves a project and checks ownership before any side effect.
    pub async fn authorize(&self, project_id: &str, username: &str) -> Result<Project, AppError> {
        let project = self
            .projects
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound {
                entity: "Project",
                id: project_id.to_string(),
            })?;
        if project.owner_username != username {
            return Err(AppError::AuthorizationDenied);
        }
        Ok(project)
    }

    pub async fn list_projects(&self, username: &str) -> Result<Vec<Project>, AppError> {
        self.projects.find_by_owner(username).await
    }

    pub async fn create_project(&self, name: &str, username: &str) -> Result<Project, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::ValidationFailure { field: "project_name" });
        }
        let project = Project::new(name.trim().to_string(), username.to_string());
        info!("Project '{}' created for {username}", project.name);
        self.projects.save(&project).await
    }

    pub async fn get_messages(
        &self,
        project_id: &str,
        username: &str,
    ) -> Result<Vec<ChatMessage>, AppError> {
        self.authorize(project_id, username).await?;
        self.messages.find_by_project_id(project_id).await
    }

    /// One chat turn: persist the user message, replay the full transcript
    /// with the configured system prompt, persist the assistant reply.
    ///
    /// The prompt file is read before the first write, so a missing prompt
    /// leaves no stray row. The two writes are sequential and not wrapped in
    /// a transaction, so a crash between them leaves a user message without
    /// its reply. Known limitation; same for concurrent turns on one project
    /// interleaving.
    pub async fn chat(
        &self,
        project_id: &str,
        username: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let project = self.authorize(project_id, username).await?;
        if message.trim().is_empty() {
            return Err(AppError::ValidationFailure { field: "message" });
        }

        let system_prompt = load_system_prompt(&self.prompt_path).await?;

        let user_message =
            ChatMessage::new(project.id.clone(), MessageRole::User, message.to_string());
        self.messages.save(&user_message).await?;

        let history = self.messages.find_by_project_id(&project.id).await?;
        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.push(ChatTurn::system(system_prompt));
        turns.extend(to_chat_turns(&history));

        let reply = self.backend.complete(turns).await?;

        let assistant_message =
            ChatMessage::new(project.id.clone(), MessageRole::Assistant, reply.clone());
        self.messages.save(&assistant_message).await?;

        Ok(reply)
    }
}
