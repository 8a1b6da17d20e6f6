//! Turns a finalized project's chat history into a structured briefing
//! document via one backend call, stores the document as a text file and
//! advances the project to `analyzing`.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::backend::{to_chat_turns, ChatTurn, CompletionBackend};
use crate::db::message_repository::MessageStore;
use crate::db::project_repository::ProjectStore;
use crate::errors::AppError;
use crate::models::{ChatMessage, Project};

use super::load_system_prompt;

const FINAL_INSTRUCTION: &str = "Com base em toda a nossa conversa, por favor, gere o briefing \
    completo do projeto seguindo estritamente a estrutura 5W2H definida nas suas instruções \
    iniciais.";

#[derive(Clone)]
pub struct BriefingService {
    projects: Arc<dyn ProjectStore>,
    messages: Arc<dyn MessageStore>,
    backend: Arc<dyn CompletionBackend>,
    prompt_path: PathBuf,
    briefings_dir: PathBuf,
}

impl BriefingService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        messages: Arc<dyn MessageStore>,
        backend: Arc<dyn CompletionBackend>,
        prompt_path: PathBuf,
        briefings_dir: PathBuf,
    ) -> Self {
        Self { projects, messages, backend, prompt_path, briefings_dir }
    }

    /// Generates and stores the briefing. Ownership is checked by the caller
    /// (route layer) via [`crate::service::chat_service::ChatService::authorize`];
    /// on any failure here the project row is left untouched.
    pub async fn finalize(&self, project: &Project) -> Result<String, AppError> {
        let system_prompt = load_system_prompt(&self.prompt_path).await?;
        let history = self.messages.find_by_project_id(&project.id).await?;

        let briefing = self
            .backend
            .complete(briefing_messages(&system_prompt, &history))
            .await?;

        tokio::fs::create_dir_all(&self.briefings_dir)
            .await
            .map_err(|e| AppError::persistence("briefings directory", e))?;

        let filename = format!("projeto_{}_{}.txt", project.id, project.owner_username);
        let path = self.briefings_dir.join(&filename);
        tokio::fs::write(&path, &briefing)
            .await
            .map_err(|e| AppError::persistence(format!("briefing file {filename}"), e))?;

        let path_str = path.to_string_lossy().into_owned();
        self.projects.mark_analyzing(&project.id, &path_str).await?;

        info!("Project {} finalized, briefing at {path_str}", project.id);
        Ok(path_str)
    }
}

/// The whole transcript is resent in one call: system prompt first, the
/// stored history in insertion order, then the fixed closing instruction.
fn briefing_messages(system_prompt: &str, history: &[ChatMessage]) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(ChatTurn::system(system_prompt));
    turns.extend(to_chat_turns(history));
    turns.push(ChatTurn::user(FINAL_INSTRUCTION));
    turns
}
