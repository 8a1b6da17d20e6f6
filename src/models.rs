use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Projects ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Analyzing,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Analyzing => "analyzing",
        }
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ProjectStatus::Draft),
            "analyzing" => Ok(ProjectStatus::Analyzing),
            other => Err(format!("Unknown project status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub summary_file_path: Option<String>,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, owner_username: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            status: ProjectStatus::Draft,
            summary_file_path: None,
            owner_username,
            created_at: Utc::now(),
        }
    }
}

// ── Chat messages ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub project_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(project_id: String, role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id,
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

// ── External intake wire types ────────────────────────────────────────────────

/// Slot name → answer text, populated progressively as the script advances.
pub type Answers = BTreeMap<String, String>;

/// The client-echoed step value. The wire form is polymorphic: an integer
/// index into the script, or one of the named stages. Deserialization never
/// fails: anything that is not a non-negative integer becomes a `Named`
/// value, and unrecognized names (like out-of-range indices) are absorbed
/// by the state machine as a reset rather than a request error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepValue {
    Index(usize),
    Named(String),
}

impl<'de> Deserialize<'de> for StepValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(i) => StepValue::Index(i as usize),
                // Negative or fractional: keep the raw text so the state
                // machine treats it as unrecognized.
                None => StepValue::Named(n.to_string()),
            },
            serde_json::Value::String(s) => StepValue::Named(s),
            other => StepValue::Named(other.to_string()),
        })
    }
}

impl StepValue {
    pub const SUMMARY_REVIEW: &'static str = "summary_review";
    pub const ADDING_COMPLEMENT: &'static str = "adding_complement";
    pub const FINISHED: &'static str = "finished";
    pub const ERROR: &'static str = "error";

    pub fn named(name: &str) -> Self {
        StepValue::Named(name.to_string())
    }
}

impl Default for StepValue {
    fn default() -> Self {
        StepValue::Index(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    #[serde(default)]
    pub step: StepValue,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeTurn {
    pub text: String,
    pub step: StepValue,
    pub answers: Answers,
}

// ── Internal project chat wire types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProjectChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectChatResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NewProjectRequest {
    #[serde(default)]
    pub name: String,
}
