//! Durable sink for completed leads: one plain-text file per completed
//! conversation, named after the visitor and a save timestamp. Collisions
//! overwrite; replays write a second file. Neither is defended against.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::models::Answers;
use crate::script::{serialize_answers, SLOT_NOME};

/// Seam between the state machine and lead storage. Called at most once per
/// completed conversation under the documented transition rules.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn save(&self, answers: &Answers, complement: Option<&str>) -> Result<(), AppError>;
}

pub struct FileLeadStore {
    dir: PathBuf,
}

impl FileLeadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

/// Keeps only characters safe for a filename; everything else becomes `_`.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "anonimo".to_string() } else { cleaned }
}

fn render_lead(answers: &Answers, complement: Option<&str>) -> String {
    let mut body = String::from("=== LEAD CAPTURADO ===\n");
    body.push_str(&serialize_answers(answers));
    body.push('\n');
    if let Some(extra) = complement {
        body.push_str("\n=== COMPLEMENTO ===\n");
        body.push_str(extra);
        body.push('\n');
    }
    body
}

#[async_trait]
impl LeadSink for FileLeadStore {
    async fn save(&self, answers: &Answers, complement: Option<&str>) -> Result<(), AppError> {
        let visitor = answers.get(SLOT_NOME).map(String::as_str).unwrap_or("");
        let filename = format!(
            "lead_{}_{}.txt",
            sanitize(visitor),
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::persistence("leads directory", e))?;

        let path = self.dir.join(&filename);
        tokio::fs::write(&path, render_lead(answers, complement))
            .await
            .map_err(|e| AppError::persistence(format!("lead file {filename}"), e))?;

        info!("Lead saved to {}", path.display());
        Ok(())
    }
}
