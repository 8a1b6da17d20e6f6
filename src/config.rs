use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

/// Everything the server needs to run, resolved once at startup and passed
/// explicitly into the component constructors. No module-global state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Base URL of the Ollama-compatible chat endpoint.
    pub ollama_base_url: String,
    /// Model name sent with every completion request.
    pub model: String,
    /// Single bound on the synchronous backend round trip.
    pub backend_timeout: Duration,
    /// System prompt file used by the project chat and briefing generator.
    pub prompt_path: PathBuf,
    /// Directory receiving one text file per captured lead.
    pub leads_dir: PathBuf,
    /// Directory receiving one briefing file per finalized project.
    pub briefings_dir: PathBuf,
    /// HTTP listen port.
    pub port: u16,
}

impl AppConfig {
    /// Reads configuration from the environment. Only `DATABASE_URL` is
    /// required; everything else has a development-friendly default.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set (copy .env.example to .env)")?;

        let ollama_base_url = env::var("OLLAMA_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());

        let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let backend_timeout = match env::var("BACKEND_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .context("BACKEND_TIMEOUT_SECS must be an integer number of seconds")?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        };

        let prompt_path =
            PathBuf::from(env::var("PROMPT_FILE").unwrap_or_else(|_| "prompt.txt".to_string()));
        let leads_dir =
            PathBuf::from(env::var("LEADS_DIR").unwrap_or_else(|_| "leads".to_string()));
        let briefings_dir = PathBuf::from(
            env::var("BRIEFINGS_DIR").unwrap_or_else(|_| "project_briefings".to_string()),
        );

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url,
            ollama_base_url,
            model,
            backend_timeout,
            prompt_path,
            leads_dir,
            briefings_dir,
            port,
        })
    }
}
