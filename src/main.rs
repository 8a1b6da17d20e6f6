mod backend;
mod config;
mod db;
mod errors;
mod intake;
mod models;
mod routes;
mod script;
mod service;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::OllamaClient;
use crate::config::AppConfig;
use crate::db::lead_store::FileLeadStore;
use crate::db::message_repository::MessageRepository;
use crate::db::project_repository::ProjectRepository;
use crate::intake::IntakeEngine;
use crate::routes::api_routes::{
    external_chat_handler, finalize_project_handler, list_messages_handler,
    list_projects_handler, new_project_handler, project_chat_handler,
};
use crate::routes::AppState;
use crate::service::briefing_service::BriefingService;
use crate::service::chat_service::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database connection established and migrations applied");

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let backend = Arc::new(OllamaClient::new(
        &config.ollama_base_url,
        &config.model,
        config.backend_timeout,
    )?);
    let lead_store = Arc::new(FileLeadStore::new(config.leads_dir.clone()));

    let project_repo = Arc::new(ProjectRepository::new(pool.clone()));
    let message_repo = Arc::new(MessageRepository::new(pool.clone()));

    let state = AppState {
        intake: Arc::new(IntakeEngine::new(backend.clone(), lead_store)),
        chat: ChatService::new(
            project_repo.clone(),
            message_repo.clone(),
            backend.clone(),
            config.prompt_path.clone(),
        ),
        briefing: BriefingService::new(
            project_repo,
            message_repo,
            backend,
            config.prompt_path.clone(),
            config.briefings_dir.clone(),
        ),
    };

    // ── Router ────────────────────────────────────────────────────────────────
    let app = Router::new()
        .route("/api/external_chat", post(external_chat_handler))
        .route("/api/projects", post(new_project_handler).get(list_projects_handler))
        .route("/api/projects/{id}/messages", get(list_messages_handler))
        .route("/api/project_chat/{id}", post(project_chat_handler))
        .route("/api/project/{id}/finalize", post(finalize_project_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
