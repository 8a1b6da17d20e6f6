use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::{IntakeRequest, NewProjectRequest, ProjectChatRequest, ProjectChatResponse};

use super::{error_response, AppState, AuthUser};

// ── External (unauthenticated) intake chat ────────────────────────────────────

/// POST `/api/external_chat` — one turn of the scripted intake. The client
/// round-trips `(step, answers)` verbatim; the server keeps no session state.
pub async fn external_chat_handler(
    State(state): State<AppState>,
    Json(req): Json<IntakeRequest>,
) -> Response {
    match state.intake.next_turn(req.step, req.answers, &req.message).await {
        Ok(turn) => Json(turn).into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Internal (authenticated) project routes ───────────────────────────────────

/// POST `/api/projects` — create a project for the caller.
pub async fn new_project_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<NewProjectRequest>,
) -> Response {
    match state.chat.create_project(&req.name, &user).await {
        Ok(project) => Json(project).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/projects` — the caller's projects, newest first.
pub async fn list_projects_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Response {
    match state.chat.list_projects(&user).await {
        Ok(projects) => Json(projects).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/projects/{id}/messages` — a project's chat history in order.
pub async fn list_messages_handler(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Response {
    match state.chat.get_messages(&project_id, &user).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/project_chat/{id}` — one free-form chat turn on a project.
pub async fn project_chat_handler(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ProjectChatRequest>,
) -> Response {
    match state.chat.chat(&project_id, &user, &req.message).await {
        Ok(text) => Json(ProjectChatResponse { text }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/project/{id}/finalize` — generate and store the briefing,
/// moving the project to `analyzing`. The project is untouched on failure.
pub async fn finalize_project_handler(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Response {
    let project = match state.chat.authorize(&project_id, &user).await {
        Ok(project) => project,
        Err(e) => return error_response(&e),
    };

    match state.briefing.finalize(&project).await {
        Ok(summary_file) => Json(json!({
            "status": "analyzing",
            "summary_file": summary_file,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
