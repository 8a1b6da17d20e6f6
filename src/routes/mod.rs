pub mod api_routes;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::AppError;
use crate::intake::IntakeEngine;
use crate::service::briefing_service::BriefingService;
use crate::service::chat_service::ChatService;

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeEngine>,
    pub chat: ChatService,
    pub briefing: BriefingService,
}

/// Identity of the authenticated caller, as established by the fronting
/// auth layer (out of scope here) and forwarded in the `x-username` header.
/// This crate only checks resource ownership against it.
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get("x-username")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match username {
            Some(user) => Ok(AuthUser(user.to_string())),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Não autorizado" })),
            )
                .into_response()),
        }
    }
}

/// Maps an application error to an HTTP status and a JSON `{error}` body.
pub fn error_response(err: &AppError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_denied() {
        StatusCode::FORBIDDEN
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_backend_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
