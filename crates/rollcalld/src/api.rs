//! HTTP API: the welcome-email endpoint and a status probe.
//!
//! Every response body is `{"message": ...}`. Failures use non-2xx status
//! codes: 400 for a bad request, 502 when the mail relay fails.

use crate::mail::{MailError, Mailer};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rollcall_core::roster::is_plausible_email;
use rollcall_notify::{WelcomeRequest, WelcomeResponse};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub mailer: Arc<dyn Mailer>,
    /// Number of roster entries known to the daemon, if a roster was loaded.
    pub roster_entries: Option<usize>,
    pub smtp_host: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Error sending welcome email: {0}")]
    Mail(#[from] MailError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Mail(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Mail(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "welcome-email request failed");
        } else {
            tracing::debug!(error = %self, "welcome-email request rejected");
        }
        (
            status,
            Json(WelcomeResponse {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/welcome-email", post(welcome_email))
        .route("/api/status", get(status))
        .with_state(state)
}

async fn welcome_email(
    State(state): State<AppState>,
    payload: Result<Json<WelcomeRequest>, JsonRejection>,
) -> Result<Json<WelcomeResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let email = req.email.trim();
    if !is_plausible_email(email) {
        return Err(ApiError::BadRequest(format!("invalid email {email:?}")));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }

    tracing::info!(email, name = %req.name, "welcome-email requested");
    state.mailer.send_welcome(email, req.name.trim()).await?;

    Ok(Json(WelcomeResponse {
        message: format!("Welcome email sent to {email}"),
    }))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "roster_entries": state.roster_entries,
        "smtp_host": state.smtp_host,
    }))
}
