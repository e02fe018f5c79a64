//! HTTP server for newsletter requests.
//!
//! Exposes the webhook the document backend calls when a page gains a
//! GitHub link. Requests are acknowledged as soon as they validate; the job
//! itself runs detached via [`spawn_job`] and its outcome is only logged.
//!
//! # Endpoints
//!
//! | Method | Path          | Description                               |
//! |--------|---------------|-------------------------------------------|
//! | `GET`  | `/`           | Liveness check                            |
//! | `POST` | `/newsletter` | Validate the webhook and start a job      |
//!
//! Every route requires the `x-api-key` header to equal the shared secret.
//!
//! # Error Responses
//!
//! ```json
//! { "detail": "Invalid API Key" }
//! ```

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use newsletter_core::config::PipelineConfig;
use newsletter_core::synchronise::{spawn_job, Collaborators, NewsletterJob};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub api_key: Arc<str>,
    pub collaborators: Arc<Collaborators>,
    pub pipeline: Arc<PipelineConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/newsletter", post(handle_newsletter))
        .with_state(state)
}

/// Serve on an already-bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "Newsletter server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

pub async fn run_server(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    serve(listener, state).await
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

struct AppError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

fn forbidden() -> AppError {
    AppError {
        status: StatusCode::FORBIDDEN,
        detail: "Invalid API Key".to_string(),
    }
}

fn bad_request(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        detail: detail.into(),
    }
}

fn check_api_key(headers: &HeaderMap, state: &AppState) -> Result<(), AppError> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if key == &*state.api_key => Ok(()),
        _ => {
            tracing::warn!(key_present = presented.is_some(), "Rejected request with invalid API key");
            Err(forbidden())
        }
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn handle_root(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    check_api_key(&headers, &state)?;
    Ok(Json(MessageResponse {
        message: "API is working",
    }))
}

#[derive(Serialize)]
struct AcceptedResponse {
    status: &'static str,
    message: String,
}

const GITHUB_REQUIRED: &str = "Invalid request: 'GitHub' property is required";
const PAGE_ID_REQUIRED: &str = "Invalid request: 'Page ID' is required";

/// Pull `(repo_url, page_id)` out of a webhook payload.
fn parse_webhook(payload: &Value) -> Result<(String, String), AppError> {
    let data = payload.get("data");
    let github = data
        .and_then(|d| d.get("properties"))
        .filter(|p| p.as_object().is_some_and(|m| !m.is_empty()))
        .and_then(|p| p.get("GitHub"))
        .ok_or_else(|| bad_request(GITHUB_REQUIRED))?;

    let repo_url = github
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let page_id = data
        .and_then(|d| d.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    if page_id.is_empty() {
        return Err(bad_request(PAGE_ID_REQUIRED));
    }
    if repo_url.is_empty() {
        return Err(bad_request(GITHUB_REQUIRED));
    }
    Ok((repo_url, page_id))
}

async fn handle_newsletter(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, AppError> {
    check_api_key(&headers, &state)?;

    let payload: Value = serde_json::from_slice(&body).map_err(|e| AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: format!("Invalid request body: {e}"),
    })?;
    let (repo_url, page_id) = parse_webhook(&payload)?;

    let job = NewsletterJob::new(page_id, repo_url.clone());
    tracing::info!(
        job_id = %job.job_id,
        repo_url = %job.repo_url,
        page_id = %job.page_id,
        "Accepted newsletter request"
    );
    // Detached; the outcome is only logged.
    spawn_job(state.collaborators.clone(), state.pipeline.clone(), job);

    Ok(Json(AcceptedResponse {
        status: "processing",
        message: format!("Generating Newsletter for GitHub repo: {repo_url}"),
    }))
}
