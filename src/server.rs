//! HTTP endpoint for the word editor.
//!
//! Exposes the contribution pipeline as a small JSON-over-HTTP API
//! consumed by the in-browser editor.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/dictionary` | Run one submission through the pipeline |
//! | `DELETE` | `/api/dictionary?branch=<name>` | Discard a stale change branch |
//! | `GET` | `/api/dictionary/{title}` | Fetch an existing entry for editing |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! The `POST` body is `multipart/form-data` with fields `title`, `content`,
//! `action` (`new` or `edit`), and, for edits, a JSON-encoded `metadata`
//! field carrying the entry's path and blob SHA.
//!
//! # Authentication
//!
//! Session handling lives upstream; by the time a request reaches this
//! endpoint its `Authorization: Bearer` token is the contributor's already
//! validated credential. Each request gets its own user-scoped client from
//! that token. The privileged bot client is built once at startup from the
//! `JARGONS_BOT_TOKEN` environment variable and used only for labeling.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "branch_exists", "message": "branch \"word/new/api\" already exists" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `forbidden`
//! (403), `not_found` (404), `branch_exists` (422), `submission_failed` /
//! `internal` (500). The `branch_exists` case is the one the editor turns
//! into a delete-and-resubmit confirmation dialog.

use anyhow::Context as _;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, GithubConfig, BOT_TOKEN_ENV};
use crate::contribute::{discard_change_branch, submit_word_contribution};
use crate::error::Error;
use crate::github::GithubClient;
use crate::models::{Action, ProjectRepo, PullRequest, WordMetadata, WordSubmission};
use crate::word_editor::{get_existing_word, WordEntry};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    /// The canonical dictionary repository.
    project: ProjectRepo,
    /// Client settings used to build the per-request user clients.
    github: GithubConfig,
    /// The privileged labeling client, built once at startup.
    bot: GithubClient,
}

/// Start the HTTP endpoint.
///
/// Binds to `[server].bind` and serves until the process terminates.
///
/// # Errors
///
/// Fails at startup when `JARGONS_BOT_TOKEN` is unset or binding fails.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bot_token = std::env::var(BOT_TOKEN_ENV)
        .with_context(|| format!("{} environment variable not set", BOT_TOKEN_ENV))?;
    let bot = GithubClient::new(bot_token, &config.github)
        .context("failed to construct the bot client")?;

    let state = AppState {
        project: config.project.clone(),
        github: config.github.clone(),
        bot,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    println!(
        "jargons-editor serving {} on http://{}",
        config.project.repo_fullname, config.server.bind
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/dictionary",
            axum::routing::post(handle_submit_word).delete(handle_discard_branch),
        )
        .route("/api/dictionary/{title}", get(handle_get_word))
        .route("/health", get(handle_health))
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"branch_exists"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map a pipeline error variant to its HTTP representation. Callers branch
/// on the variant, never on message text.
fn classify_error(err: Error) -> AppError {
    let message = err.to_string();
    let (status, code) = match err {
        Error::MalformedReference { .. } | Error::InvalidSubmission { .. } => {
            (StatusCode::BAD_REQUEST, "bad_request")
        }
        Error::BranchAlreadyExists { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "branch_exists"),
        Error::BranchNotFound { .. } | Error::WordNotFound { .. } => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        Error::BranchAccess { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        Error::WordSubmission { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "submission_failed"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    AppError {
        status,
        code: code.to_string(),
        message,
    }
}

/// Pull the contributor's token out of the `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("missing Authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .ok_or_else(|| unauthorized("Authorization header is not a bearer token"))
}

fn user_client(state: &AppState, headers: &HeaderMap) -> Result<GithubClient, AppError> {
    let token = bearer_token(headers)?;
    GithubClient::new(token, &state.github).map_err(|e| internal(e.to_string()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/dictionary ============

/// Read the editor's multipart form into a submission.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(Action, WordSubmission), AppError> {
    let mut title = None;
    let mut content = None;
    let mut action = None;
    let mut metadata = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("unreadable multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .map_err(|e| bad_request(format!("unreadable field {:?}: {}", name, e)))?;

        match name.as_str() {
            "title" => title = Some(text),
            "content" => content = Some(text),
            "action" => action = Some(text),
            "metadata" => {
                let parsed: WordMetadata = serde_json::from_str(&text)
                    .map_err(|e| bad_request(format!("invalid metadata JSON: {}", e)))?;
                metadata = Some(parsed);
            }
            // Unknown fields are ignored.
            _ => {}
        }
    }

    let title = title.ok_or_else(|| bad_request("missing field: title"))?;
    let content = content.ok_or_else(|| bad_request("missing field: content"))?;
    let action = action
        .ok_or_else(|| bad_request("missing field: action"))?
        .parse::<Action>()
        .map_err(classify_error)?;

    if title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }

    if action == Action::Edit && metadata.is_none() {
        return Err(bad_request(
            "edit submissions require a metadata field with the entry path and blob sha",
        ));
    }

    Ok((
        action,
        WordSubmission {
            title,
            content,
            metadata,
        },
    ))
}

/// Handler for `POST /api/dictionary`.
///
/// Runs the submission through the pipeline and returns the opened pull
/// request's JSON on success.
async fn handle_submit_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<PullRequest>, AppError> {
    let user = user_client(&state, &headers)?;
    let (action, word) = read_submission(multipart).await?;

    let pull_request = submit_word_contribution(&user, &state.bot, action, &state.project, &word)
        .await
        .map_err(classify_error)?;

    Ok(Json(pull_request))
}

// ============ DELETE /api/dictionary ============

#[derive(Deserialize)]
struct DiscardParams {
    /// Change branch to delete, e.g. `word/new/api`.
    branch: String,
}

#[derive(Serialize)]
struct DiscardResponse {
    status: u16,
    branch: String,
}

/// Handler for `DELETE /api/dictionary?branch=<name>`.
///
/// The conflict-recovery path: removes a stale change branch from the
/// contributor's fork so the submission can be retried.
async fn handle_discard_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DiscardParams>,
) -> Result<Json<DiscardResponse>, AppError> {
    let user = user_client(&state, &headers)?;

    let status = discard_change_branch(&user, &state.project, &params.branch)
        .await
        .map_err(classify_error)?;

    Ok(Json(DiscardResponse {
        status,
        branch: params.branch,
    }))
}

// ============ GET /api/dictionary/{title} ============

/// Handler for `GET /api/dictionary/{title}`.
///
/// Fetches an existing entry (decoded body, path, blob SHA) from the
/// canonical repository; the editor seeds an edit session from this.
async fn handle_get_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(title): Path<String>,
) -> Result<Json<WordEntry>, AppError> {
    let user = user_client(&state, &headers)?;

    let entry = get_existing_word(&user, &state.project, &title)
        .await
        .map_err(classify_error)?;

    Ok(Json(entry))
}
