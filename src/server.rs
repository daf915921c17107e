//! Search-history HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/search-history` | Validate and persist one entry |
//! | `GET`  | `/api/search-history?limit=N` | Newest entries first |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "searchType: expected \"simple\" or \"advanced\"" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients on
//! other origins can post history.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use affiliate_lookup_core::history::{NewSearchHistory, SearchHistoryEntry};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteHistoryStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteHistoryStore>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteHistoryStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/search-history",
            get(handle_list_history).post(handle_add_history),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the history server on `[server].bind`.
///
/// Opens (and migrates) the database first, so `afl init` is optional.
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), SqliteHistoryStore::new(pool)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "history server listening");
    println!("History server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "history request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ /api/search-history ============

/// Handler for `POST /api/search-history`.
///
/// Malformed JSON and bodies that fail validation are both 400s; the
/// store assigns `id` and `timestamp`.
async fn handle_add_history(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchHistoryEntry>, AppError> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let entry = NewSearchHistory::from_json(body).map_err(|e| bad_request(e.to_string()))?;
    let saved = state.store.add(entry).await.map_err(internal)?;
    tracing::debug!(id = %saved.id, search_type = saved.search_type.as_str(), "history entry saved");
    Ok(Json(saved))
}

/// Handler for `GET /api/search-history`.
async fn handle_list_history(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SearchHistoryEntry>>, AppError> {
    let limit = state
        .config
        .history
        .resolve_limit(params.get("limit").map(String::as_str));
    let entries = state.store.list(limit).await.map_err(internal)?;
    Ok(Json(entries))
}
