//! Inbound HTTP server.
//!
//! `GET /health` is public. `GET /tools` and `POST /tools/{name}` sit behind
//! the bearer gate.

mod middleware;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tmdbgw_api::auth::BearerAuth;
use tmdbgw_api::tmdb::TmdbApi;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use self::middleware::{error_response, require_bearer, with_http_layers};
use self::tools::{TOOL_NAMES, ToolCallError, call_tool};

/// Shared state of every handler.
pub struct AppState<T> {
    api: Arc<T>,
    auth: Arc<BearerAuth>,
    shutdown: CancellationToken,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            auth: Arc::clone(&self.auth),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T> AppState<T> {
    /// Creates the state. Tool calls are cancelled when `shutdown` is.
    #[must_use]
    pub fn new(api: Arc<T>, auth: BearerAuth, shutdown: CancellationToken) -> Self {
        Self {
            api,
            auth: Arc::new(auth),
            shutdown,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct ToolList {
    tools: &'static [&'static str],
}

/// Builds the application router.
pub fn router<T>(state: AppState<T>) -> Router
where
    T: TmdbApi + Send + Sync + 'static,
{
    let protected = Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(invoke_tool::<T>))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            require_bearer,
        ));

    with_http_layers(
        Router::new()
            .route("/health", get(health))
            .merge(protected)
            .with_state(state),
    )
}

/// Serves `app` on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

async fn list_tools() -> Json<ToolList> {
    Json(ToolList { tools: &TOOL_NAMES })
}

async fn invoke_tool<T>(
    State(state): State<AppState<T>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response
where
    T: TmdbApi + Send + Sync + 'static,
{
    let args = if body.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice(&body) {
            Ok(args) => args,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_arguments",
                    &format!("request body is not valid JSON: {err}"),
                );
            }
        }
    };

    let cancel = state.shutdown.child_token();
    match call_tool(state.api.as_ref(), &name, args, &cancel).await {
        Ok(response) => Json(response).into_response(),
        Err(err @ ToolCallError::UnknownTool(_)) => {
            error_response(StatusCode::NOT_FOUND, "unknown_tool", &err.to_string())
        }
        Err(err @ ToolCallError::InvalidArguments(_)) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_arguments", &err.to_string())
        }
    }
}
