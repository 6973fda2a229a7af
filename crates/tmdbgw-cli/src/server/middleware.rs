//! Bearer authentication, panic recovery and access logging.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tmdbgw_api::auth::{AuthDecision, BearerAuth, UNAUTHORIZED_MESSAGE};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{MakeSpan, OnResponse, TraceLayer};
use tracing::Span;

/// JSON body of every non-envelope error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    /// Short machine-readable code.
    pub error: &'a str,
    /// Human-readable detail.
    pub message: &'a str,
}

/// Builds a JSON error response.
pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

/// Rejects requests without a valid `Authorization: Bearer` header.
///
/// Every denial gets the same 401 body regardless of the reason.
pub async fn require_bearer(
    State(auth): State<Arc<BearerAuth>>,
    request: Request,
    next: Next,
) -> Response {
    // A header that is not visible ASCII still counts as present
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    match auth.authorize(header) {
        AuthDecision::Allowed => next.run(request).await,
        AuthDecision::Denied(_) => {
            error_response(StatusCode::UNAUTHORIZED, "unauthorized", UNAUTHORIZED_MESSAGE)
        }
    }
}

/// Wraps `router` so every request is logged and handler panics become a
/// JSON 500 instead of a dropped connection.
pub fn with_http_layers(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(panic_response)).layer(
        TraceLayer::new_for_http()
            .make_span_with(RequestSpan)
            .on_response(AccessLog),
    )
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Panic recovered");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Request span carrying method and path.
#[derive(Debug, Clone, Copy)]
struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// One info event per finished request.
#[derive(Debug, Clone, Copy)]
struct AccessLog;

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, response: &axum::http::Response<B>, latency: Duration, _span: &Span) {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "HTTP request"
        );
    }
}
