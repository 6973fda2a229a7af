//! Typed TMDB errors and the upstream response classifier.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use super::types::TmdbErrorResponse;

/// Stable category of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 401: the API key was rejected.
    Authentication,
    /// 404: the resource does not exist.
    NotFound,
    /// 429: the upstream rate limit was hit.
    RateLimited,
    /// 500, 502, 503.
    ServerError,
    /// Transport failure (connect, TLS, DNS, timeout, body read).
    NetworkError,
    /// A success response whose body could not be decoded.
    ParsingError,
    /// Any other status.
    Unknown,
}

impl ErrorCategory {
    /// Returns the category as a stable snake-case string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limit",
            Self::ServerError => "server_error",
            Self::NetworkError => "network_error",
            Self::ParsingError => "parsing_error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified upstream failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct UpstreamError {
    /// Failure category.
    pub category: ErrorCategory,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Upstream status message or a synthesized one.
    pub message: String,
    /// Whether re-attempting may succeed.
    pub retryable: bool,
    /// `Retry-After` hint from a 429 response. Informational only.
    pub retry_after: Option<Duration>,
}

impl UpstreamError {
    /// Transport-level failure. Always retryable.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::NetworkError,
            status: None,
            message: message.into(),
            retryable: true,
            retry_after: None,
        }
    }

    /// Undecodable success body. Never retryable.
    #[must_use]
    pub fn parsing(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::ParsingError,
            status: None,
            message: message.into(),
            retryable: false,
            retry_after: None,
        }
    }

    const fn fixed(category: ErrorCategory, status: u16, message: String, retryable: bool) -> Self {
        Self {
            category,
            status: Some(status),
            message,
            retryable,
            retry_after: None,
        }
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.category, self.status) {
            (ErrorCategory::Unknown, Some(status)) => {
                write!(f, "TMDB API error {status}: {}", self.message)
            }
            (category, Some(status)) => {
                write!(f, "TMDB API error [{category}] {status}: {}", self.message)
            }
            (category, None) => write!(f, "TMDB API error [{category}]: {}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Local parameter check failure. Raised before any network call.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum ValidationError {
    /// The search query is empty.
    EmptyQuery,
    /// The search query exceeds `max` characters.
    QueryTooLong {
        /// Limit in characters.
        max: usize,
        /// Actual length in characters.
        actual: usize,
    },
    /// A resource id is not positive.
    InvalidId {
        /// Resource kind the id refers to.
        kind: &'static str,
        /// The rejected id.
        id: i64,
    },
    /// A rating bound is outside `[0, 10]`.
    RatingOutOfRange {
        /// Filter name (`vote_average.gte` or `vote_average.lte`).
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A media kind literal is not accepted by the operation.
    InvalidMediaKind {
        /// The rejected literal.
        value: String,
        /// Accepted literals.
        expected: &'static str,
    },
    /// A trending time window literal is not `day` or `week`.
    InvalidTimeWindow(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "query parameter is required"),
            Self::QueryTooLong { max, actual } => write!(
                f,
                "query parameter is too long: maximum length is {max} characters, got {actual}"
            ),
            Self::InvalidId { kind, id } => {
                write!(f, "invalid {kind} ID: {id}, must be greater than 0")
            }
            Self::RatingOutOfRange { field, value } => {
                write!(f, "{field} must be between 0 and 10, got {value}")
            }
            Self::InvalidMediaKind { value, expected } => {
                write!(f, "invalid media_type: {value}, must be {expected}")
            }
            Self::InvalidTimeWindow(value) => {
                write!(f, "invalid time_window: {value}, must be day or week")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error returned by every typed TMDB operation.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum TmdbError {
    /// Parameters were rejected locally. No request was made.
    Validation(ValidationError),
    /// The caller cancelled while waiting or in flight.
    Cancelled,
    /// The upstream failed and retries (if any) were exhausted.
    Upstream(UpstreamError),
}

impl TmdbError {
    /// Upstream category, if this is an upstream failure.
    #[must_use]
    pub const fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Upstream(err) => Some(err.category),
            Self::Validation(_) | Self::Cancelled => None,
        }
    }
}

impl std::fmt::Display for TmdbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid parameters: {err}"),
            Self::Cancelled => write!(f, "request cancelled"),
            Self::Upstream(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TmdbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Upstream(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

impl From<ValidationError> for TmdbError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<UpstreamError> for TmdbError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

impl From<super::rate_limiter::Cancelled> for TmdbError {
    fn from(_: super::rate_limiter::Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Classifies a non-2xx upstream response.
///
/// Pure: the same `(status, headers, body)` always yields the same error.
/// Callers only invoke this after deciding the response is not a success.
#[must_use]
pub fn classify(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> UpstreamError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED => UpstreamError::fixed(
            ErrorCategory::Authentication,
            code,
            String::from("invalid or missing credentials"),
            false,
        ),
        StatusCode::NOT_FOUND => UpstreamError::fixed(
            ErrorCategory::NotFound,
            code,
            String::from("resource not found"),
            false,
        ),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = parse_retry_after(headers);
            let message = retry_after.map_or_else(
                || String::from("rate limit exceeded"),
                |wait| {
                    format!(
                        "rate limit exceeded, retry after {} seconds",
                        wait.as_secs()
                    )
                },
            );
            UpstreamError {
                retry_after,
                ..UpstreamError::fixed(ErrorCategory::RateLimited, code, message, true)
            }
        }
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => UpstreamError::fixed(
            ErrorCategory::ServerError,
            code,
            String::from("TMDB API server error"),
            true,
        ),
        _ => {
            let message = serde_json::from_slice::<TmdbErrorResponse>(body)
                .ok()
                .map(|parsed| parsed.status_message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| status_line(status));
            UpstreamError::fixed(ErrorCategory::Unknown, code, message, false)
        }
    }
}

/// Reads an integer `Retry-After` (seconds). HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// `HTTP 418: I'm a teapot`.
fn status_line(status: StatusCode) -> String {
    status.canonical_reason().map_or_else(
        || format!("HTTP {}", status.as_u16()),
        |reason| format!("HTTP {}: {reason}", status.as_u16()),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use reqwest::header::HeaderValue;

    use super::*;

    fn classify_code(code: u16, headers: &HeaderMap, body: &[u8]) -> UpstreamError {
        classify(StatusCode::from_u16(code).unwrap(), headers, body)
    }

    fn retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_classify_401_is_terminal_authentication() {
        // Arrange
        let body = br#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#;

        // Act
        let err = classify_code(401, &HeaderMap::new(), body);

        // Assert
        assert_eq!(err.category, ErrorCategory::Authentication);
        assert!(!err.retryable);
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "invalid or missing credentials");
    }

    #[test]
    fn test_classify_404_is_not_found() {
        // Arrange & Act
        let err = classify_code(404, &HeaderMap::new(), b"");

        // Assert
        assert_eq!(err.category, ErrorCategory::NotFound);
        assert!(!err.retryable);
    }

    #[test]
    fn test_classify_429_with_retry_after_records_hint() {
        // Arrange
        let headers = retry_after("7");

        // Act
        let err = classify_code(429, &headers, b"");

        // Assert
        assert_eq!(err.category, ErrorCategory::RateLimited);
        assert!(err.retryable);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
        assert!(err.message.contains("retry after 7 seconds"));
    }

    #[test]
    fn test_classify_429_without_retry_after() {
        // Arrange & Act
        let err = classify_code(429, &HeaderMap::new(), b"");

        // Assert
        assert_eq!(err.category, ErrorCategory::RateLimited);
        assert!(err.retryable);
        assert_eq!(err.retry_after, None);
        assert_eq!(err.message, "rate limit exceeded");
    }

    #[test]
    fn test_classify_429_with_http_date_retry_after_is_generic() {
        // Arrange
        let headers = retry_after("Wed, 21 Oct 2015 07:28:00 GMT");

        // Act
        let err = classify_code(429, &headers, b"");

        // Assert
        assert_eq!(err.retry_after, None);
        assert_eq!(err.message, "rate limit exceeded");
    }

    #[test]
    fn test_classify_5xx_is_retryable_server_error() {
        for code in [500, 502, 503] {
            // Arrange & Act
            let err = classify_code(code, &HeaderMap::new(), b"<html>oops</html>");

            // Assert
            assert_eq!(err.category, ErrorCategory::ServerError, "code {code}");
            assert!(err.retryable, "code {code}");
            assert_eq!(err.status, Some(code));
        }
    }

    #[test]
    fn test_classify_504_is_unknown() {
        // Arrange & Act
        let err = classify_code(504, &HeaderMap::new(), b"");

        // Assert
        assert_eq!(err.category, ErrorCategory::Unknown);
        assert!(!err.retryable);
    }

    #[test]
    fn test_classify_unmapped_with_json_body_uses_status_message() {
        // Arrange
        let body = br#"{"status_code":34,"status_message":"I refuse to brew coffee.","success":false}"#;

        // Act
        let err = classify_code(418, &HeaderMap::new(), body);

        // Assert
        assert_eq!(err.category, ErrorCategory::Unknown);
        assert!(!err.retryable);
        assert_eq!(err.message, "I refuse to brew coffee.");
    }

    #[test]
    fn test_classify_unmapped_without_json_body_synthesizes_message() {
        // Arrange & Act
        let empty = classify_code(418, &HeaderMap::new(), b"");
        let garbage = classify_code(418, &HeaderMap::new(), b"not json");

        // Assert
        assert_eq!(empty.category, ErrorCategory::Unknown);
        assert_eq!(empty.message, "HTTP 418: I'm a teapot");
        assert_eq!(garbage.message, "HTTP 418: I'm a teapot");
        assert!(!garbage.retryable);
    }

    #[test]
    fn test_classify_is_deterministic() {
        // Arrange
        let headers = retry_after("3");
        let cases: [(u16, &[u8]); 6] = [
            (401, b""),
            (404, b"{}"),
            (429, b""),
            (500, b""),
            (418, br#"{"status_message":"x"}"#),
            (418, b""),
        ];

        for (code, body) in cases {
            // Act
            let first = classify_code(code, &headers, body);
            let second = classify_code(code, &headers, body);

            // Assert
            assert_eq!(first, second, "code {code}");
        }
    }

    #[test]
    fn test_display_formats() {
        // Arrange
        let server = classify_code(503, &HeaderMap::new(), b"");
        let unknown = classify_code(418, &HeaderMap::new(), b"");
        let network = UpstreamError::network("connection refused");

        // Act & Assert
        assert_eq!(
            server.to_string(),
            "TMDB API error [server_error] 503: TMDB API server error"
        );
        assert_eq!(
            unknown.to_string(),
            "TMDB API error 418: HTTP 418: I'm a teapot"
        );
        assert_eq!(
            network.to_string(),
            "TMDB API error [network_error]: connection refused"
        );
    }

    #[test]
    fn test_validation_message_names_limit() {
        // Arrange
        let err = TmdbError::from(ValidationError::QueryTooLong {
            max: 500,
            actual: 501,
        });

        // Act
        let message = err.to_string();

        // Assert
        assert!(message.contains("500"));
        assert_eq!(err.category(), None);
    }
}
