//! Retrying request executor.
//!
//! Every upstream call runs through the same ordered stages:
//! rate gate, auth/language parameter injection, send, classification of
//! non-success responses and the retry decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use super::error::{ErrorCategory, TmdbError, UpstreamError, classify};
use super::rate_limiter::RateGovernor;

/// Attempts slower than this are logged at warn level.
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

/// Statuses retried by [`RetryPolicy::default`].
#[must_use]
pub const fn default_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503)
}

/// Immutable retry configuration.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::module_name_repetitions)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    retryable_status: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    /// 4 attempts (3 retries), 1s base backoff capped at 10s.
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            retryable_status: default_retryable_status,
        }
    }
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `backoff`, then attempt again.
    Retry {
        /// Delay before the next attempt.
        backoff: Duration,
    },
    /// Surface the error.
    GiveUp,
}

impl RetryPolicy {
    /// Creates a policy. `max_backoff` is raised to `base_backoff` if lower.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero.
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Result<Self> {
        if max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        Ok(Self {
            max_attempts,
            base_backoff,
            max_backoff: max_backoff.max(base_backoff),
            retryable_status: default_retryable_status,
        })
    }

    /// Replaces the retryable-status predicate.
    #[must_use]
    pub const fn with_retryable_status(mut self, predicate: fn(u16) -> bool) -> Self {
        self.retryable_status = predicate;
        self
    }

    /// Maximum attempts per logical call, first attempt included.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based):
    /// `min(max_backoff, base_backoff * 2^(attempt - 1))`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1_u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Decides what follows failed attempt `attempt` (1-based).
    #[must_use]
    pub fn decide(&self, attempt: u32, err: &UpstreamError) -> RetryDecision {
        let retryable = match err.status {
            Some(status) => err.retryable && (self.retryable_status)(status),
            None => err.retryable,
        };
        if !retryable || attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            backoff: self.backoff(attempt),
        }
    }
}

/// Result of one logical call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome<T> {
    /// The upstream returned the resource.
    Found(T),
    /// The upstream answered 404.
    NotFound,
}

impl<T> RequestOutcome<T> {
    /// Maps the found payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            Self::Found(value) => RequestOutcome::Found(f(value)),
            Self::NotFound => RequestOutcome::NotFound,
        }
    }

    /// Converts into an `Option`, `None` for not found.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

/// A GET request relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Path relative to the base URL, e.g. `search/multi`.
    pub path: String,
    /// Query parameters other than `api_key` and `language`.
    pub query: Vec<(&'static str, String)>,
    /// Per-call language. Empty or `None` falls back to the default.
    pub language: Option<String>,
}

impl UpstreamRequest {
    /// Creates a request for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            language: None,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Appends several query parameters.
    #[must_use]
    pub fn params(mut self, params: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        self.query.extend(params);
        self
    }

    /// Sets the per-call language.
    #[must_use]
    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(String::from);
        self
    }
}

/// What one attempt produced.
#[derive(Debug)]
enum Attempt {
    Success(Vec<u8>),
    Absent,
    Failed(UpstreamError),
}

impl Attempt {
    const fn outcome(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Absent => "not_found",
            Self::Failed(_) => "error",
        }
    }
}

/// Counters of upstream traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// HTTP attempts sent, retries included.
    pub attempts: u64,
    /// Retries scheduled.
    pub retries: u64,
}

/// Sends GET requests through the rate governor and retry policy.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct RequestExecutor {
    http_client: Client,
    base_url: Url,
    api_key: String,
    default_language: String,
    governor: Arc<RateGovernor>,
    policy: RetryPolicy,
    attempts: AtomicU64,
    retries: AtomicU64,
}

impl RequestExecutor {
    /// Creates an executor. `base_url` must end with `/`.
    pub(crate) fn new(
        http_client: Client,
        base_url: Url,
        api_key: String,
        default_language: String,
        governor: Arc<RateGovernor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
            default_language,
            governor,
            policy,
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Traffic counters since creation.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    /// Shared rate governor.
    #[must_use]
    pub const fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Retry policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs one logical call, retrying per the policy.
    ///
    /// Returns the raw success body or [`RequestOutcome::NotFound`].
    ///
    /// # Errors
    ///
    /// - [`TmdbError::Cancelled`] if `cancel` fires at any suspension point.
    /// - [`TmdbError::Upstream`] once the error is terminal or attempts are
    ///   exhausted.
    #[instrument(skip_all, fields(path = %request.path))]
    pub async fn execute(
        &self,
        request: &UpstreamRequest,
        cancel: &CancellationToken,
    ) -> Result<RequestOutcome<Vec<u8>>, TmdbError> {
        let url = self.inject_auth_params(request)?;

        let mut attempt: u32 = 1;
        loop {
            self.rate_gate(cancel).await?;

            self.attempts.fetch_add(1, Ordering::Relaxed);
            let started = Instant::now();
            let result = self.send(url.clone(), cancel).await?;
            log_attempt(&request.path, attempt, &result, started.elapsed());

            let err = match result {
                Attempt::Success(body) => return Ok(RequestOutcome::Found(body)),
                Attempt::Absent => return Ok(RequestOutcome::NotFound),
                Attempt::Failed(err) => err,
            };

            match self.retry_decision(attempt, &err) {
                RetryDecision::GiveUp => return Err(TmdbError::Upstream(err)),
                RetryDecision::Retry { backoff } => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(TmdbError::Cancelled),
                        () = tokio::time::sleep(backoff) => {}
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn rate_gate(&self, cancel: &CancellationToken) -> Result<(), TmdbError> {
        self.governor.acquire(cancel).await?;
        Ok(())
    }

    /// Resolves the path and adds `api_key`, `language` and the request query.
    fn inject_auth_params(&self, request: &UpstreamRequest) -> Result<Url, TmdbError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| UpstreamError {
                category: ErrorCategory::Unknown,
                status: None,
                message: format!("invalid request path {}: {e}", request.path),
                retryable: false,
                retry_after: None,
            })?;

        let language = request
            .language
            .as_deref()
            .filter(|lang| !lang.is_empty())
            .unwrap_or(&self.default_language);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("language", language);
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Sends one attempt. Only cancellation is returned as `Err`.
    async fn send(&self, url: Url, cancel: &CancellationToken) -> Result<Attempt, TmdbError> {
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TmdbError::Cancelled),
            sent = self.http_client.get(url).send() => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Failed(transport_error(&e))),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TmdbError::Cancelled),
            body = response.bytes() => body,
        };
        match body {
            Ok(body) => Ok(classify_on_error(status, &headers, &body)),
            Err(e) => Ok(Attempt::Failed(transport_error(&e))),
        }
    }

    fn retry_decision(&self, attempt: u32, err: &UpstreamError) -> RetryDecision {
        let decision = self.policy.decide(attempt, err);
        if let RetryDecision::Retry { backoff } = decision {
            self.retries.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                attempt,
                max_attempts = self.policy.max_attempts,
                previous_status = err.status,
                category = %err.category,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                "Retrying TMDB API request"
            );
        }
        decision
    }
}

fn classify_on_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Attempt {
    if status.is_success() {
        return Attempt::Success(body.to_vec());
    }
    let err = classify(status, headers, body);
    if err.category == ErrorCategory::NotFound {
        Attempt::Absent
    } else {
        Attempt::Failed(err)
    }
}

fn transport_error(err: &reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::network(format!("request timed out: {err}"))
    } else {
        UpstreamError::network(err.to_string())
    }
}

fn log_attempt(path: &str, attempt: u32, result: &Attempt, elapsed: Duration) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let (status, category) = match result {
        Attempt::Success(_) => (None, None),
        Attempt::Absent => (Some(404_u16), Some(ErrorCategory::NotFound.as_str())),
        Attempt::Failed(err) => (err.status, Some(err.category.as_str())),
    };
    tracing::debug!(
        path,
        attempt,
        outcome = result.outcome(),
        status,
        category,
        elapsed_ms,
        "TMDB API attempt"
    );
    if elapsed > SLOW_REQUEST_THRESHOLD {
        tracing::warn!(path, attempt, elapsed_ms, "Slow TMDB API request");
    }
}
