//! Tool dispatch: JSON arguments in, a JSON envelope out.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tmdbgw_api::tmdb::{
    DiscoverFilters, ErrorCategory, MediaKind, RequestOutcome, SearchParams, TimeWindow,
    TitleKind, TmdbApi, TmdbError,
};
use tokio_util::sync::CancellationToken;

/// Tools served under `/tools/{name}`.
pub const TOOL_NAMES: [&str; 6] = [
    "search",
    "get_details",
    "discover_movies",
    "discover_tv",
    "get_trending",
    "get_recommendations",
];

/// Result envelope returned for every known tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Whether `content` is an error message.
    pub is_error: bool,
    /// Payload on success, a message string on failure.
    pub content: Value,
}

impl ToolResponse {
    fn success(content: Value) -> Self {
        Self {
            is_error: false,
            content,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            content: Value::String(message.into()),
        }
    }
}

/// A tool call rejected before it reached the TMDB client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// No tool with this name.
    UnknownTool(String),
    /// Arguments did not match the tool's schema.
    InvalidArguments(String),
}

impl std::fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::InvalidArguments(reason) => write!(f, "failed to parse parameters: {reason}"),
        }
    }
}

impl std::error::Error for ToolCallError {}

#[derive(Debug, Deserialize)]
struct DetailsArgs {
    media_type: String,
    id: i64,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrendingArgs {
    media_type: String,
    time_window: String,
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendationsArgs {
    media_type: String,
    id: i64,
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    language: Option<String>,
}

enum Failure {
    Rejected(ToolCallError),
    Tmdb(TmdbError, &'static str),
    Missing(&'static str),
    Encode(serde_json::Error),
}

impl From<ToolCallError> for Failure {
    fn from(err: ToolCallError) -> Self {
        Self::Rejected(err)
    }
}

/// Runs tool `name` against `api`.
///
/// Upstream and validation failures are reported inside the envelope with
/// a user-facing message.
///
/// # Errors
///
/// Returns [`ToolCallError`] for an unknown tool or malformed arguments.
pub async fn call_tool<T>(
    api: &T,
    name: &str,
    args: Value,
    cancel: &CancellationToken,
) -> Result<ToolResponse, ToolCallError>
where
    T: TmdbApi + Sync,
{
    let start = Instant::now();
    let response = match dispatch(api, name, args, cancel).await {
        Ok(content) => ToolResponse::success(content),
        Err(Failure::Rejected(err)) => {
            tracing::warn!(tool = name, error = %err, "Tool call rejected");
            return Err(err);
        }
        Err(Failure::Tmdb(err, resource)) => {
            tracing::warn!(tool = name, error = %err, "Tool call failed");
            ToolResponse::failure(user_message(&err, resource))
        }
        Err(Failure::Missing(resource)) => {
            ToolResponse::failure(format!("the requested {resource} was not found"))
        }
        Err(Failure::Encode(err)) => {
            tracing::error!(tool = name, error = %err, "Failed to encode tool result");
            ToolResponse::failure("failed to process TMDB API response. Please try again")
        }
    };
    tracing::info!(
        tool = name,
        is_error = response.is_error,
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Tool call finished"
    );
    Ok(response)
}

async fn dispatch<T>(
    api: &T,
    name: &str,
    args: Value,
    cancel: &CancellationToken,
) -> Result<Value, Failure>
where
    T: TmdbApi + Sync,
{
    match name {
        "search" => {
            let params: SearchParams = parse_args(args)?;
            let page = api
                .search(&params, cancel)
                .await
                .map_err(|err| Failure::Tmdb(err, "search results"))?;
            encode(&page)
        }
        "get_details" => {
            let args: DetailsArgs = parse_args(args)?;
            let kind: MediaKind = parse_kind(&args.media_type, "content")?;
            let resource = details_resource(kind);
            let outcome = api
                .get_details(kind, args.id, args.language.as_deref(), cancel)
                .await
                .map_err(|err| Failure::Tmdb(err, resource))?;
            match outcome {
                RequestOutcome::Found(details) => encode(&details),
                RequestOutcome::NotFound => {
                    tracing::warn!(media_type = %kind, id = args.id, "Resource not found");
                    Err(Failure::Missing(resource))
                }
            }
        }
        "discover_movies" | "discover_tv" => {
            let (kind, resource) = if name == "discover_movies" {
                (TitleKind::Movie, "movies")
            } else {
                (TitleKind::Tv, "TV shows")
            };
            let filters: DiscoverFilters = parse_args(args)?;
            let page = api
                .discover(kind, &filters, cancel)
                .await
                .map_err(|err| Failure::Tmdb(err, resource))?;
            encode(&page)
        }
        "get_trending" => {
            let args: TrendingArgs = parse_args(args)?;
            let kind: MediaKind = parse_kind(&args.media_type, "content")?;
            let window: TimeWindow = parse_kind(&args.time_window, "content")?;
            let page = api
                .trending(kind, window, args.page, args.language.as_deref(), cancel)
                .await
                .map_err(|err| Failure::Tmdb(err, "content"))?;
            encode(&page)
        }
        "get_recommendations" => {
            let args: RecommendationsArgs = parse_args(args)?;
            let kind: TitleKind = parse_kind(&args.media_type, "content")?;
            let page = api
                .recommendations(kind, args.id, args.page, args.language.as_deref(), cancel)
                .await
                .map_err(|err| Failure::Tmdb(err, "content"))?;
            encode(&page)
        }
        other => Err(ToolCallError::UnknownTool(other.to_owned()).into()),
    }
}

fn parse_args<A: DeserializeOwned>(args: Value) -> Result<A, Failure> {
    serde_json::from_value(args)
        .map_err(|err| ToolCallError::InvalidArguments(err.to_string()).into())
}

fn parse_kind<K>(value: &str, resource: &'static str) -> Result<K, Failure>
where
    K: std::str::FromStr<Err = tmdbgw_api::tmdb::ValidationError>,
{
    value
        .parse()
        .map_err(|err: tmdbgw_api::tmdb::ValidationError| Failure::Tmdb(err.into(), resource))
}

fn encode<S: Serialize>(value: &S) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(Failure::Encode)
}

const fn details_resource(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "movie",
        MediaKind::Tv => "TV show",
        MediaKind::Person => "person",
    }
}

/// Maps a client error to the message shown to tool callers.
#[must_use]
pub fn user_message(err: &TmdbError, resource: &str) -> String {
    match err {
        TmdbError::Validation(validation) => validation.to_string(),
        TmdbError::Cancelled => String::from("the request was cancelled"),
        TmdbError::Upstream(upstream) => match upstream.category {
            ErrorCategory::Authentication => String::from(
                "authentication failed. Please check your TMDB API Key configuration",
            ),
            ErrorCategory::NotFound => format!("the requested {resource} was not found"),
            ErrorCategory::RateLimited => String::from(
                "rate limit exceeded. The service will automatically retry shortly",
            ),
            ErrorCategory::NetworkError => String::from(
                "request timed out. Please try again or check your network connection",
            ),
            ErrorCategory::ServerError => String::from(
                "TMDB service is temporarily unavailable. Please try again later",
            ),
            ErrorCategory::ParsingError => {
                String::from("failed to process TMDB API response. Please try again")
            }
            ErrorCategory::Unknown => format!("failed to fetch {resource}: {upstream}"),
        },
    }
}
