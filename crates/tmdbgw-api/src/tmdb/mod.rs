//! TMDB API client module.
//!
//! Rate-governed, retrying access to the TMDB v3 REST API with a typed
//! error taxonomy and typed results.

mod api;
mod client;
mod error;
mod executor;
mod params;
mod rate_limiter;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalTmdbApi, TmdbApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{DEFAULT_LANGUAGE, DEFAULT_RATE_LIMIT, TmdbClient, TmdbClientBuilder};
pub use error::{ErrorCategory, TmdbError, UpstreamError, ValidationError, classify};
pub use executor::{
    ExecutorStats, RequestExecutor, RequestOutcome, RetryDecision, RetryPolicy, UpstreamRequest,
    default_retryable_status,
};
pub use params::{
    DEFAULT_SORT_BY, DiscoverFilters, MAX_QUERY_LENGTH, MediaKind, SearchParams, TimeWindow,
    TitleKind, normalize_page, validate_id,
};
pub use rate_limiter::{Cancelled, RATE_WINDOW, RateGovernor};
#[allow(clippy::module_name_repetitions)]
pub use types::{
    CastMember, CombinedCredits, CrewMember, Credits, Details, Genre, MediaSummary, MovieDetails,
    PagedResponse, PersonDetails, SearchResult, TmdbErrorResponse, TvDetails, Video, Videos,
};
