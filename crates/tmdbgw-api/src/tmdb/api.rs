//! `TmdbApi` trait definition.
#![allow(clippy::future_not_send)]

use tokio_util::sync::CancellationToken;

use super::error::TmdbError;
use super::executor::RequestOutcome;
use super::params::{DiscoverFilters, MediaKind, SearchParams, TimeWindow, TitleKind};
use super::types::{Details, MediaSummary, PagedResponse, SearchResult};

/// TMDB API trait.
///
/// Abstracts API operations for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
///
/// Every operation validates its parameters before touching the network,
/// passes the shared rate governor for each attempt and observes `cancel`.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(TmdbApi: Send)]
pub trait LocalTmdbApi {
    /// Searches movies, TV series and people (`search/multi`).
    ///
    /// A 404 yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Validation`] for an empty or over-long query,
    /// [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn search(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<SearchResult>, TmdbError>;

    /// Fetches details of a movie, TV series or person.
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Validation`] for a non-positive id,
    /// [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn get_details(
        &self,
        kind: MediaKind,
        id: i64,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RequestOutcome<Details>, TmdbError>;

    /// Discovers movies or TV series by filters.
    ///
    /// A 404 yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Validation`] for out-of-range ratings,
    /// [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn discover(
        &self,
        kind: TitleKind,
        filters: &DiscoverFilters,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError>;

    /// Lists trending items for a time window.
    ///
    /// A 404 yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn trending(
        &self,
        kind: MediaKind,
        window: TimeWindow,
        page: Option<i64>,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError>;

    /// Lists recommendations for a movie or TV series.
    ///
    /// A 404 yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Validation`] for a non-positive id,
    /// [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn recommendations(
        &self,
        kind: TitleKind,
        id: i64,
        page: Option<i64>,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError>;

    /// Checks connectivity and the API key (`configuration`).
    ///
    /// # Errors
    ///
    /// Returns [`TmdbError::Cancelled`] or a terminal [`TmdbError::Upstream`].
    async fn ping(&self, cancel: &CancellationToken) -> Result<(), TmdbError>;
}
