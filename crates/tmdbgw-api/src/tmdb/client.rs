//! `TmdbClient` - TMDB API client implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use super::api::TmdbApi;
use super::error::{ErrorCategory, TmdbError, UpstreamError};
use super::executor::{ExecutorStats, RequestExecutor, RequestOutcome, RetryPolicy, UpstreamRequest};
use super::params::{
    DiscoverFilters, MediaKind, SearchParams, TimeWindow, TitleKind, normalize_page, validate_id,
};
use super::rate_limiter::{RATE_WINDOW, RateGovernor};
use super::types::{
    Details, MediaSummary, MovieDetails, PagedResponse, PersonDetails, SearchResult, TvDetails,
};

/// Default base URL for TMDB API v3.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";

/// Default response language.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default requests allowed per [`RATE_WINDOW`].
pub const DEFAULT_RATE_LIMIT: u32 = 40;

/// Per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TMDB API client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClient {
    /// Rate-gated, retrying HTTP executor.
    executor: RequestExecutor,
}

/// Builder for `TmdbClient`.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClientBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    user_agent: Option<String>,
    language: Option<String>,
    rate_limit: Option<u32>,
    governor: Option<Arc<RateGovernor>>,
    retry_policy: Option<RetryPolicy>,
    timeout: Option<Duration>,
}

impl TmdbClientBuilder {
    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the TMDB API key (required).
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the User-Agent (default: `tmdbgw/<version>`).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the default response language (default: `en-US`).
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the allowed requests per 10 seconds (default: 40).
    #[must_use]
    pub const fn rate_limit(mut self, requests: u32) -> Self {
        self.rate_limit = Some(requests);
        self
    }

    /// Shares an existing governor instead of creating one from `rate_limit`.
    #[must_use]
    pub fn governor(mut self, governor: Arc<RateGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Overrides the per-request timeout (default: 10s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `api_key` is not set or empty.
    /// - `rate_limit` is zero.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<TmdbClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .context("api_key is required")?;

        let mut base_url = if let Some(url) = self.base_url {
            url
        } else {
            let result = Url::parse(DEFAULT_BASE_URL);
            result.context("invalid default base URL")?
        };
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let governor = match (self.governor, self.rate_limit) {
            (Some(governor), _) => governor,
            (None, Some(0)) => bail!("rate_limit must be greater than 0"),
            (None, limit) => Arc::new(RateGovernor::per_window(
                limit.unwrap_or(DEFAULT_RATE_LIMIT),
                RATE_WINDOW,
            )),
        };

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("tmdbgw/{}", env!("CARGO_PKG_VERSION")));
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        let language = self
            .language
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_LANGUAGE));

        tracing::debug!(base_url = %base_url, language = %language, "TMDB client initialized");

        Ok(TmdbClient {
            executor: RequestExecutor::new(
                http_client,
                base_url,
                api_key,
                language,
                governor,
                self.retry_policy.unwrap_or_default(),
            ),
        })
    }
}

impl TmdbClient {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> TmdbClientBuilder {
        TmdbClientBuilder::default()
    }

    /// Upstream attempt and retry counters.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Shared rate governor.
    #[must_use]
    pub const fn governor(&self) -> &Arc<RateGovernor> {
        self.executor.governor()
    }

    /// Fetches a list endpoint. A 404 yields an empty page.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        request: &UpstreamRequest,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<T>, TmdbError> {
        match self.executor.execute(request, cancel).await? {
            RequestOutcome::Found(body) => decode(&request.path, &body),
            RequestOutcome::NotFound => {
                tracing::info!(path = %request.path, "TMDB API returned 404, treating as empty");
                Ok(PagedResponse::empty(page))
            }
        }
    }
}

/// Decodes a success body. Failures are terminal parsing errors.
fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T, TmdbError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(path, error = %e, "Failed to decode TMDB API response");
        TmdbError::from(UpstreamError::parsing(format!(
            "failed to decode JSON response from {path}: {e}"
        )))
    })
}

impl TmdbApi for TmdbClient {
    #[instrument(skip_all)]
    async fn search(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<SearchResult>, TmdbError> {
        params.validate()?;
        let page = normalize_page(params.page);
        let request = UpstreamRequest::new("search/multi")
            .param("query", params.query.as_str())
            .param("page", page.to_string())
            .language(params.language.as_deref());

        let response: PagedResponse<SearchResult> =
            self.fetch_page(&request, page, cancel).await?;
        tracing::info!(
            results = response.results.len(),
            total_results = response.total_results,
            "Search completed"
        );
        Ok(response)
    }

    #[instrument(skip_all, fields(kind = %kind, id = id))]
    async fn get_details(
        &self,
        kind: MediaKind,
        id: i64,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RequestOutcome<Details>, TmdbError> {
        let id = validate_id(kind.as_str(), id)?;
        let append = match kind {
            MediaKind::Movie | MediaKind::Tv => "credits,videos",
            MediaKind::Person => "combined_credits",
        };
        let request = UpstreamRequest::new(format!("{kind}/{id}"))
            .param("append_to_response", append)
            .language(language);

        let body = match self.executor.execute(&request, cancel).await? {
            RequestOutcome::Found(body) => body,
            RequestOutcome::NotFound => {
                tracing::info!("TMDB resource not found");
                return Ok(RequestOutcome::NotFound);
            }
        };

        let details = match kind {
            MediaKind::Movie => Details::Movie(Box::new(decode::<MovieDetails>(
                &request.path,
                &body,
            )?)),
            MediaKind::Tv => Details::Tv(Box::new(decode::<TvDetails>(&request.path, &body)?)),
            MediaKind::Person => Details::Person(Box::new(decode::<PersonDetails>(
                &request.path,
                &body,
            )?)),
        };
        tracing::info!(name = details.display_name(), "Details fetched");
        Ok(RequestOutcome::Found(details))
    }

    #[instrument(skip_all, fields(kind = %kind))]
    async fn discover(
        &self,
        kind: TitleKind,
        filters: &DiscoverFilters,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError> {
        filters.validate()?;
        let page = normalize_page(filters.page);
        let request = UpstreamRequest::new(format!("discover/{kind}"))
            .params(filters.to_query(kind))
            .language(filters.language.as_deref());

        let response: PagedResponse<MediaSummary> =
            self.fetch_page(&request, page, cancel).await?;
        tracing::info!(
            results = response.results.len(),
            total_results = response.total_results,
            "Discover completed"
        );
        Ok(response)
    }

    #[instrument(skip_all, fields(kind = %kind, window = %window))]
    async fn trending(
        &self,
        kind: MediaKind,
        window: TimeWindow,
        page: Option<i64>,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError> {
        let page = normalize_page(page);
        let request = UpstreamRequest::new(format!("trending/{kind}/{window}"))
            .param("page", page.to_string())
            .language(language);

        self.fetch_page(&request, page, cancel).await
    }

    #[instrument(skip_all, fields(kind = %kind, id = id))]
    async fn recommendations(
        &self,
        kind: TitleKind,
        id: i64,
        page: Option<i64>,
        language: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PagedResponse<MediaSummary>, TmdbError> {
        let id = validate_id(kind.as_str(), id)?;
        let page = normalize_page(page);
        let request = UpstreamRequest::new(format!("{kind}/{id}/recommendations"))
            .param("page", page.to_string())
            .language(language);

        self.fetch_page(&request, page, cancel).await
    }

    #[instrument(skip_all)]
    async fn ping(&self, cancel: &CancellationToken) -> Result<(), TmdbError> {
        let request = UpstreamRequest::new("configuration");
        match self.executor.execute(&request, cancel).await? {
            RequestOutcome::Found(_) => {
                tracing::info!("TMDB API connection verified");
                Ok(())
            }
            RequestOutcome::NotFound => Err(TmdbError::Upstream(UpstreamError {
                category: ErrorCategory::NotFound,
                status: Some(404),
                message: String::from("configuration endpoint not found, check the base URL"),
                retryable: false,
                retry_after: None,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::tmdb::error::ValidationError;

    fn client_for(server: &MockServer) -> TmdbClient {
        TmdbClient::builder()
            .base_url(format!("{}/3/", server.uri()).parse().unwrap())
            .api_key("test-key")
            .rate_limit(1000)
            .retry_policy(
                RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(10))
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_api_key() {
        // Arrange & Act
        let missing = TmdbClient::builder().build();
        let empty = TmdbClient::builder().api_key("").build();

        // Assert
        assert!(missing.unwrap_err().to_string().contains("api_key is required"));
        assert!(empty.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_rate_limit() {
        // Arrange & Act
        let result = TmdbClient::builder().api_key("k").rate_limit(0).build();

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("rate_limit must be greater than 0")
        );
    }

    #[test]
    fn test_builder_defaults_rate_limit() {
        // Arrange & Act
        let client = TmdbClient::builder().api_key("k").build().unwrap();

        // Assert
        assert_eq!(client.governor().capacity(), DEFAULT_RATE_LIMIT);
        assert_eq!(
            client.governor().refill_interval(),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_base_url_without_trailing_slash_is_normalized() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(path("/3/configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = TmdbClient::builder()
            .base_url(format!("{}/3", mock_server.uri()).parse().unwrap())
            .api_key("k")
            .build()
            .unwrap();

        // Act
        let result = client.ping(&CancellationToken::new()).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(
                "User-Agent",
                concat!("tmdbgw/", env!("CARGO_PKG_VERSION")),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act & Assert (mock expect(1) verifies User-Agent header)
        client.ping(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_via_http() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/search_multi_inception.json");
        Mock::given(method("GET"))
            .and(path("/3/search/multi"))
            .and(query_param("query", "Inception"))
            .and(query_param("page", "1"))
            .and(query_param("language", "en-US"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let response = client
            .search(&SearchParams::new("Inception").page(0), &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].title.as_deref(), Some("Inception"));
    }

    #[tokio::test]
    async fn test_search_empty_query_makes_no_request() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);
        let available = client.governor().available().await;

        // Act
        let result = client
            .search(&SearchParams::new(""), &CancellationToken::new())
            .await;

        // Assert
        assert_eq!(
            result.unwrap_err(),
            TmdbError::Validation(ValidationError::EmptyQuery)
        );
        assert_eq!(client.stats().attempts, 0);
        assert_eq!(client.governor().available().await, available);
    }

    #[tokio::test]
    async fn test_search_too_long_query_names_limit() {
        // Arrange
        let mock_server = MockServer::start().await;
        let client = client_for(&mock_server);

        // Act
        let result = client
            .search(&SearchParams::new("x".repeat(501)), &CancellationToken::new())
            .await;

        // Assert
        let err = result.unwrap_err();
        assert!(matches!(err, TmdbError::Validation(_)));
        assert!(err.to_string().contains("500"));
        assert_eq!(client.stats().attempts, 0);
    }

    #[tokio::test]
    async fn test_search_404_is_empty() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let response = client
            .search(&SearchParams::new("nothing").page(3), &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(response, PagedResponse::empty(3));
    }

    #[tokio::test]
    async fn test_get_movie_details_appends_credits_and_videos() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/movie_details_27205.json");
        Mock::given(method("GET"))
            .and(path("/3/movie/27205"))
            .and(query_param("append_to_response", "credits,videos"))
            .and(query_param("language", "ja-JP"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let outcome = client
            .get_details(
                MediaKind::Movie,
                27_205,
                Some("ja-JP"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Assert
        let RequestOutcome::Found(Details::Movie(movie)) = outcome else {
            panic!("expected movie details");
        };
        assert_eq!(movie.title, "Inception");
        assert!(movie.credits.is_some());
    }

    #[tokio::test]
    async fn test_get_person_details_appends_combined_credits() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/person_details_6193.json");
        Mock::given(method("GET"))
            .and(path("/3/person/6193"))
            .and(query_param("append_to_response", "combined_credits"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let outcome = client
            .get_details(MediaKind::Person, 6193, None, &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        let details = outcome.into_option().unwrap();
        assert_eq!(details.id(), 6193);
        assert!(matches!(details, Details::Person(_)));
    }

    #[tokio::test]
    async fn test_get_details_404_is_sentinel() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/tv/999999999"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"status_code":34,"status_message":"The resource you requested could not be found.","success":false}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let outcome = client
            .get_details(MediaKind::Tv, 999_999_999, None, &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, RequestOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_get_details_invalid_id_makes_no_request() {
        // Arrange
        let mock_server = MockServer::start().await;
        let client = client_for(&mock_server);

        // Act
        let result = client
            .get_details(MediaKind::Movie, 0, None, &CancellationToken::new())
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(TmdbError::Validation(ValidationError::InvalidId { .. }))
        ));
        assert_eq!(client.stats().attempts, 0);
    }

    #[tokio::test]
    async fn test_discover_404_is_empty() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/discover/movie"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let response = client
            .discover(
                TitleKind::Movie,
                &DiscoverFilters::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Assert
        assert!(response.results.is_empty());
        assert_eq!(response.total_results, 0);
        assert_eq!(response.total_pages, 0);
    }

    #[tokio::test]
    async fn test_discover_tv_sends_filters() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/discover_movie.json");
        Mock::given(method("GET"))
            .and(path("/3/discover/tv"))
            .and(query_param("sort_by", "popularity.desc"))
            .and(query_param("first_air_date_year", "2008"))
            .and(query_param("vote_average.gte", "8.0"))
            .and(query_param("with_status", "Ended"))
            .and(query_param("language", "fr-FR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);
        let filters = DiscoverFilters {
            year: Some(2008),
            vote_average_gte: Some(8.0),
            with_status: Some(String::from("Ended")),
            language: Some(String::from("fr-FR")),
            ..DiscoverFilters::default()
        };

        // Act
        let response = client
            .discover(TitleKind::Tv, &filters, &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(response.total_results, 236);
    }

    #[tokio::test]
    async fn test_discover_invalid_rating_makes_no_request() {
        // Arrange
        let mock_server = MockServer::start().await;
        let client = client_for(&mock_server);
        let filters = DiscoverFilters {
            vote_average_gte: Some(-1.0),
            ..DiscoverFilters::default()
        };

        // Act
        let result = client
            .discover(TitleKind::Movie, &filters, &CancellationToken::new())
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(TmdbError::Validation(
                ValidationError::RatingOutOfRange { .. }
            ))
        ));
        assert_eq!(client.stats().attempts, 0);
    }

    #[tokio::test]
    async fn test_trending_via_http() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/trending_movie_week.json");
        Mock::given(method("GET"))
            .and(path("/3/trending/movie/week"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let response = client
            .trending(
                MediaKind::Movie,
                TimeWindow::Week,
                Some(2),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(response.results[0].media_type.as_deref(), Some("movie"));
    }

    #[tokio::test]
    async fn test_recommendations_via_http() {
        // Arrange
        let mock_server = MockServer::start().await;
        let json_body =
            include_str!("../../../../fixtures/tmdb/recommendations_movie_27205.json");
        Mock::given(method("GET"))
            .and(path("/3/movie/27205/recommendations"))
            .respond_with(ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let response = client
            .recommendations(
                TitleKind::Movie,
                27_205,
                None,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(response.results[0].title.as_deref(), Some("Interstellar"));
        assert_eq!(response.total_results, 40);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_terminal_parsing_error() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let result = client
            .trending(
                MediaKind::Tv,
                TimeWindow::Day,
                None,
                None,
                &CancellationToken::new(),
            )
            .await;

        // Assert
        assert_eq!(
            result.unwrap_err().category(),
            Some(ErrorCategory::ParsingError)
        );
        assert_eq!(client.stats().retries, 0);
    }

    #[tokio::test]
    async fn test_ping_invalid_key_is_authentication_error() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/configuration"))
            .respond_with(ResponseTemplate::new(401).set_body_string(include_str!(
                "../../../../fixtures/tmdb/error_invalid_api_key.json"
            )))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let result = client.ping(&CancellationToken::new()).await;

        // Assert
        let err = result.unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::Authentication));
        assert!(err.to_string().contains("invalid or missing credentials"));
    }

    #[tokio::test]
    async fn test_ping_succeeds_with_configuration_body() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/configuration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(include_str!("../../../../fixtures/tmdb/configuration.json")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server);

        // Act
        let result = client.ping(&CancellationToken::new()).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(client.stats().attempts, 1);
    }
}
