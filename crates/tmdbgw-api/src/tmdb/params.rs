//! TMDB API request parameter types and local validation.

use std::str::FromStr;

use serde::Deserialize;

use super::error::ValidationError;

/// Maximum search query length in characters.
pub const MAX_QUERY_LENGTH: usize = 500;

/// Sort order used when discovery is not given one.
pub const DEFAULT_SORT_BY: &str = "popularity.desc";

/// Resource kind accepted by details and trending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Movie.
    Movie,
    /// TV series.
    Tv,
    /// Person.
    Person,
}

impl MediaKind {
    /// Path segment and literal for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Person => "person",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            "person" => Ok(Self::Person),
            other => Err(ValidationError::InvalidMediaKind {
                value: String::from(other),
                expected: "movie, tv or person",
            }),
        }
    }
}

/// Title kind accepted by discovery and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TitleKind {
    /// Movie.
    Movie,
    /// TV series.
    Tv,
}

impl TitleKind {
    /// Path segment and literal for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Query key for the year filter of this kind.
    const fn year_key(self) -> &'static str {
        match self {
            Self::Movie => "primary_release_year",
            Self::Tv => "first_air_date_year",
        }
    }
}

impl std::fmt::Display for TitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(ValidationError::InvalidMediaKind {
                value: String::from(other),
                expected: "movie or tv",
            }),
        }
    }
}

/// Trending time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
}

impl TimeWindow {
    /// Path segment for this window.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            other => Err(ValidationError::InvalidTimeWindow(String::from(other))),
        }
    }
}

/// Request parameters for `search/multi`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchParams {
    /// Search keyword (required, at most [`MAX_QUERY_LENGTH`] characters).
    pub query: String,
    /// Page number. Unset or non-positive means 1.
    #[serde(default)]
    pub page: Option<i64>,
    /// Response language. Falls back to the client default.
    #[serde(default)]
    pub language: Option<String>,
}

impl SearchParams {
    /// Creates params with the given query.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the page number.
    #[must_use]
    pub const fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the response language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Checks the query before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyQuery`] or
    /// [`ValidationError::QueryTooLong`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        let length = self.query.chars().count();
        if length > MAX_QUERY_LENGTH {
            return Err(ValidationError::QueryTooLong {
                max: MAX_QUERY_LENGTH,
                actual: length,
            });
        }
        Ok(())
    }
}

/// Filters for `discover/movie` and `discover/tv`.
///
/// Field names follow the TMDB query keys so tool arguments deserialize
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscoverFilters {
    /// Comma-separated genre IDs.
    pub with_genres: Option<String>,
    /// Primary release year (movies) or first air date year (TV).
    #[serde(alias = "primary_release_year", alias = "first_air_date_year")]
    pub year: Option<i32>,
    /// Minimum vote average.
    #[serde(rename = "vote_average.gte")]
    pub vote_average_gte: Option<f64>,
    /// Maximum vote average.
    #[serde(rename = "vote_average.lte")]
    pub vote_average_lte: Option<f64>,
    /// ISO 639-1 code of the original language.
    pub with_original_language: Option<String>,
    /// TV status filter. Ignored for movies.
    pub with_status: Option<String>,
    /// Sort order. Defaults to [`DEFAULT_SORT_BY`].
    pub sort_by: Option<String>,
    /// Page number. Unset or non-positive means 1.
    pub page: Option<i64>,
    /// Response language. Falls back to the client default.
    pub language: Option<String>,
}

impl DiscoverFilters {
    /// Checks the rating bounds before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RatingOutOfRange`] if either bound is
    /// outside `[0, 10]` or not a number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_rating("vote_average.gte", self.vote_average_gte)?;
        check_rating("vote_average.lte", self.vote_average_lte)?;
        Ok(())
    }

    /// Builds the query for `kind`, excluding `language`.
    #[must_use]
    pub fn to_query(&self, kind: TitleKind) -> Vec<(&'static str, String)> {
        let sort_by = self
            .sort_by
            .as_deref()
            .filter(|sort| !sort.is_empty())
            .unwrap_or(DEFAULT_SORT_BY);
        let mut query = vec![
            ("sort_by", String::from(sort_by)),
            ("page", normalize_page(self.page).to_string()),
        ];
        if let Some(genres) = self.with_genres.as_deref().filter(|g| !g.is_empty()) {
            query.push(("with_genres", String::from(genres)));
        }
        if let Some(year) = self.year.filter(|year| *year > 0) {
            query.push((kind.year_key(), year.to_string()));
        }
        if let Some(gte) = self.vote_average_gte {
            query.push(("vote_average.gte", format!("{gte:.1}")));
        }
        if let Some(lte) = self.vote_average_lte {
            query.push(("vote_average.lte", format!("{lte:.1}")));
        }
        if let Some(lang) = self
            .with_original_language
            .as_deref()
            .filter(|l| !l.is_empty())
        {
            query.push(("with_original_language", String::from(lang)));
        }
        if kind == TitleKind::Tv
            && let Some(status) = self.with_status.as_deref().filter(|s| !s.is_empty())
        {
            query.push(("with_status", String::from(status)));
        }
        query
    }
}

fn check_rating(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(0.0..=10.0).contains(&v) => {
            Err(ValidationError::RatingOutOfRange { field, value: v })
        }
        _ => Ok(()),
    }
}

/// Resolves an optional page number. Unset or non-positive means 1.
#[must_use]
pub fn normalize_page(page: Option<i64>) -> u32 {
    page.filter(|p| *p > 0)
        .map_or(1, |p| u32::try_from(p).unwrap_or(u32::MAX))
}

/// Checks that a resource ID is positive.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidId`] for zero or negative IDs.
pub fn validate_id(kind: &'static str, id: i64) -> Result<u64, ValidationError> {
    u64::try_from(id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ValidationError::InvalidId { kind, id })
}
