//! TMDB API response types.
//!
//! TMDB omits or nulls many fields depending on the resource, so every struct
//! falls back to defaults rather than failing the whole decode.

use serde::{Deserialize, Serialize};

/// TMDB error response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbErrorResponse {
    /// TMDB-specific status code (not the HTTP status).
    pub status_code: i64,
    /// Human readable message.
    pub status_message: String,
    /// Always `false` for errors.
    pub success: bool,
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PagedResponse<T> {
    /// Current page (1-based).
    #[serde(default)]
    pub page: u32,
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    /// Total pages.
    #[serde(default)]
    pub total_pages: u32,
    /// Total items across pages.
    #[serde(default)]
    pub total_results: u32,
}

impl<T> PagedResponse<T> {
    /// Empty page returned when the upstream reports the list as absent.
    #[must_use]
    pub const fn empty(page: u32) -> Self {
        Self {
            page,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }
}

/// Result item from `search/multi`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchResult {
    /// TMDB ID.
    pub id: u64,
    /// `movie`, `tv` or `person`.
    pub media_type: String,
    /// Movie title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// TV series or person name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Movie release date (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// TV first air date (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    /// Average rating (0-10).
    pub vote_average: f64,
    /// Synopsis.
    pub overview: String,
}

/// Movie or TV item returned by discover, trending, recommendations and
/// combined credits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaSummary {
    /// TMDB ID.
    pub id: u64,
    /// Present on trending and combined credits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Movie title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// TV series or person name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ISO 639-1 code.
    pub original_language: String,
    /// Synopsis.
    pub overview: String,
    /// Movie release date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// TV first air date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    /// Genre IDs.
    pub genre_ids: Vec<u32>,
    /// Average rating (0-10).
    pub vote_average: f64,
    /// Popularity score.
    pub popularity: f64,
    /// Credited character (combined credits only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    /// Credited job (combined credits only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
}

/// Genre entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Genre {
    /// Genre ID.
    pub id: u32,
    /// Localized genre name.
    pub name: String,
}

/// Cast credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CastMember {
    /// Person ID.
    pub id: u64,
    /// Person name.
    pub name: String,
    /// Character played.
    pub character: String,
    /// Billing order.
    pub order: u32,
}

/// Crew credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrewMember {
    /// Person ID.
    pub id: u64,
    /// Person name.
    pub name: String,
    /// Job title.
    pub job: String,
    /// Department.
    pub department: String,
}

/// `credits` appended to movie and TV details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Credits {
    /// Cast list.
    pub cast: Vec<CastMember>,
    /// Crew list.
    pub crew: Vec<CrewMember>,
}

/// Video entry (trailers, teasers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Video {
    /// Site-specific key (e.g. YouTube video ID).
    pub key: String,
    /// Title.
    pub name: String,
    /// Hosting site.
    pub site: String,
    /// `Trailer`, `Teaser`, ...
    #[serde(rename = "type")]
    pub kind: String,
}

/// `videos` appended to movie and TV details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Videos {
    /// Video list.
    pub results: Vec<Video>,
}

/// Movie details with credits and videos.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MovieDetails {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Original title.
    pub original_title: String,
    /// ISO 639-1 code.
    pub original_language: String,
    /// Synopsis.
    pub overview: String,
    /// Release date.
    pub release_date: Option<String>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    /// Release status.
    pub status: String,
    /// Average rating.
    pub vote_average: f64,
    /// Genres.
    pub genres: Vec<Genre>,
    /// Appended credits.
    pub credits: Option<Credits>,
    /// Appended videos.
    pub videos: Option<Videos>,
}

/// TV series details with credits and videos.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TvDetails {
    /// TMDB series ID.
    pub id: u64,
    /// Localized name.
    pub name: String,
    /// Original name.
    pub original_name: String,
    /// ISO 639-1 code.
    pub original_language: String,
    /// Synopsis.
    pub overview: String,
    /// First air date.
    pub first_air_date: Option<String>,
    /// Number of seasons.
    pub number_of_seasons: u32,
    /// Number of episodes.
    pub number_of_episodes: u32,
    /// `Returning Series`, `Ended`, ...
    pub status: String,
    /// Average rating.
    pub vote_average: f64,
    /// Genres.
    pub genres: Vec<Genre>,
    /// Appended credits.
    pub credits: Option<Credits>,
    /// Appended videos.
    pub videos: Option<Videos>,
}

/// `combined_credits` appended to person details.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CombinedCredits {
    /// Acting credits.
    pub cast: Vec<MediaSummary>,
    /// Crew credits.
    pub crew: Vec<MediaSummary>,
}

/// Person details with combined credits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonDetails {
    /// TMDB person ID.
    pub id: u64,
    /// Name.
    pub name: String,
    /// Biography.
    pub biography: String,
    /// Birthday (`YYYY-MM-DD`).
    pub birthday: Option<String>,
    /// Place of birth.
    pub place_of_birth: Option<String>,
    /// Department the person is known for.
    pub known_for_department: String,
    /// Appended combined credits.
    pub combined_credits: Option<CombinedCredits>,
}

/// Details of a movie, TV series or person.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Details {
    /// `movie/{id}`.
    Movie(Box<MovieDetails>),
    /// `tv/{id}`.
    Tv(Box<TvDetails>),
    /// `person/{id}`.
    Person(Box<PersonDetails>),
}

impl Details {
    /// TMDB ID of the resource.
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Movie(movie) => movie.id,
            Self::Tv(tv) => tv.id,
            Self::Person(person) => person.id,
        }
    }

    /// Title or name of the resource.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Movie(movie) => &movie.title,
            Self::Tv(tv) => &tv.name,
            Self::Person(person) => &person.name,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_parse_search_multi_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/search_multi_inception.json");

        // Act
        let response: PagedResponse<SearchResult> = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(response.page, 1);
        assert_eq!(response.results.len(), 3);
        let first = &response.results[0];
        assert_eq!(first.id, 27_205);
        assert_eq!(first.media_type, "movie");
        assert_eq!(first.title.as_deref(), Some("Inception"));
        let person = &response.results[2];
        assert_eq!(person.media_type, "person");
        assert_eq!(person.title, None);
    }

    #[test]
    fn test_parse_movie_details_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/movie_details_27205.json");

        // Act
        let details: MovieDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(details.id, 27_205);
        assert_eq!(details.runtime, Some(148));
        let credits = details.credits.unwrap();
        assert_eq!(credits.cast[0].name, "Leonardo DiCaprio");
        assert_eq!(credits.crew[0].job, "Director");
        assert_eq!(details.videos.unwrap().results[0].kind, "Trailer");
    }

    #[test]
    fn test_parse_tv_details_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/tv_details_1396.json");

        // Act
        let details: TvDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(details.id, 1396);
        assert_eq!(details.name, "Breaking Bad");
        assert_eq!(details.number_of_seasons, 5);
        assert_eq!(details.status, "Ended");
        assert!(details.credits.is_some());
    }

    #[test]
    fn test_parse_person_details_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/person_details_6193.json");

        // Act
        let details: PersonDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(details.id, 6193);
        assert_eq!(details.known_for_department, "Acting");
        let credits = details.combined_credits.unwrap();
        assert_eq!(credits.cast[0].character.as_deref(), Some("Dom Cobb"));
    }

    #[test]
    fn test_parse_discover_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/discover_movie.json");

        // Act
        let response: PagedResponse<MediaSummary> = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(response.total_pages, 12);
        assert_eq!(response.results[0].genre_ids, vec![28, 878]);
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        // Arrange
        let json = r#"{"id":1,"title":"x","runtime":null,"genres":[],"release_date":null}"#;

        // Act
        let details: MovieDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(details.runtime, None);
        assert_eq!(details.credits, None);
        assert!(details.overview.is_empty());
    }

    #[test]
    fn test_paged_response_missing_counts_default_to_zero() {
        // Arrange
        let json = r#"{"results":[]}"#;

        // Act
        let response: PagedResponse<MediaSummary> = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(response, PagedResponse::empty(0));
    }

    #[test]
    fn test_details_serializes_untagged() {
        // Arrange
        let details = Details::Tv(Box::new(TvDetails {
            id: 1396,
            name: String::from("Breaking Bad"),
            ..TvDetails::default()
        }));

        // Act
        let value = serde_json::to_value(&details).unwrap();

        // Assert
        assert_eq!(value["id"], 1396);
        assert_eq!(value["name"], "Breaking Bad");
        assert_eq!(details.display_name(), "Breaking Bad");
    }
}
