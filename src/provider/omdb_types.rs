/// OMDb API response types for deserialization.
///
/// These structures mirror the JSON response format of omdbapi.com. OMDb
/// reports every scalar, numbers included, as a string.
use serde::Deserialize;

/// The title detail response (`?i={id}`).
#[derive(Debug, Deserialize)]
pub(super) struct OmdbTitle {
    /// IMDB rating, e.g. "8.7" or "N/A"
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    /// Number of seasons for series, absent or "N/A" for movies
    #[serde(rename = "totalSeasons")]
    pub total_seasons: Option<String>,
}

/// The season detail response (`?i={id}&season={n}`).
#[derive(Debug, Deserialize)]
pub(super) struct OmdbSeasonResponse {
    /// Episodes of the season in ascending episode order
    #[serde(rename = "Episodes", default)]
    pub episodes: Vec<OmdbEpisode>,
}

/// A single episode within a season detail response.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct OmdbEpisode {
    /// Episode number within the season
    #[serde(rename = "Episode")]
    pub episode: Option<String>,
    /// Release date, e.g. "2000-01-01" or "N/A"
    #[serde(rename = "Released")]
    pub released: Option<String>,
}
