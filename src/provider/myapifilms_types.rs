/// MyAPIFilms API response types for deserialization.
///
/// These structures mirror the JSON response format of the `idIMDB`
/// endpoint queried with `seasons=1`.
use serde::Deserialize;
use std::fmt;

/// The top-level response.
#[derive(Debug, Deserialize)]
pub(super) struct MyApiFilmsResponse {
    pub data: MyApiFilmsData,
}

#[derive(Debug, Deserialize)]
pub(super) struct MyApiFilmsData {
    /// Matching titles; a lookup by id yields at most one
    #[serde(default)]
    pub movies: Vec<MyApiFilmsMovie>,
}

/// A single title.
#[derive(Debug, Deserialize)]
pub(super) struct MyApiFilmsMovie {
    /// IMDB rating, reported either as a string or a number
    pub rating: Option<StringOrNumber>,
    /// Season breakdown, absent for movies
    ///
    /// Kept undecoded until an episode query needs it, so a malformed
    /// episode list never hides the rating.
    pub seasons: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MyApiFilmsSeasons {
    /// Per-season episode groups, in no particular order
    #[serde(rename = "seasonsBySeason", default)]
    pub seasons_by_season: Vec<MyApiFilmsSeasonGroup>,
}

/// The episodes of one season.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct MyApiFilmsSeasonGroup {
    /// Season number
    pub season: u32,
    /// Episodes in ascending episode order
    #[serde(default)]
    pub episodes: Vec<MyApiFilmsEpisode>,
}

/// A single episode.
///
/// Both fields are optional and accept either JSON scalar. Specials come
/// without a number and unannounced episodes with a `null` date.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct MyApiFilmsEpisode {
    /// Episode number within the season
    #[serde(default)]
    pub episode: Option<StringOrNumber>,
    /// Release date as compact `YYYYMMDD`
    #[serde(default)]
    pub date: Option<StringOrNumber>,
}

impl MyApiFilmsEpisode {
    /// Episode number, if the API sent a whole positive number
    pub fn number(&self) -> Option<u32> {
        self.episode
            .as_ref()?
            .to_string()
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|number| *number > 0)
    }

    /// Release date text, empty when absent
    pub fn date_text(&self) -> String {
        self.date
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// A scalar the API sends as either a JSON string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringOrNumber::Text(text) => write!(f, "{}", text),
            StringOrNumber::Number(number) => write!(f, "{}", number),
        }
    }
}
