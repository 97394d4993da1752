//! Metadata providers
//!
//! This module defines the contract every provider satisfies
//! ([`ImdbProvider`]), the shared request/cache layer ([`ProviderCore`]) and
//! the two provider implementations. Each provider keeps its response shapes
//! in a sibling `*_types` module.
mod base;
mod myapifilms;
mod myapifilms_types;
mod omdb;
mod omdb_types;

pub use base::ProviderCore;
pub use myapifilms::MyApiFilmsProvider;
pub use omdb::OmdbProvider;

use crate::transport::TransportError;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

/// Errors that can occur while answering a provider query
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No title id was given
    #[error("No title id given")]
    MissingTitleId,

    /// The season argument is missing, zero or not a number
    #[error("Invalid season '{0}'")]
    InvalidSeason(String),

    /// The HTTP exchange failed or returned a non-200 status
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The provider answered 200 but reported a failure in the payload
    #[error("Provider rejected request {url}: {message}")]
    Rejected { url: String, message: String },

    /// The provider's response could not be decoded
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// The provider's response lacks a field the query needs
    #[error("API response is missing {0}")]
    MissingField(&'static str),

    /// No episode has aired yet in the requested season (or in any season)
    #[error("No aired episode found for {title_id}{}", .season.map(|s| format!(" season {}", s)).unwrap_or_default())]
    NoAiredEpisode {
        title_id: String,
        season: Option<u32>,
    },

    /// A computation produced nothing; such results are never cached
    #[error("Refusing to cache empty result for {key}")]
    EmptyResult { key: String },

    /// A value could not be coerced into the expected type
    #[error("Cannot read '{value}' as {expected}")]
    Format {
        value: String,
        expected: &'static str,
    },
}

/// A validated, strictly positive season number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeasonNumber(NonZeroU32);

impl SeasonNumber {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SeasonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SeasonNumber {
    type Error = ProviderError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(SeasonNumber)
            .ok_or_else(|| ProviderError::InvalidSeason(value.to_string()))
    }
}

impl TryFrom<i64> for SeasonNumber {
    type Error = ProviderError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| ProviderError::InvalidSeason(value.to_string()))
            .and_then(SeasonNumber::try_from)
    }
}

impl TryFrom<&str> for SeasonNumber {
    type Error = ProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| ProviderError::InvalidSeason(value.to_string()))
            .and_then(SeasonNumber::try_from)
    }
}

/// Which season an episode lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeasonQuery {
    /// The highest season that has at least one aired episode
    Latest,
    /// One specific season
    Season(SeasonNumber),
}

/// The episode an [`EpisodeSource`] picked as most recently aired
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AiredEpisode {
    /// Season the episode belongs to
    pub season: u32,
    /// Episode number within the season, if the provider reported one
    pub episode: Option<u32>,
    /// Release date
    pub released: NaiveDate,
}

/// A provider-specific collection of episode records
///
/// Implementors know their own payload shape; callers only see the selected
/// [`AiredEpisode`].
pub(crate) trait EpisodeSource {
    /// Finds the most recent episode released strictly before `now`
    ///
    /// Returns `None` if nothing in the targeted season has aired.
    fn latest_aired(&self, query: SeasonQuery, now: DateTime<Utc>) -> Option<AiredEpisode>;
}

/// Queries every provider answers
///
/// Title ids are required; an empty id fails with
/// [`ProviderError::MissingTitleId`] before any cache or network access.
pub trait ImdbProvider: Send + Sync {
    /// Short provider name for diagnostics
    fn name(&self) -> &'static str;

    /// URL of the provider's detail record for `title_id`
    fn detail_url(&self, title_id: &str) -> Result<String, ProviderError>;

    /// IMDB rating of the title
    fn ratings(&self, title_id: &str) -> Result<f64, ProviderError>;

    /// Highest season with at least one aired episode
    fn current_season(&self, title_id: &str) -> Result<u32, ProviderError>;

    /// Number of the latest aired episode in `season`
    fn current_season_episode(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<u32, ProviderError>;

    /// Release date (`YYYY-MM-DD`) of the latest aired episode in `season`
    fn current_season_episode_released(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<String, ProviderError>;
}

/// Rejects empty title ids
pub(crate) fn require_title_id(title_id: &str) -> Result<&str, ProviderError> {
    if title_id.trim().is_empty() {
        tracing::debug!("Ignoring.. bad id '{}'", title_id);
        return Err(ProviderError::MissingTitleId);
    }
    Ok(title_id)
}
