/// OMDb metadata provider implementation.
use super::base::{ProviderCore, parse_count, parse_rating, parse_release_date};
use super::omdb_types::{OmdbEpisode, OmdbSeasonResponse, OmdbTitle};
use super::{
    AiredEpisode, EpisodeSource, ImdbProvider, ProviderError, SeasonNumber, SeasonQuery,
    require_title_id,
};
use crate::release_date::{NOT_AVAILABLE, format_release_date, has_aired, parse_release};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Metadata provider for the OMDb API.
///
/// Ratings and season counts come from the title detail endpoint; episode
/// lists are fetched one season at a time.
pub struct OmdbProvider {
    core: ProviderCore,
}

/// One season's episode list as OMDb returns it.
struct OmdbSeason {
    season: u32,
    episodes: Vec<OmdbEpisode>,
}

impl EpisodeSource for OmdbSeason {
    fn latest_aired(&self, query: SeasonQuery, now: DateTime<Utc>) -> Option<AiredEpisode> {
        if let SeasonQuery::Season(season) = query {
            if season.get() != self.season {
                return None;
            }
        }

        // Lists are in ascending episode order, so the newest aired episode
        // is the first hit scanning from the end.
        for (index, episode) in self.episodes.iter().enumerate().rev() {
            let raw = episode.released.as_deref().unwrap_or(NOT_AVAILABLE);
            let Some(released) = parse_release(raw) else {
                debug!("Skipping episode {}:{}: unreleased", self.season, index + 1);
                continue;
            };

            if has_aired(released, now) {
                debug!("Episode {}:{}: found!", self.season, index + 1);
                return Some(AiredEpisode {
                    season: self.season,
                    episode: episode
                        .episode
                        .as_deref()
                        .and_then(|n| n.trim().parse().ok()),
                    released,
                });
            }
        }

        None
    }
}

impl OmdbProvider {
    pub fn new(core: ProviderCore) -> Self {
        Self { core }
    }

    /// URL of the episode list for one season of `title_id`
    pub fn season_detail_url(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<String, ProviderError> {
        Ok(format!("{}&season={}", self.detail_url(title_id)?, season))
    }

    fn fetch_title(&self, title_id: &str) -> Result<OmdbTitle, ProviderError> {
        self.core
            .request(&self.detail_url(title_id)?, reject_failed_response)
    }

    fn fetch_season(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<OmdbSeason, ProviderError> {
        let url = self.season_detail_url(title_id, season)?;
        let response: OmdbSeasonResponse = self.core.request(&url, reject_failed_response)?;

        Ok(OmdbSeason {
            season: season.get(),
            episodes: response.episodes,
        })
    }

    /// Latest aired episode of `season`, or a selection error
    fn aired_episode(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<AiredEpisode, ProviderError> {
        self.fetch_season(title_id, season)?
            .latest_aired(SeasonQuery::Season(season), self.core.now())
            .ok_or_else(|| ProviderError::NoAiredEpisode {
                title_id: title_id.to_string(),
                season: Some(season.get()),
            })
    }
}

impl ImdbProvider for OmdbProvider {
    fn name(&self) -> &'static str {
        "omdb"
    }

    fn detail_url(&self, title_id: &str) -> Result<String, ProviderError> {
        let title_id = require_title_id(title_id)?;
        let settings = self.core.settings();
        Ok(format!(
            "{}?i={}&apikey={}",
            settings.base_url, title_id, settings.api_key
        ))
    }

    fn ratings(&self, title_id: &str) -> Result<f64, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("rating:{}", title_id),
            || {
                let title = self.fetch_title(title_id)?;
                Ok(title.imdb_rating.filter(|rating| rating != NOT_AVAILABLE))
            },
            parse_rating,
        )
    }

    fn current_season(&self, title_id: &str) -> Result<u32, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("current_season:{}", title_id),
            || {
                let title = self.fetch_title(title_id)?;
                let total = title
                    .total_seasons
                    .as_deref()
                    .and_then(|total| total.trim().parse::<u32>().ok())
                    .unwrap_or(0);

                for number in (1..=total).rev() {
                    let season = SeasonNumber::try_from(number)?;
                    let source = self.fetch_season(title_id, season)?;

                    if source
                        .latest_aired(SeasonQuery::Latest, self.core.now())
                        .is_some()
                    {
                        return Ok(Some(number.to_string()));
                    }
                    debug!("Season {} has no episodes {}", number, title_id);
                }

                Err(ProviderError::NoAiredEpisode {
                    title_id: title_id.to_string(),
                    season: None,
                })
            },
            parse_count,
        )
    }

    fn current_season_episode(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<u32, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("current_episode:{}:{}", title_id, season),
            || {
                let aired = self.aired_episode(title_id, season)?;
                Ok(aired.episode.map(|episode| episode.to_string()))
            },
            parse_count,
        )
    }

    fn current_season_episode_released(
        &self,
        title_id: &str,
        season: SeasonNumber,
    ) -> Result<String, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("current_episode_released:{}:{}", title_id, season),
            || {
                let aired = self.aired_episode(title_id, season)?;
                Ok(Some(format_release_date(aired.released)))
            },
            parse_release_date,
        )
    }
}

/// Treats `"Response": "False"` payloads as failures despite HTTP 200
fn reject_failed_response(url: &str, body: &serde_json::Value) -> Result<(), ProviderError> {
    if body.get("Response").and_then(|r| r.as_str()) == Some("False") {
        let message = body
            .get("Error")
            .and_then(|e| e.as_str())
            .unwrap_or("Response: False")
            .to_string();
        return Err(ProviderError::Rejected {
            url: url.to_string(),
            message,
        });
    }
    Ok(())
}
