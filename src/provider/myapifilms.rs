/// MyAPIFilms metadata provider implementation.
use super::base::{ProviderCore, accept_any, parse_count, parse_rating, parse_release_date};
use super::myapifilms_types::{
    MyApiFilmsMovie, MyApiFilmsResponse, MyApiFilmsSeasonGroup, MyApiFilmsSeasons,
};
use super::{
    AiredEpisode, EpisodeSource, ImdbProvider, ProviderError, SeasonNumber, SeasonQuery,
    require_title_id,
};
use crate::release_date::{NOT_AVAILABLE, format_release_date, has_aired, parse_compact};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Metadata provider for the MyAPIFilms API.
///
/// A single detail request returns the rating together with every season's
/// episode list, so all queries share one URL cache entry per title.
pub struct MyApiFilmsProvider {
    core: ProviderCore,
}

/// Per-season episode groups as MyAPIFilms returns them.
struct SeasonGroups(Vec<MyApiFilmsSeasonGroup>);

impl EpisodeSource for SeasonGroups {
    fn latest_aired(&self, query: SeasonQuery, now: DateTime<Utc>) -> Option<AiredEpisode> {
        // Aired episodes per season, in the order the API lists them
        let mut by_season: BTreeMap<u32, Vec<AiredEpisode>> = BTreeMap::new();

        for group in &self.0 {
            for episode in &group.episodes {
                let date = episode.date_text();
                let released = parse_compact(&date);
                let (Some(number), Some(released)) = (episode.number(), released) else {
                    debug!(
                        "Skipping episode {:?} of season {}: no usable number or date '{}'",
                        episode.episode, group.season, date
                    );
                    continue;
                };

                if has_aired(released, now) {
                    let aired = AiredEpisode {
                        season: group.season,
                        episode: Some(number),
                        released,
                    };
                    by_season.entry(group.season).or_default().push(aired);
                }
            }
        }

        let mut aired = match query {
            SeasonQuery::Latest => by_season.pop_last().map(|(_, aired)| aired)?,
            SeasonQuery::Season(season) => by_season.remove(&season.get())?,
        };
        aired.pop()
    }
}

impl MyApiFilmsProvider {
    pub fn new(core: ProviderCore) -> Self {
        Self { core }
    }

    fn fetch_movie(&self, title_id: &str) -> Result<MyApiFilmsMovie, ProviderError> {
        let response: MyApiFilmsResponse =
            self.core.request(&self.detail_url(title_id)?, accept_any)?;

        response
            .data
            .movies
            .into_iter()
            .next()
            .ok_or(ProviderError::MissingField("data.movies[0]"))
    }

    /// Latest aired episode matching `query`, or a selection error
    fn aired_episode(
        &self,
        title_id: &str,
        query: SeasonQuery,
    ) -> Result<AiredEpisode, ProviderError> {
        let seasons = self
            .fetch_movie(title_id)?
            .seasons
            .ok_or(ProviderError::MissingField("data.movies[0].seasons"))?;
        let seasons: MyApiFilmsSeasons = serde_json::from_value(seasons)
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        SeasonGroups(seasons.seasons_by_season)
            .latest_aired(query, self.core.now())
            .ok_or_else(|| ProviderError::NoAiredEpisode {
                title_id: title_id.to_string(),
                season: match query {
                    SeasonQuery::Latest => None,
                    SeasonQuery::Season(season) => Some(season.get()),
                },
            })
    }
}

impl ImdbProvider for MyApiFilmsProvider {
    fn name(&self) -> &'static str {
        "myapifilms"
    }

    fn detail_url(&self, title_id: &str) -> Result<String, ProviderError> {
        let title_id = require_title_id(title_id)?;
        let settings = self.core.settings();
        Ok(format!(
            "{}?idIMDB={}&token={}&seasons=1&language=en-us",
            settings.base_url, title_id, settings.api_key
        ))
    }

    fn ratings(&self, title_id: &str) -> Result<f64, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("rating:{}", title_id),
            || {
                let movie = self.fetch_movie(title_id)?;
                Ok(movie
                    .rating
                    .map(|rating| rating.to_string())
                    .filter(|rating| !rating.is_empty() && rating != NOT_AVAILABLE))
            },
            parse_rating,
        )
    }

    fn current_season(&self, title_id: &str) -> Result<u32, ProviderError> {
        let title_id = require_title_id(title_id)?;
        self.core.cache_result(
            &format!("current_season:{}", title_id),
            || {
                let aired = self.aired_episode(title_id, SeasonQuery::Latest)?;
                Ok(Some(aired.season.to_string()))
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
                let aired = self.aired_episode(title_id, SeasonQuery::Season(season))?;
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
                let aired = self.aired_episode(title_id, SeasonQuery::Season(season))?;
                Ok(Some(format_release_date(aired.released)))
            },
            parse_release_date,
        )
    }
}
