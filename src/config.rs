//! Provider configuration
//!
//! Settings are fixed at construction and never mutated afterwards.

use crate::cache::MAX_CACHE_TTL;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// How long raw provider responses are cached
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(30 * 60);

/// How long derived values (ratings, current season, ...) are cached
pub const DEFAULT_RESULT_TTL: Duration = MAX_CACHE_TTL;

pub const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";
pub const MYAPIFILMS_BASE_URL: &str = "https://www.myapifilms.com/imdb/idIMDB";

/// Errors that can occur while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    /// An environment variable holds an unusable value
    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidVar { name: &'static str, value: String },

    /// Unknown provider name
    #[error("Unknown provider '{0}' (expected 'omdb' or 'myapifilms')")]
    UnknownProvider(String),
}

/// Supported metadata providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// omdbapi.com
    Omdb,
    /// myapifilms.com
    MyApiFilms,
}

impl ProviderKind {
    /// Namespace prepended to every cache key of this provider
    pub fn cache_prefix(self) -> &'static str {
        match self {
            ProviderKind::Omdb => "omdb",
            ProviderKind::MyApiFilms => "myapi",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Omdb => OMDB_BASE_URL,
            ProviderKind::MyApiFilms => MYAPIFILMS_BASE_URL,
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::Omdb => "OMDB_API_KEY",
            ProviderKind::MyApiFilms => "MYAPIFILMS_TOKEN",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Omdb => write!(f, "omdb"),
            ProviderKind::MyApiFilms => write!(f, "myapifilms"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omdb" | "omdbapi" => Ok(ProviderKind::Omdb),
            "myapifilms" | "myapi" => Ok(ProviderKind::MyApiFilms),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-provider constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// API key (OMDb) or token (MyAPIFilms)
    pub api_key: String,
    /// Namespace prepended to every cache key
    pub cache_prefix: String,
    /// Endpoint the provider URLs are built on
    pub base_url: String,
    /// TTL for raw responses keyed by URL
    pub url_ttl: Duration,
    /// TTL for derived values keyed by query
    pub result_ttl: Duration,
}

impl ProviderSettings {
    /// Default settings for `kind` with the given key
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cache_prefix: kind.cache_prefix().to_string(),
            base_url: kind.default_base_url().to_string(),
            url_ttl: DEFAULT_URL_TTL,
            result_ttl: DEFAULT_RESULT_TTL,
        }
    }

    pub fn omdb(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::Omdb, api_key)
    }

    pub fn myapifilms(token: impl Into<String>) -> Self {
        Self::new(ProviderKind::MyApiFilms, token)
    }

    /// Reads settings for `kind` from the environment
    ///
    /// The key comes from `OMDB_API_KEY` or `MYAPIFILMS_TOKEN`. The optional
    /// `IMDB_PULSE_BASE_URL`, `IMDB_PULSE_URL_TTL_SECS` and
    /// `IMDB_PULSE_RESULT_TTL_SECS` override the defaults.
    pub fn from_env(kind: ProviderKind) -> Result<Self, ConfigError> {
        let var = kind.api_key_var();
        let api_key = env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVar(var))?;

        let mut settings = Self::new(kind, api_key);

        if let Ok(base_url) = env::var("IMDB_PULSE_BASE_URL") {
            settings.base_url = base_url;
        }
        if let Some(ttl) = ttl_from_env("IMDB_PULSE_URL_TTL_SECS")? {
            settings.url_ttl = ttl;
        }
        if let Some(ttl) = ttl_from_env("IMDB_PULSE_RESULT_TTL_SECS")? {
            settings.result_ttl = ttl;
        }

        Ok(settings.clamped())
    }

    /// Caps both TTLs at [`MAX_CACHE_TTL`]
    pub fn clamped(mut self) -> Self {
        for ttl in [&mut self.url_ttl, &mut self.result_ttl] {
            if *ttl > MAX_CACHE_TTL {
                warn!(
                    "TTL of {}s exceeds the cache maximum, using {}s",
                    ttl.as_secs(),
                    MAX_CACHE_TTL.as_secs()
                );
                *ttl = MAX_CACHE_TTL;
            }
        }
        self
    }
}

fn ttl_from_env(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("omdb".parse::<ProviderKind>().unwrap(), ProviderKind::Omdb);
        assert_eq!(
            " MyAPIFilms ".parse::<ProviderKind>().unwrap(),
            ProviderKind::MyApiFilms
        );
        assert!(matches!(
            "tvmaze".parse::<ProviderKind>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_default_settings() {
        let omdb = ProviderSettings::omdb("key");
        assert_eq!(omdb.cache_prefix, "omdb");
        assert_eq!(omdb.base_url, "https://www.omdbapi.com/");
        assert_eq!(omdb.url_ttl, Duration::from_secs(1800));
        assert_eq!(omdb.result_ttl, Duration::from_secs(21600));

        let myapi = ProviderSettings::myapifilms("token");
        assert_eq!(myapi.cache_prefix, "myapi");
        assert_eq!(myapi.api_key, "token");
    }

    #[test]
    fn test_clamped_caps_ttls() {
        let mut settings = ProviderSettings::omdb("key");
        settings.result_ttl = Duration::from_secs(24 * 60 * 60);
        let settings = settings.clamped();
        assert_eq!(settings.result_ttl, MAX_CACHE_TTL);
        assert_eq!(settings.url_ttl, DEFAULT_URL_TTL);
    }
}
