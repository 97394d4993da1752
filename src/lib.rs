//! imdb_pulse - Cached IMDB ratings and currently airing episodes
//!
//! This library answers four questions about an IMDB title using one of two
//! interchangeable providers (OMDb or MyAPIFilms): its rating, the latest
//! season with an aired episode, and the number and release date of the
//! latest aired episode in a given season. Raw provider responses and the
//! derived answers are cached separately to keep provider calls down.

mod cache;
mod clock;
mod config;
mod digest;
mod provider;
mod release_date;
mod transport;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use thiserror::Error;

// Re-export error types
pub use cache::CacheError;
pub use config::ConfigError;
pub use provider::ProviderError;
pub use transport::TransportError;

pub use cache::{CacheStore, FileCache, MAX_CACHE_TTL, MemoryCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    DEFAULT_RESULT_TTL, DEFAULT_URL_TTL, MYAPIFILMS_BASE_URL, OMDB_BASE_URL, ProviderKind,
    ProviderSettings,
};
pub use digest::{Blake3Digest, UrlDigest};
pub use provider::{ImdbProvider, MyApiFilmsProvider, OmdbProvider, ProviderCore, SeasonNumber};
pub use release_date::{NOT_AVAILABLE, format_release_date, normalize_release};
pub use transport::{DEFAULT_REQUEST_TIMEOUT, HttpTransport, Transport, TransportResponse};

/// Top-level error type for imdb_pulse operations
#[derive(Debug, Error)]
pub enum ImdbPulseError {
    /// Error while answering a provider query
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error while setting up the cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error while reading configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while setting up the HTTP transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Builds a provider from already assembled capabilities
///
/// This is the seam for callers that bring their own transport, cache or
/// clock.
pub fn build_provider(kind: ProviderKind, core: ProviderCore) -> Box<dyn ImdbProvider> {
    match kind {
        ProviderKind::Omdb => Box::new(OmdbProvider::new(core)),
        ProviderKind::MyApiFilms => Box::new(MyApiFilmsProvider::new(core)),
    }
}

/// Opens a provider talking HTTP and caching on disk
///
/// Responses are cached in the system cache directory, in a subdirectory
/// named after the provider's cache prefix.
///
/// # Examples
///
/// ```no_run
/// use imdb_pulse::{ProviderKind, ProviderSettings, SeasonNumber, open_provider};
///
/// let settings = ProviderSettings::from_env(ProviderKind::Omdb).unwrap();
/// let provider = open_provider(ProviderKind::Omdb, settings).unwrap();
///
/// let season = provider.current_season("tt0944947").unwrap();
/// let episode = provider
///     .current_season_episode("tt0944947", SeasonNumber::try_from(season).unwrap())
///     .unwrap();
/// println!("Currently at S{:02}E{:02}", season, episode);
/// ```
pub fn open_provider(
    kind: ProviderKind,
    settings: ProviderSettings,
) -> Result<Box<dyn ImdbProvider>, ImdbPulseError> {
    let cache = FileCache::open(&settings.cache_prefix)?;
    let transport = HttpTransport::new()?;
    let core = ProviderCore::new(settings, Arc::new(transport), Arc::new(cache));
    Ok(build_provider(kind, core))
}
