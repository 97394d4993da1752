//! Request and cache layer shared by all providers
//!
//! Two caches sit in front of every provider:
//!
//! * [`ProviderCore::request`] caches raw response text keyed by a digest of
//!   the URL, for the short URL TTL.
//! * [`ProviderCore::cache_check`] caches derived values (a rating, a season
//!   number, ...) keyed by a semantic description of the query, for the long
//!   result TTL.
//!
//! Cache contents are advisory. Anything that cannot be read back cleanly is
//! treated as a miss and recomputed.

use super::ProviderError;
use crate::cache::CacheStore;
use crate::clock::{Clock, SystemClock};
use crate::config::ProviderSettings;
use crate::digest::{Blake3Digest, UrlDigest};
use crate::release_date::normalize_release;
use crate::transport::{Transport, TransportError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Settings plus the capabilities a provider talks to
pub struct ProviderCore {
    settings: ProviderSettings,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    digest: Arc<dyn UrlDigest>,
    clock: Arc<dyn Clock>,
}

impl ProviderCore {
    /// Creates a core using BLAKE3 URL digests and the system clock
    ///
    /// TTLs in `settings` are clamped to the cache maximum.
    pub fn new(
        settings: ProviderSettings,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            settings: settings.clamped(),
            transport,
            cache,
            digest: Arc::new(Blake3Digest),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to decide whether an episode has aired
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the digest used to build URL cache keys
    pub fn with_digest(mut self, digest: Arc<dyn UrlDigest>) -> Self {
        self.digest = digest;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Cache key under which the raw response for `url` is stored
    pub fn url_cache_key(&self, url: &str) -> String {
        self.namespaced(&self.digest.digest(url))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}_{}", self.settings.cache_prefix, key)
    }

    /// Reads `key`, downgrading store failures to a miss
    fn cached(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Ok(Some(value)) => {
                debug!("found in cache: {} = {}", key, value);
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("cache read failed for {}, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Writes `key`; a failed write never fails the query
    fn store(&self, key: &str, value: &str, ttl: Duration) {
        debug!("caching {} for {}s", key, ttl.as_secs());
        if let Err(e) = self.cache.put(key, value, ttl) {
            warn!("failed to cache {}: {}", key, e);
        }
    }

    /// Fetches `url` and decodes its JSON body, going through the URL cache
    ///
    /// `validate` sees the parsed body of a live response before it is
    /// cached, so payloads it rejects never reach the cache.
    ///
    /// # Arguments
    ///
    /// * `url` - The full request URL, API key included
    /// * `validate` - Inspects a live body for in-band failures
    ///
    /// # Returns
    ///
    /// The decoded body, either from the URL cache or from a live request
    /// answered with status 200. A cached body that no longer decodes is
    /// refetched.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let show: OmdbTitle = core.request(&url, reject_failed_response)?;
    /// ```
    pub(crate) fn request<T, V>(&self, url: &str, validate: V) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        V: Fn(&str, &serde_json::Value) -> Result<(), ProviderError>,
    {
        let key = self.url_cache_key(url);

        // Try the cache first
        if let Some(cached) = self.cached(&key) {
            match serde_json::from_str(&cached) {
                Ok(data) => return Ok(data),
                Err(e) => debug!("cached response for {} is unusable: {}", url, e),
            }
        }

        // Cache miss - fetch from provider
        let response = self.transport.fetch(url)?;
        info!("GET {} -> {}", url, response.status);
        trace!("{} body: {}", url, response.body);

        if response.status != 200 {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status,
            }
            .into());
        }

        // Only bodies that parse and pass validation are cached
        let value: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        validate(url, &value)?;

        self.store(&key, &response.body, self.settings.url_ttl);

        serde_json::from_value(value)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Returns `format(value)` for a derived value, going through the result cache
    ///
    /// `value` is the cached raw value if one exists and formats cleanly,
    /// otherwise the result of `compute`. A computation yielding `None` fails
    /// with [`ProviderError::EmptyResult`] and leaves the cache untouched.
    ///
    /// # Arguments
    ///
    /// * `key` - Semantic key such as `rating:tt0944947`; the provider prefix
    ///   is added here
    /// * `compute` - Produces the raw value on a cache miss
    /// * `format` - Coerces a raw value into the returned type
    /// * `ttl` - How long a computed value is cached
    ///
    /// # Returns
    ///
    /// The formatted value. Errors from `compute` and from formatting a
    /// freshly computed value are passed through.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let rating = core.cache_check(
    ///     "rating:tt0944947",
    ///     || Ok(Some("9.2".to_string())),
    ///     parse_rating,
    ///     Duration::from_secs(3600),
    /// )?;
    /// ```
    pub(crate) fn cache_check<T, C, F>(
        &self,
        key: &str,
        compute: C,
        format: F,
        ttl: Duration,
    ) -> Result<T, ProviderError>
    where
        C: FnOnce() -> Result<Option<String>, ProviderError>,
        F: Fn(&str) -> Result<T, ProviderError>,
    {
        let key = self.namespaced(key);

        // Try the cache first
        if let Some(cached) = self.cached(&key) {
            match format(&cached) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("cached value for {} is unusable: {}", key, e),
            }
        }

        // Cache miss - derive the value
        let Some(data) = compute()? else {
            debug!("cannot cache: {}", key);
            return Err(ProviderError::EmptyResult { key });
        };

        self.store(&key, &data, ttl);
        format(&data)
    }

    /// [`ProviderCore::cache_check`] with the configured result TTL
    pub(crate) fn cache_result<T, C, F>(
        &self,
        key: &str,
        compute: C,
        format: F,
    ) -> Result<T, ProviderError>
    where
        C: FnOnce() -> Result<Option<String>, ProviderError>,
        F: Fn(&str) -> Result<T, ProviderError>,
    {
        self.cache_check(key, compute, format, self.settings.result_ttl)
    }
}

/// Validator for providers without an in-band failure flag
pub(crate) fn accept_any(_url: &str, _body: &serde_json::Value) -> Result<(), ProviderError> {
    Ok(())
}

/// Coerces a stored rating into a float
pub(crate) fn parse_rating(raw: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|rating| rating.is_finite())
        .ok_or_else(|| ProviderError::Format {
            value: raw.to_string(),
            expected: "rating",
        })
}

/// Coerces a stored season or episode number into an integer
pub(crate) fn parse_count(raw: &str) -> Result<u32, ProviderError> {
    raw.trim().parse::<u32>().map_err(|_| ProviderError::Format {
        value: raw.to_string(),
        expected: "integer",
    })
}

/// Coerces a stored release date into zero-padded `YYYY-MM-DD`
pub(crate) fn parse_release_date(raw: &str) -> Result<String, ProviderError> {
    normalize_release(raw).ok_or_else(|| ProviderError::Format {
        value: raw.to_string(),
        expected: "release date",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use crate::test_support::{FakeTransport, init_logging};
    use crate::transport::TransportResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    /// Digest that keys every URL by its length
    struct LengthDigest;

    impl UrlDigest for LengthDigest {
        fn digest(&self, input: &str) -> String {
            format!("len{}", input.len())
        }
    }

    /// Store whose every operation fails
    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::CacheDirectoryNotFound)
        }

        fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::CacheDirectoryNotFound)
        }
    }

    fn core_with(transport: Arc<FakeTransport>, cache: Arc<MemoryCache>) -> ProviderCore {
        init_logging();
        ProviderCore::new(ProviderSettings::omdb("key"), transport, cache)
    }

    #[test]
    fn test_request_caches_raw_response() {
        let transport = Arc::new(FakeTransport::ok(r#"{"value": 7}"#));
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(transport.clone(), cache.clone());

        let first: Payload = core.request("https://example.test/a", accept_any).unwrap();
        let second: Payload = core.request("https://example.test/a", accept_any).unwrap();

        assert_eq!(first, Payload { value: 7 });
        assert_eq!(second, first);
        assert_eq!(transport.calls(), 1);

        let key = core.url_cache_key("https://example.test/a");
        assert!(key.starts_with("omdb_"));
        assert_eq!(cache.get(&key).unwrap().as_deref(), Some(r#"{"value": 7}"#));
    }

    #[test]
    fn test_request_refetches_on_corrupt_cache() {
        let transport = Arc::new(FakeTransport::ok(r#"{"value": 3}"#));
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(transport.clone(), cache.clone());

        let key = core.url_cache_key("https://example.test/b");
        cache
            .put(&key, "{not json", Duration::from_secs(60))
            .unwrap();

        let payload: Payload = core.request("https://example.test/b", accept_any).unwrap();
        assert_eq!(payload.value, 3);
        assert_eq!(transport.calls(), 1);
        assert_eq!(cache.get(&key).unwrap().as_deref(), Some(r#"{"value": 3}"#));
    }

    #[test]
    fn test_request_uses_configured_digest() {
        let transport = Arc::new(FakeTransport::ok(r#"{"value": 5}"#));
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(transport.clone(), cache.clone())
            .with_digest(Arc::new(LengthDigest));

        let url = "https://example.test/f";
        assert_eq!(core.url_cache_key(url), "omdb_len22");

        let payload: Payload = core.request(url, accept_any).unwrap();
        assert_eq!(payload.value, 5);
        assert_eq!(
            cache.get("omdb_len22").unwrap().as_deref(),
            Some(r#"{"value": 5}"#)
        );

        // Another URL of the same length maps onto the same entry
        let again: Payload = core.request("https://example.test/g", accept_any).unwrap();
        assert_eq!(again, payload);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_cache_failures_never_fail_queries() {
        init_logging();
        let transport = Arc::new(FakeTransport::ok(r#"{"value": 9}"#));
        let settings = ProviderSettings::omdb("key");
        let core = ProviderCore::new(settings, transport.clone(), Arc::new(BrokenCache));

        let payload: Payload = core.request("https://example.test/h", accept_any).unwrap();
        assert_eq!(payload.value, 9);

        let season = core
            .cache_result(
                "current_season:tt1",
                || Ok(Some("2".to_string())),
                parse_count,
            )
            .unwrap();
        assert_eq!(season, 2);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_request_rejects_non_200() {
        let transport = Arc::new(FakeTransport::new(|_| TransportResponse {
            status: 503,
            body: r#"{"value": 1}"#.to_string(),
        }));
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(transport, cache.clone());

        let result: Result<Payload, _> = core.request("https://example.test/c", accept_any);
        assert!(matches!(
            result,
            Err(ProviderError::Transport(TransportError::Status { status: 503, .. }))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_request_does_not_cache_rejected_payload() {
        let transport = Arc::new(FakeTransport::ok(r#"{"value": 1}"#));
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(transport, cache.clone());

        let result: Result<Payload, _> = core.request("https://example.test/d", |url, _| {
            Err(ProviderError::Rejected {
                url: url.to_string(),
                message: "nope".to_string(),
            })
        });

        assert!(matches!(result, Err(ProviderError::Rejected { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_request_reports_unparseable_body() {
        let transport = Arc::new(FakeTransport::ok("<html>"));
        let core = core_with(transport, Arc::new(MemoryCache::new()));

        let result: Result<Payload, _> = core.request("https://example.test/e", accept_any);
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_cache_check_prefers_cached_value() {
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(Arc::new(FakeTransport::unreachable()), cache.clone());
        cache
            .put("omdb_rating:tt1", "9.8", Duration::from_secs(60))
            .unwrap();

        let rating = core
            .cache_result("rating:tt1", || panic!("must not compute"), parse_rating)
            .unwrap();
        assert_eq!(rating, 9.8);
    }

    #[test]
    fn test_cache_check_recomputes_unformattable_cached_value() {
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(Arc::new(FakeTransport::unreachable()), cache.clone());
        cache
            .put(
                "omdb_current_season:tt1",
                "garbage",
                Duration::from_secs(60),
            )
            .unwrap();

        let season = core
            .cache_result(
                "current_season:tt1",
                || Ok(Some("4".to_string())),
                parse_count,
            )
            .unwrap();

        assert_eq!(season, 4);
        assert_eq!(
            cache.get("omdb_current_season:tt1").unwrap().as_deref(),
            Some("4")
        );
    }

    #[test]
    fn test_cache_check_refuses_empty_result() {
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(Arc::new(FakeTransport::unreachable()), cache.clone());

        let result = core.cache_result("rating:tt1", || Ok(None), parse_rating);

        match result {
            Err(ProviderError::EmptyResult { key }) => assert_eq!(key, "omdb_rating:tt1"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_check_propagates_compute_error() {
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(Arc::new(FakeTransport::unreachable()), cache.clone());

        let result = core.cache_result(
            "rating:tt1",
            || Err(ProviderError::MissingField("imdbRating")),
            parse_rating,
        );

        assert!(matches!(
            result,
            Err(ProviderError::MissingField("imdbRating"))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_check_stores_raw_value() {
        let cache = Arc::new(MemoryCache::new());
        let core = core_with(Arc::new(FakeTransport::unreachable()), cache.clone());

        let released = core
            .cache_result(
                "current_episode_released:tt1:1",
                || Ok(Some("05 Jan 2000".to_string())),
                parse_release_date,
            )
            .unwrap();

        assert_eq!(released, "2000-01-05");
        assert_eq!(
            cache
                .get("omdb_current_episode_released:tt1:1")
                .unwrap()
                .as_deref(),
            Some("05 Jan 2000")
        );
    }

    #[test]
    fn test_formatters() {
        assert_eq!(parse_rating("9.9").unwrap(), 9.9);
        assert_eq!(parse_rating(" 7 ").unwrap(), 7.0);
        assert!(parse_rating("N/A").is_err());
        assert!(parse_rating("NaN").is_err());

        assert_eq!(parse_count("3").unwrap(), 3);
        assert!(parse_count("3.5").is_err());
        assert!(parse_count("").is_err());

        assert_eq!(parse_release_date("2000-01-05").unwrap(), "2000-01-05");
        assert!(parse_release_date("N/A").is_err());
    }
}
