//! Radio Browser directory client
//!
//! This module provides the client for the public, mirrored Radio Browser
//! directory. Every query walks an ordered list of mirrors strictly one after
//! the other; a mirror is only tried once the previous one has answered or
//! failed.
//!
//! # Example
//!
//! ```no_run
//! use pmoradiobrowser::RadioBrowserClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RadioBrowserClient::new()?;
//!
//!     // 50 healthy stations of at least 128 kbps, most voted first
//!     let stations = client.fetch_stations_by_country("TR", 50, 128).await?;
//!     for station in &stations {
//!         println!("{} ({} kbps) -> {}", station.name, station.bitrate, station.stream_url());
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::cache::{ResponseCache, DEFAULT_CACHE_TTL};
use crate::error::{Error, Result};
use crate::fetch::{FetchRequest, Fetcher, HttpFetcher, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::mirrors::{MirrorEndpoint, MirrorRegistry, CANDIDATE_FACTOR};
use crate::models::{filter_eligible, CountryInfo, DataOrigin, StationLookup, StationRecord};
use pmoutils::{Clock, SystemClock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default minimum bitrate for country lookups (kbps)
pub const DEFAULT_MIN_BITRATE: u32 = 128;

/// Default number of stations returned by a country lookup
pub const DEFAULT_LIMIT: usize = 50;

/// Default number of results of a name search
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

const NO_DATA_MESSAGE: &str = "The server returned no data for this country";
const NO_MIRROR_MESSAGE: &str = "Could not connect to any radio mirrors";

/// Build the cache key of a country lookup
pub fn cache_key(country_code: &str, limit: usize, min_bitrate: u32) -> String {
    format!("{}-{}-{}", country_code, limit, min_bitrate)
}

/// Radio Browser client
///
/// Cloning is cheap: clones share the HTTP fetcher and the response cache.
#[derive(Clone)]
pub struct RadioBrowserClient {
    fetcher: Arc<dyn Fetcher>,
    mirrors: Arc<MirrorRegistry>,
    cache: Arc<ResponseCache<Vec<StationRecord>>>,
    timeout: Duration,
    default_limit: usize,
    min_bitrate: u32,
    search_limit: usize,
}

impl RadioBrowserClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Mirror lists used by this client
    pub fn mirrors(&self) -> &MirrorRegistry {
        &self.mirrors
    }

    /// Number of country lookups currently cached
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached lookup
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // ========================================================================
    // Country lookups
    // ========================================================================

    /// Stations of a country, using the client's default limit and bitrate floor
    pub async fn fetch_stations(&self, country_code: &str) -> Result<Vec<StationRecord>> {
        self.fetch_stations_by_country(country_code, self.default_limit, self.min_bitrate)
            .await
    }

    /// Same as [`RadioBrowserClient::fetch_stations`], with the origin of the data
    pub async fn fetch_stations_detailed(&self, country_code: &str) -> Result<StationLookup> {
        self.fetch_stations_by_country_detailed(country_code, self.default_limit, self.min_bitrate)
            .await
    }

    /// Eligible stations of a country, most voted first
    ///
    /// See [`RadioBrowserClient::fetch_stations_by_country_detailed`]. The
    /// origin of the data is dropped: stale data is returned like fresh data.
    pub async fn fetch_stations_by_country(
        &self,
        country_code: &str,
        limit: usize,
        min_bitrate: u32,
    ) -> Result<Vec<StationRecord>> {
        Ok(self
            .fetch_stations_by_country_detailed(country_code, limit, min_bitrate)
            .await?
            .stations)
    }

    /// Eligible stations of a country, with the origin of the data
    ///
    /// 1. A cache entry within its TTL is returned without any network call.
    /// 2. Otherwise mirrors are probed in order for `limit * 5` candidates. A
    ///    mirror whose raw answer is a non-empty array wins: its answer is
    ///    filtered (health check, usable URL, `min_bitrate`), truncated to
    ///    `limit`, cached and returned, even if filtering left nothing. Empty
    ///    answers, errors and non-array bodies move on to the next mirror.
    /// 3. When every mirror is exhausted, an existing cache entry is served
    ///    whatever its age ([`DataOrigin::Stale`]); without one the call fails
    ///    with [`Error::DirectoryUnreachable`].
    pub async fn fetch_stations_by_country_detailed(
        &self,
        country_code: &str,
        limit: usize,
        min_bitrate: u32,
    ) -> Result<StationLookup> {
        let code = country_code.trim().to_uppercase();
        if code.is_empty() {
            return Err(Error::invalid_argument("country code is empty"));
        }
        if limit == 0 {
            return Err(Error::invalid_argument("limit must be greater than 0"));
        }

        let key = cache_key(&code, limit, min_bitrate);
        if let Some(stations) = self.cache.get_fresh(&key) {
            debug!(key = %key, count = stations.len(), "Serving stations from cache");
            return Ok(StationLookup {
                stations,
                origin: DataOrigin::Cache,
            });
        }

        let candidates = limit.saturating_mul(CANDIDATE_FACTOR);
        let mut last_error: Option<Error> = None;

        for mirror in &self.mirrors.country {
            let payload = match self
                .request(mirror, mirror.country_url(&code, candidates))
                .await
            {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(mirror = %mirror.base_url, error = %e, "Mirror failed");
                    last_error = Some(e);
                    continue;
                }
            };

            let (raw_count, decoded) = match parse_station_array(payload) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(mirror = %mirror.base_url, error = %e, "Mirror returned an unusable payload");
                    last_error = Some(e);
                    continue;
                }
            };

            if raw_count == 0 {
                debug!(mirror = %mirror.base_url, country = %code, "Mirror returned no stations, trying next");
                continue;
            }

            let stations = filter_eligible(decoded, min_bitrate, limit);
            info!(
                mirror = %mirror.base_url,
                country = %code,
                received = raw_count,
                eligible = stations.len(),
                "Stations fetched"
            );

            self.cache.insert(key, stations.clone());
            return Ok(StationLookup {
                stations,
                origin: DataOrigin::Network {
                    mirror: mirror.base_url.clone(),
                },
            });
        }

        if let Some(stations) = self.cache.get_stale(&key) {
            warn!(key = %key, "All mirrors failed, serving stale cache entry");
            return Ok(StationLookup {
                stations,
                origin: DataOrigin::Stale,
            });
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| NO_DATA_MESSAGE.to_string());
        Err(Error::DirectoryUnreachable(message))
    }

    // ========================================================================
    // Country listing
    // ========================================================================

    /// All countries known to the directory, with their station count
    ///
    /// Not cached, not filtered. The first mirror answering with a country
    /// array wins; if all fail, the last failure is returned.
    pub async fn fetch_country_list(&self) -> Result<Vec<CountryInfo>> {
        let mut last_error: Option<Error> = None;

        for mirror in &self.mirrors.countries {
            let result = match self.request(mirror, mirror.countries_url()).await {
                Ok(payload) => serde_json::from_value::<Vec<CountryInfo>>(payload).map_err(Error::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(countries) => return Ok(countries),
                Err(e) => {
                    warn!(mirror = %mirror.base_url, error = %e, "Country listing failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::DirectoryUnreachable(NO_MIRROR_MESSAGE.to_string())))
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Search with the client's default result limit
    pub async fn search(&self, query: &str) -> Result<Vec<StationRecord>> {
        self.search_stations(query, self.search_limit).await
    }

    /// Stations whose name matches `query`, most clicked first
    ///
    /// The first mirror that answers wins and its result is returned as is:
    /// no eligibility filter, no caching. Fails only if every mirror fails.
    pub async fn search_stations(&self, query: &str, limit: usize) -> Result<Vec<StationRecord>> {
        for mirror in &self.mirrors.search {
            let result = match self.request(mirror, mirror.search_url(query, limit)).await {
                Ok(payload) => parse_station_array(payload).map(|(_, stations)| stations),
                Err(e) => Err(e),
            };

            match result {
                Ok(stations) => {
                    debug!(mirror = %mirror.base_url, query = %query, count = stations.len(), "Search answered");
                    return Ok(stations);
                }
                Err(e) => warn!(mirror = %mirror.base_url, error = %e, "Search mirror failed"),
            }
        }

        Err(Error::SearchFailed(NO_MIRROR_MESSAGE.to_string()))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn request(&self, mirror: &MirrorEndpoint, url: Result<Url>) -> Result<Value> {
        let request = FetchRequest {
            url: url?,
            virtual_host: mirror.virtual_host.clone(),
            timeout: self.timeout,
        };
        debug!(url = %request.url, "Querying mirror");
        self.fetcher.fetch_json(&request).await
    }
}

/// Decode a mirror answer that must be a JSON array of stations
///
/// Returns the raw element count with the records that decoded. An element
/// that does not fit [`StationRecord`] is dropped on its own, the rest of the
/// answer is kept.
fn parse_station_array(payload: Value) -> Result<(usize, Vec<StationRecord>)> {
    let Value::Array(items) = payload else {
        return Err(Error::unexpected_payload("expected a JSON array of stations"));
    };

    let raw_count = items.len();
    let stations: Vec<StationRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(station) => Some(station),
            Err(e) => {
                debug!(error = %e, "Skipping malformed station record");
                None
            }
        })
        .collect();

    if stations.len() < raw_count {
        warn!(
            received = raw_count,
            skipped = raw_count - stations.len(),
            "Some station records could not be decoded"
        );
    }
    Ok((raw_count, stations))
}

/// Builder for RadioBrowserClient
pub struct ClientBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    mirrors: MirrorRegistry,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    user_agent: String,
    cache_ttl: Duration,
    cache_capacity: usize,
    default_limit: usize,
    min_bitrate: u32,
    search_limit: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            fetcher: None,
            mirrors: MirrorRegistry::default(),
            clock: Arc::new(SystemClock),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: 0,
            default_limit: DEFAULT_LIMIT,
            min_bitrate: DEFAULT_MIN_BITRATE,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom fetch capability instead of the built-in HTTP one
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the mirror lists
    pub fn mirrors(mut self, mirrors: MirrorRegistry) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Clock used to timestamp cache entries
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header (built-in HTTP fetcher only)
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the TTL of cached country lookups
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Bound the number of cached lookups (`0` = unbounded)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Limit used by [`RadioBrowserClient::fetch_stations`]
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Bitrate floor used by [`RadioBrowserClient::fetch_stations`]
    pub fn min_bitrate(mut self, min_bitrate: u32) -> Self {
        self.min_bitrate = min_bitrate;
        self
    }

    /// Limit used by [`RadioBrowserClient::search`]
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RadioBrowserClient> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&self.user_agent)?),
        };

        let cache = ResponseCache::new(self.clock, self.cache_ttl).with_capacity(self.cache_capacity);

        Ok(RadioBrowserClient {
            fetcher,
            mirrors: Arc::new(self.mirrors),
            cache: Arc::new(cache),
            timeout: self.timeout,
            default_limit: self.default_limit,
            min_bitrate: self.min_bitrate,
            search_limit: self.search_limit,
        })
    }
}
