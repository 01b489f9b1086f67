//! Mirror registry for the Radio Browser directory
//!
//! The directory is served by several interchangeable mirrors. Each query kind
//! walks its own ordered list: the order is the probe order, so the most
//! reliable hosts come first, the raw-IP entry near the end and the relaxed
//! country match last.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Hostname sent as `Host` header to mirrors addressed by IP
pub const DEFAULT_VIRTUAL_HOST: &str = "de1.api.radio-browser.info";

/// Ratio between requested candidates and the caller's limit, so filtering
/// still leaves enough stations
pub const CANDIDATE_FACTOR: usize = 5;

const DE1: &str = "https://de1.api.radio-browser.info/json";
const AT1: &str = "https://at1.api.radio-browser.info/json";
const NL1: &str = "https://nl1.api.radio-browser.info/json";
const ALL: &str = "https://all.api.radio-browser.info/json";
const DIRECT_IP: &str = "http://144.76.104.180/json";

/// How a mirror matches the country of a station
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CountryMatch {
    /// `/stations/bycountrycodeexact/{CODE}`
    #[default]
    Exact,
    /// `/stations/bycountry/{CODE}`
    Relaxed,
}

/// One directory endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorEndpoint {
    /// API root, e.g. `https://de1.api.radio-browser.info/json`
    pub base_url: String,
    /// `Host` header to send when `base_url` addresses the service by IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_host: Option<String>,
    #[serde(default)]
    pub country_match: CountryMatch,
}

impl MirrorEndpoint {
    /// Mirror addressed by hostname, exact country match
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            virtual_host: None,
            country_match: CountryMatch::Exact,
        }
    }

    /// Send `host` as virtual host (for IP-addressed mirrors)
    pub fn with_virtual_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = Some(host.into());
        self
    }

    /// Use the relaxed `bycountry` route
    pub fn relaxed(mut self) -> Self {
        self.country_match = CountryMatch::Relaxed;
        self
    }

    /// Whether requests must carry an explicit `Host` header
    pub fn requires_host_override(&self) -> bool {
        self.virtual_host.is_some()
    }

    /// `{base}/stations/bycountrycodeexact/{CODE}?order=votes&reverse=true&limit={n}&hidebroken=true`
    pub fn country_url(&self, country_code: &str, candidates: usize) -> Result<Url> {
        let route = match self.country_match {
            CountryMatch::Exact => "bycountrycodeexact",
            CountryMatch::Relaxed => "bycountry",
        };
        let mut url = self.endpoint(&["stations", route, country_code])?;
        url.query_pairs_mut()
            .append_pair("order", "votes")
            .append_pair("reverse", "true")
            .append_pair("limit", &candidates.to_string())
            .append_pair("hidebroken", "true");
        Ok(url)
    }

    /// `{base}/stations/byname/{query}?limit={n}&hidebroken=true&order=clickcount&reverse=true`
    pub fn search_url(&self, query: &str, limit: usize) -> Result<Url> {
        let mut url = self.endpoint(&["stations", "byname", query])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("hidebroken", "true")
            .append_pair("order", "clickcount")
            .append_pair("reverse", "true");
        Ok(url)
    }

    /// `{base}/countries`
    pub fn countries_url(&self) -> Result<Url> {
        self.endpoint(&["countries"])
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::invalid_argument(format!("Not a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Ordered mirror lists, one per query kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorRegistry {
    /// Probed by country lookups
    #[serde(default = "default_country_mirrors")]
    pub country: Vec<MirrorEndpoint>,
    /// Probed by name searches
    #[serde(default = "default_search_mirrors")]
    pub search: Vec<MirrorEndpoint>,
    /// Probed by the country listing
    #[serde(default = "default_countries_mirrors")]
    pub countries: Vec<MirrorEndpoint>,
}

impl Default for MirrorRegistry {
    fn default() -> Self {
        Self {
            country: default_country_mirrors(),
            search: default_search_mirrors(),
            countries: default_countries_mirrors(),
        }
    }
}

impl MirrorRegistry {
    /// Registry using the same list for every query kind
    pub fn uniform(mirrors: Vec<MirrorEndpoint>) -> Self {
        Self {
            country: mirrors.clone(),
            search: mirrors.clone(),
            countries: mirrors,
        }
    }
}

fn default_country_mirrors() -> Vec<MirrorEndpoint> {
    vec![
        MirrorEndpoint::new(DE1),
        MirrorEndpoint::new(AT1),
        MirrorEndpoint::new(NL1),
        MirrorEndpoint::new(ALL),
        MirrorEndpoint::new(DIRECT_IP).with_virtual_host(DEFAULT_VIRTUAL_HOST),
        MirrorEndpoint::new(DE1).relaxed(),
    ]
}

fn default_search_mirrors() -> Vec<MirrorEndpoint> {
    vec![
        MirrorEndpoint::new(DE1),
        MirrorEndpoint::new(AT1),
        MirrorEndpoint::new(DIRECT_IP).with_virtual_host(DEFAULT_VIRTUAL_HOST),
    ]
}

fn default_countries_mirrors() -> Vec<MirrorEndpoint> {
    vec![
        MirrorEndpoint::new(DE1),
        MirrorEndpoint::new(DIRECT_IP).with_virtual_host(DEFAULT_VIRTUAL_HOST),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_country_url() {
        let mirror = MirrorEndpoint::new(DE1);
        let url = mirror.country_url("TR", 250).unwrap();
        assert_eq!(
            url.as_str(),
            "https://de1.api.radio-browser.info/json/stations/bycountrycodeexact/TR?order=votes&reverse=true&limit=250&hidebroken=true"
        );
    }

    #[test]
    fn test_relaxed_country_url() {
        let mirror = MirrorEndpoint::new(DE1).relaxed();
        let url = mirror.country_url("FR", 50).unwrap();
        assert_eq!(url.path(), "/json/stations/bycountry/FR");
    }

    #[test]
    fn test_search_url_encodes_query() {
        let mirror = MirrorEndpoint::new(AT1);
        let url = mirror.search_url("jazz fm/paris", 100).unwrap();
        assert_eq!(url.path(), "/json/stations/byname/jazz%20fm%2Fparis");
        assert_eq!(
            url.query(),
            Some("limit=100&hidebroken=true&order=clickcount&reverse=true")
        );
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let mirror = MirrorEndpoint::new("http://localhost:8080/json/");
        assert_eq!(
            mirror.countries_url().unwrap().as_str(),
            "http://localhost:8080/json/countries"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mirror = MirrorEndpoint::new("not a url");
        assert!(matches!(mirror.countries_url(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_default_registry_order() {
        let registry = MirrorRegistry::default();

        assert_eq!(registry.country.len(), 6);
        assert!(!registry.country[0].requires_host_override());
        assert!(registry.country[4].requires_host_override());
        assert_eq!(registry.country[5].country_match, CountryMatch::Relaxed);
        assert!(registry.countries[1].requires_host_override());
        assert_eq!(
            registry.search[2].virtual_host.as_deref(),
            Some(DEFAULT_VIRTUAL_HOST)
        );
    }

    #[test]
    fn test_registry_from_yaml_keeps_missing_defaults() {
        let yaml = r#"
country:
  - base_url: "http://10.0.0.1/json"
    virtual_host: "de1.api.radio-browser.info"
  - base_url: "http://10.0.0.2/json"
    country_match: relaxed
"#;
        let registry: MirrorRegistry = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(registry.country.len(), 2);
        assert!(registry.country[0].requires_host_override());
        assert_eq!(registry.country[1].country_match, CountryMatch::Relaxed);
        assert_eq!(registry.search, default_search_mirrors());
    }
}
