//! Data models for Radio Browser API responses
//!
//! The directory serves loosely typed JSON: numeric fields may be `null`,
//! and the health flag is an integer (`0`/`1`). The deserializers below accept
//! those shapes so that one odd record doesn't invalidate a whole mirror answer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Station Models
// ============================================================================

/// One broadcast advertised by the directory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationRecord {
    /// Unique identifier
    #[serde(rename = "stationuuid", deserialize_with = "null_as_default")]
    pub uuid: String,
    /// Display name
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Declared stream URL
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    /// Stream URL resolved by the directory (playlists unwrapped, redirects followed)
    #[serde(deserialize_with = "null_as_default")]
    pub url_resolved: String,
    #[serde(deserialize_with = "null_as_default")]
    pub homepage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub favicon: String,
    /// Comma-separated tags
    #[serde(deserialize_with = "null_as_default")]
    pub tags: String,
    /// Codec label (e.g. "MP3", "AAC+")
    #[serde(deserialize_with = "null_as_default")]
    pub codec: String,
    /// Bitrate in kbps
    #[serde(deserialize_with = "lenient_count")]
    pub bitrate: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(rename = "countrycode", deserialize_with = "null_as_default")]
    pub country_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    /// Whether the directory's last health check succeeded
    #[serde(rename = "lastcheckok", deserialize_with = "lenient_flag")]
    pub last_check_ok: bool,
    #[serde(deserialize_with = "lenient_count")]
    pub votes: u32,
    #[serde(rename = "clickcount", deserialize_with = "lenient_count")]
    pub click_count: u32,
}

impl StationRecord {
    /// URL to hand to a player: the resolved URL when present, the declared one otherwise
    ///
    /// Returns an empty string when neither is usable.
    pub fn stream_url(&self) -> &str {
        let resolved = self.url_resolved.trim();
        if !resolved.is_empty() {
            return resolved;
        }
        self.url.trim()
    }

    /// Whether the station can be offered for playback
    ///
    /// Requires a passing health check, a usable stream URL and a bitrate of
    /// at least `min_bitrate` kbps.
    pub fn is_eligible(&self, min_bitrate: u32) -> bool {
        self.last_check_ok && !self.stream_url().is_empty() && self.bitrate >= min_bitrate
    }
}

/// Apply the eligibility filter, then keep at most `limit` records
pub fn filter_eligible(
    stations: Vec<StationRecord>,
    min_bitrate: u32,
    limit: usize,
) -> Vec<StationRecord> {
    stations
        .into_iter()
        .filter(|station| station.is_eligible(min_bitrate))
        .take(limit)
        .collect()
}

// ============================================================================
// Country Models
// ============================================================================

/// Entry of the `/countries` listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CountryInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// ISO 3166-1 alpha-2 code, when the mirror provides it
    #[serde(rename = "iso_3166_1", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "stationcount", deserialize_with = "lenient_count")]
    pub station_count: u32,
}

// ============================================================================
// Lookup results
// ============================================================================

/// Where the stations of a lookup came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    /// Fresh cache entry, no network call was made
    Cache,
    /// Answer accepted from a mirror (base URL)
    Network { mirror: String },
    /// Every mirror failed: a cache entry past its TTL was served instead
    Stale,
}

/// Stations returned by a country lookup, with their origin
#[derive(Debug, Clone, PartialEq)]
pub struct StationLookup {
    pub stations: Vec<StationRecord>,
    pub origin: DataOrigin,
}

impl StationLookup {
    /// Whether the data was served from an expired cache entry
    pub fn is_stale(&self) -> bool {
        self.origin == DataOrigin::Stale
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers, floats, numeric strings and null; negatives become 0
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(count.min(u64::from(u32::MAX)) as u32)
}

/// Accepts `1`/`0`, booleans and their string forms; anything else is false
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}
