//! Radio Browser directory client for PMORadio
//!
//! This crate queries the public, mirrored [Radio Browser](https://www.radio-browser.info)
//! directory and copes with its unreliable mirrors.
//!
//! # Features
//!
//! - **Mirror failover**: every query walks an ordered list of interchangeable
//!   mirrors, strictly sequentially, including a raw-IP mirror reached with a
//!   virtual-host header
//! - **Quality filter**: country lookups only return stations whose last health
//!   check passed, with a usable stream URL and a minimum bitrate
//! - **Response cache**: country lookups are cached per query with a TTL, and
//!   expired entries are served when every mirror is down
//! - **Pluggable transport**: requests go through the [`Fetcher`] trait
//! - **Configuration Extension**: settings under `sources.radiobrowser` in pmoconfig
//!
//! # Example
//!
//! ```no_run
//! use pmoradiobrowser::{DataOrigin, RadioBrowserClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RadioBrowserClient::new()?;
//!
//!     let lookup = client.fetch_stations_by_country_detailed("DE", 20, 128).await?;
//!     if lookup.origin == DataOrigin::Stale {
//!         println!("Directory unreachable, showing cached stations");
//!     }
//!     for station in &lookup.stations {
//!         println!("{} - {}", station.name, station.stream_url());
//!     }
//!
//!     let hits = client.search_stations("jazz", 10).await?;
//!     println!("{} stations match 'jazz'", hits.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config_ext;
pub mod countries;
pub mod error;
pub mod fetch;
pub mod mirrors;
pub mod models;

// Re-exports
pub use cache::{CacheEntry, ResponseCache};
pub use client::{cache_key, ClientBuilder, RadioBrowserClient};
pub use config_ext::RadioBrowserConfigExt;
pub use countries::{country_by_code, flag_emoji, popular_countries, search_countries, Country};
pub use error::{Error, Result};
pub use fetch::{FetchRequest, Fetcher, HttpFetcher};
pub use mirrors::{CountryMatch, MirrorEndpoint, MirrorRegistry};
pub use models::{CountryInfo, DataOrigin, StationLookup, StationRecord};
