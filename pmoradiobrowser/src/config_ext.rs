//! Extension pour intégrer Radio Browser dans pmoconfig
//!
//! Ce module fournit le trait `RadioBrowserConfigExt` qui ajoute à
//! `pmoconfig::Config` les réglages du client d'annuaire, rangés sous
//! `sources.radiobrowser`.
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmoradiobrowser::{RadioBrowserClient, RadioBrowserConfigExt};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! config.set_radiobrowser_min_bitrate(192)?;
//!
//! let client = RadioBrowserClient::from_config(&config)?;
//! # Ok(())
//! # }
//! ```

use crate::cache::DEFAULT_CACHE_TTL;
use crate::client::{ClientBuilder, RadioBrowserClient, DEFAULT_LIMIT, DEFAULT_MIN_BITRATE, DEFAULT_SEARCH_LIMIT};
use crate::fetch::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::mirrors::MirrorRegistry;
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

const SECTION: [&str; 2] = ["sources", "radiobrowser"];

fn key(name: &'static str) -> [&'static str; 3] {
    [SECTION[0], SECTION[1], name]
}

fn get_u64(config: &Config, name: &'static str, default: u64) -> u64 {
    match config.get_value(&key(name)) {
        Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
        _ => default,
    }
}

fn set_u64(config: &Config, name: &'static str, value: u64) -> Result<()> {
    config.set_value(&key(name), Value::Number(Number::from(value)))
}

/// Trait d'extension pour gérer la configuration Radio Browser dans pmoconfig
///
/// Les getters retombent sur les valeurs par défaut du client quand la clé
/// est absente ou mal typée.
pub trait RadioBrowserConfigExt {
    /// TTL des recherches par pays en cache (secondes, défaut 3600)
    fn get_radiobrowser_cache_ttl_secs(&self) -> Result<u64>;
    fn set_radiobrowser_cache_ttl_secs(&self, secs: u64) -> Result<()>;

    /// Nombre maximal d'entrées en cache (0 = illimité, défaut)
    fn get_radiobrowser_cache_capacity(&self) -> Result<usize>;
    fn set_radiobrowser_cache_capacity(&self, capacity: usize) -> Result<()>;

    /// Timeout par requête (millisecondes, défaut 15000)
    fn get_radiobrowser_request_timeout_ms(&self) -> Result<u64>;
    fn set_radiobrowser_request_timeout_ms(&self, ms: u64) -> Result<()>;

    /// Débit minimal des stations proposées (kbps, défaut 128)
    fn get_radiobrowser_min_bitrate(&self) -> Result<u32>;
    fn set_radiobrowser_min_bitrate(&self, kbps: u32) -> Result<()>;

    /// Nombre de stations par pays (défaut 50)
    fn get_radiobrowser_default_limit(&self) -> Result<usize>;
    fn set_radiobrowser_default_limit(&self, limit: usize) -> Result<()>;

    /// Nombre de résultats d'une recherche (défaut 100)
    fn get_radiobrowser_search_limit(&self) -> Result<usize>;
    fn set_radiobrowser_search_limit(&self, limit: usize) -> Result<()>;

    fn get_radiobrowser_user_agent(&self) -> Result<String>;
    fn set_radiobrowser_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Liste des miroirs configurée, ou `None` pour la liste intégrée
    fn get_radiobrowser_mirrors(&self) -> Result<Option<MirrorRegistry>>;
    fn set_radiobrowser_mirrors(&self, mirrors: &MirrorRegistry) -> Result<()>;
}

impl RadioBrowserConfigExt for Config {
    fn get_radiobrowser_cache_ttl_secs(&self) -> Result<u64> {
        Ok(get_u64(self, "cache_ttl_secs", DEFAULT_CACHE_TTL.as_secs()))
    }

    fn set_radiobrowser_cache_ttl_secs(&self, secs: u64) -> Result<()> {
        set_u64(self, "cache_ttl_secs", secs)
    }

    fn get_radiobrowser_cache_capacity(&self) -> Result<usize> {
        Ok(get_u64(self, "cache_capacity", 0) as usize)
    }

    fn set_radiobrowser_cache_capacity(&self, capacity: usize) -> Result<()> {
        set_u64(self, "cache_capacity", capacity as u64)
    }

    fn get_radiobrowser_request_timeout_ms(&self) -> Result<u64> {
        Ok(get_u64(self, "request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS))
    }

    fn set_radiobrowser_request_timeout_ms(&self, ms: u64) -> Result<()> {
        set_u64(self, "request_timeout_ms", ms)
    }

    fn get_radiobrowser_min_bitrate(&self) -> Result<u32> {
        let kbps = get_u64(self, "min_bitrate", u64::from(DEFAULT_MIN_BITRATE));
        Ok(u32::try_from(kbps).unwrap_or(DEFAULT_MIN_BITRATE))
    }

    fn set_radiobrowser_min_bitrate(&self, kbps: u32) -> Result<()> {
        set_u64(self, "min_bitrate", u64::from(kbps))
    }

    fn get_radiobrowser_default_limit(&self) -> Result<usize> {
        Ok(get_u64(self, "default_limit", DEFAULT_LIMIT as u64) as usize)
    }

    fn set_radiobrowser_default_limit(&self, limit: usize) -> Result<()> {
        set_u64(self, "default_limit", limit as u64)
    }

    fn get_radiobrowser_search_limit(&self) -> Result<usize> {
        Ok(get_u64(self, "search_limit", DEFAULT_SEARCH_LIMIT as u64) as usize)
    }

    fn set_radiobrowser_search_limit(&self, limit: usize) -> Result<()> {
        set_u64(self, "search_limit", limit as u64)
    }

    fn get_radiobrowser_user_agent(&self) -> Result<String> {
        match self.get_value(&key("user_agent")) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            _ => Ok(DEFAULT_USER_AGENT.to_string()),
        }
    }

    fn set_radiobrowser_user_agent(&self, user_agent: &str) -> Result<()> {
        self.set_value(&key("user_agent"), Value::String(user_agent.to_string()))
    }

    fn get_radiobrowser_mirrors(&self) -> Result<Option<MirrorRegistry>> {
        match self.get_value(&key("mirrors")) {
            Ok(Value::Null) | Err(_) => Ok(None),
            Ok(value) => Ok(Some(serde_yaml::from_value(value)?)),
        }
    }

    fn set_radiobrowser_mirrors(&self, mirrors: &MirrorRegistry) -> Result<()> {
        self.set_value(&key("mirrors"), serde_yaml::to_value(mirrors)?)
    }
}

impl ClientBuilder {
    /// Builder preloaded with the settings of `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .cache_ttl(Duration::from_secs(config.get_radiobrowser_cache_ttl_secs()?))
            .cache_capacity(config.get_radiobrowser_cache_capacity()?)
            .timeout(Duration::from_millis(config.get_radiobrowser_request_timeout_ms()?))
            .min_bitrate(config.get_radiobrowser_min_bitrate()?)
            .default_limit(config.get_radiobrowser_default_limit()?)
            .search_limit(config.get_radiobrowser_search_limit()?)
            .user_agent(config.get_radiobrowser_user_agent()?);

        if let Some(mirrors) = config.get_radiobrowser_mirrors()? {
            builder = builder.mirrors(mirrors);
        }

        Ok(builder)
    }
}

impl RadioBrowserClient {
    /// Create a client from the `sources.radiobrowser` settings
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        ClientBuilder::from_config(config)?.build()
    }
}
