//! Extension pour intégrer le lecteur dans pmoconfig
//!
//! Ce module fournit le trait `PlayerConfigExt` qui expose les réglages du
//! moteur de lecture, rangés sous `player` :
//!
//! ```yaml
//! player:
//!   default_volume: 0.5
//!   watchdog_ms: 6000
//!   fade_ms: 2000
//! ```

use crate::engine::{clamp_volume, PlayerSettings, DEFAULT_FADE, DEFAULT_VOLUME, DEFAULT_WATCHDOG};
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

/// Trait d'extension pour gérer la configuration du lecteur dans pmoconfig
pub trait PlayerConfigExt {
    /// Volume initial (0.0 à 1.0, défaut 0.5)
    fn get_player_default_volume(&self) -> Result<f32>;
    fn set_player_default_volume(&self, volume: f32) -> Result<()>;

    /// Délai accordé au décodeur principal avant le repli (défaut 6000 ms)
    fn get_player_watchdog_ms(&self) -> Result<u64>;
    fn set_player_watchdog_ms(&self, ms: u64) -> Result<()>;

    /// Durée du fondu de sortie (défaut 2000 ms)
    fn get_player_fade_ms(&self) -> Result<u64>;
    fn set_player_fade_ms(&self, ms: u64) -> Result<()>;
}

impl PlayerConfigExt for Config {
    fn get_player_default_volume(&self) -> Result<f32> {
        match self.get_value(&["player", "default_volume"]) {
            Ok(Value::Number(n)) => Ok(n
                .as_f64()
                .map(|v| clamp_volume(v as f32))
                .unwrap_or(DEFAULT_VOLUME)),
            _ => Ok(DEFAULT_VOLUME),
        }
    }

    fn set_player_default_volume(&self, volume: f32) -> Result<()> {
        let volume = f64::from(clamp_volume(volume));
        self.set_value(&["player", "default_volume"], Value::Number(Number::from(volume)))
    }

    fn get_player_watchdog_ms(&self) -> Result<u64> {
        match self.get_value(&["player", "watchdog_ms"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or(DEFAULT_WATCHDOG.as_millis() as u64)),
            _ => Ok(DEFAULT_WATCHDOG.as_millis() as u64),
        }
    }

    fn set_player_watchdog_ms(&self, ms: u64) -> Result<()> {
        self.set_value(&["player", "watchdog_ms"], Value::Number(Number::from(ms)))
    }

    fn get_player_fade_ms(&self) -> Result<u64> {
        match self.get_value(&["player", "fade_ms"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or(DEFAULT_FADE.as_millis() as u64)),
            _ => Ok(DEFAULT_FADE.as_millis() as u64),
        }
    }

    fn set_player_fade_ms(&self, ms: u64) -> Result<()> {
        self.set_value(&["player", "fade_ms"], Value::Number(Number::from(ms)))
    }
}

impl PlayerSettings {
    /// Settings read from the `player` section of `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            default_volume: config.get_player_default_volume()?,
            watchdog: Duration::from_millis(config.get_player_watchdog_ms()?),
            fade: Duration::from_millis(config.get_player_fade_ms()?),
        })
    }
}
