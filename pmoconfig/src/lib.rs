//! # PMORadio Configuration
//!
//! One YAML document holds the settings of every PMORadio component. It is
//! built at load time from three layers, later ones winning:
//!
//! 1. the defaults embedded in the binary (`pmoradio.yaml`);
//! 2. `config.yaml` in the configuration directory;
//! 3. `PMORADIO_CONFIG__SECTION__KEY=value` environment variables.
//!
//! Keys are case-insensitive (stored lowercase). The merged document is
//! written back to `config.yaml`, and every setter saves it again.
//!
//! Components do not define their settings here: each crate adds an extension
//! trait on [`Config`] (`RadioBrowserConfigExt`, `PlayerConfigExt`) built on
//! [`Config::get_value`] and [`Config::set_value`].
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmoradio.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMORadio configuration"));
}

const ENV_CONFIG_DIR: &str = "PMORADIO_CONFIG";
const ENV_PREFIX: &str = "PMORADIO_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmoradio";
const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Shared, persisted configuration document
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Load the configuration, creating its directory if needed
    ///
    /// An empty `directory` selects, in order: `$PMORADIO_CONFIG`, `./.pmoradio`
    /// if it exists, `~/.pmoradio` if it exists, and finally `./.pmoradio`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = resolve_dir(directory);
        prepare_dir(&dir)?;
        let file = dir.join(CONFIG_FILE_NAME);
        info!(config_dir = %dir.display(), "Using config directory");

        let mut document = lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read_to_string(&file) {
            Ok(text) => {
                let user: Value = serde_yaml::from_str(&text)
                    .with_context(|| format!("Invalid YAML in {}", file.display()))?;
                merge_yaml(&mut document, &lowercase_keys(user));
                info!(config_file = %file.display(), "Loaded config file");
            }
            Err(_) => info!(config_file = %file.display(), "No config file, using embedded defaults"),
        }

        for (path, value) in env_overrides(env::vars()) {
            let path: Vec<&str> = path.iter().map(String::as_str).collect();
            debug!(key = %path.join("."), "Applying environment override");
            // Overrides that do not fit the document shape are skipped
            let _ = write_path(&mut document, &path, value);
        }

        let config = Self {
            dir,
            file,
            data: Mutex::new(document),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Write the document to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(&self.file, text)
            .with_context(|| format!("Cannot write {}", self.file.display()))
    }

    /// Set the value at `path` (e.g. `&["player", "fade_ms"]`), then save
    ///
    /// Missing intermediate sections are created.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        write_path(&mut self.data.lock(), path, value)?;
        self.save()
    }

    /// Value at `path`; an error if any segment is missing
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        read_path(&self.data.lock(), path).cloned()
    }

    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(level)) => Ok(level),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    pub fn get_log_enable_console(&self) -> Result<bool> {
        match self.get_value(&["host", "logger", "enable_console"]) {
            Ok(Value::Bool(enabled)) => Ok(enabled),
            _ => Ok(DEFAULT_LOG_ENABLE_CONSOLE),
        }
    }

    pub fn set_log_enable_console(&self, enabled: bool) -> Result<()> {
        self.set_value(&["host", "logger", "enable_console"], Value::Bool(enabled))
    }
}

/// Process-wide configuration, loaded on first access
///
/// Components never reach for it on their own: the application hands it to
/// them through their `from_config` constructors.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn resolve_dir(directory: &str) -> PathBuf {
    if !directory.is_empty() {
        return PathBuf::from(directory);
    }
    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory taken from environment");
        return PathBuf::from(from_env);
    }

    let local = PathBuf::from(CONFIG_DIR_NAME);
    if local.is_dir() {
        return local;
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .filter(|dir| dir.is_dir())
        .unwrap_or(local)
}

/// Create `dir` if needed and check that it accepts writes
fn prepare_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"test")
        .and_then(|_| fs::remove_file(&probe))
        .with_context(|| format!("{} is not writable", dir.display()))
}

fn read_path<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter().enumerate().try_fold(root, |node, (depth, key)| {
        let map = node
            .as_mapping()
            .ok_or_else(|| anyhow!("{} is not a section", path[..depth].join(".")))?;
        map.get(Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))
    })
}

fn write_path(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("Cannot descend into {key}: parent is not a section"))?;
        node = map
            .entry(Value::String(key.to_lowercase()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    node.as_mapping_mut()
        .ok_or_else(|| anyhow!("Cannot set {last}: parent is not a section"))?
        .insert(Value::String(last.to_lowercase()), value);
    Ok(())
}

/// `PMORADIO_CONFIG__A__B=v` pairs as (`["a", "b"]`, YAML-parsed `v`)
fn env_overrides(vars: impl Iterator<Item = (String, String)>) -> Vec<(Vec<String>, Value)> {
    vars.filter_map(|(name, raw)| {
        let path = name.strip_prefix(ENV_PREFIX)?;
        let path: Vec<String> = path.split("__").map(str::to_lowercase).collect();
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
        Some((path, value))
    })
    .collect()
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(value))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Overlay `user` on `base`: sections merge key by key, anything else replaces
fn merge_yaml(base: &mut Value, user: &Value) {
    match (base, user) {
        (Value::Mapping(base), Value::Mapping(user)) => {
            for (key, value) in user {
                match base.get_mut(key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, user) => *base = user.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Number;

    fn load(dir: &tempfile::TempDir) -> Result<Config> {
        Config::load_config(&dir.path().to_string_lossy())
    }

    #[test]
    fn test_load_config_writes_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load(&dir)?;

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.directory(), dir.path());
        assert!(config.get_value(&["player"]).is_ok());
        assert!(config.get_value(&["sources", "radiobrowser"]).is_ok());
        Ok(())
    }

    #[test]
    fn test_external_file_is_merged_over_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("config.yaml"), "player:\n  Fade_MS: 500\n")?;

        let config = load(&dir)?;

        // Keys are lowercased, untouched defaults survive
        assert_eq!(
            config.get_value(&["player", "fade_ms"])?,
            Value::Number(Number::from(500))
        );
        assert!(config.get_value(&["player", "watchdog_ms"]).is_ok());
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("config.yaml"), "player: [unclosed\n")?;
        assert!(load(&dir).is_err());
        Ok(())
    }

    #[test]
    fn test_set_value_persists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load(&dir)?;
        config.set_value(&["custom", "Nested", "key"], Value::String("v".into()))?;

        let reloaded = load(&dir)?;
        assert_eq!(
            reloaded.get_value(&["CUSTOM", "nested", "key"])?,
            Value::String("v".into())
        );
        Ok(())
    }

    #[test]
    fn test_missing_path_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load(&dir)?;
        assert!(config.get_value(&["does", "not", "exist"]).is_err());
        assert!(config.get_value(&["player", "fade_ms", "deeper"]).is_err());
        Ok(())
    }

    #[test]
    fn test_set_value_below_a_scalar_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load(&dir)?;
        assert!(config
            .set_value(&["player", "fade_ms", "unit"], Value::String("ms".into()))
            .is_err());
        Ok(())
    }

    #[test]
    fn test_log_settings() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load(&dir)?;

        assert_eq!(config.get_log_min_level()?, "INFO");
        assert!(config.get_log_enable_console()?);

        config.set_log_min_level("DEBUG".to_string())?;
        config.set_log_enable_console(false)?;
        assert_eq!(config.get_log_min_level()?, "DEBUG");
        assert!(!config.get_log_enable_console()?);
        Ok(())
    }

    #[test]
    fn test_env_overrides_parse_paths_and_values() {
        let vars = vec![
            ("PMORADIO_CONFIG__PLAYER__WATCHDOG_MS".to_string(), "3000".to_string()),
            ("PMORADIO_CONFIG__HOST__LOGGER__MIN_LEVEL".to_string(), "DEBUG".to_string()),
            ("PMORADIO_CONFIG".to_string(), "/tmp/ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];

        let overrides = env_overrides(vars.into_iter());

        assert_eq!(
            overrides,
            vec![
                (
                    vec!["player".to_string(), "watchdog_ms".to_string()],
                    Value::Number(Number::from(3000))
                ),
                (
                    vec!["host".to_string(), "logger".to_string(), "min_level".to_string()],
                    Value::String("DEBUG".into())
                ),
            ]
        );
    }

    #[test]
    fn test_merge_yaml_replaces_scalars_and_sequences() {
        let mut base: Value = serde_yaml::from_str("a: 1\nb: [1, 2]\nc: {d: 1}").unwrap();
        let user: Value = serde_yaml::from_str("b: [3]\nc: {e: 2}").unwrap();

        merge_yaml(&mut base, &user);

        let expected: Value = serde_yaml::from_str("a: 1\nb: [3]\nc: {d: 1, e: 2}").unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn test_lowercase_keys_recurses_into_sequences() {
        let value: Value = serde_yaml::from_str("Mirrors:\n  - Base_URL: x\n").unwrap();
        let expected: Value = serde_yaml::from_str("mirrors:\n  - base_url: x\n").unwrap();
        assert_eq!(lowercase_keys(value), expected);
    }
}
