mod log;

use crate::error::{ConfigError, Error};
use crate::log::CONFIG;
use crate::tree::{Pruner, PRUNED_KEYS};
use config::{Config, Environment};
use serde::Deserialize;
use tracing::debug;

pub use log::{LogConfig, LogFormat, LogLevel};

pub const SQLEQ_PREFIX: &str = "SQLEQ";
pub const DEFAULT_CONFIG_FILE_PATH: &str = "sql-equivalence.toml";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EquivalenceConfig {
    #[serde(default)]
    pub prune: PruneConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PruneConfig {
    #[serde(default = "PruneConfig::default_keys")]
    pub keys: Vec<String>,
}

/// Config is read from an optional file (TOML or JSON) at `path`.
/// Field names match the struct field names.
///
/// ENV vars prefixed with `SQLEQ_` override file settings, with `__` between nested keys:
/// `SQLEQ_LOG__LEVEL=debug`, `SQLEQ_LOG__TARGETS__PRUNE=trace`, `SQLEQ_PRUNE__KEYS=location,op`.
impl EquivalenceConfig {
    pub fn default_path() -> String {
        DEFAULT_CONFIG_FILE_PATH.to_string()
    }

    pub fn build(path: &str) -> Result<Self, Error> {
        let env_source = Environment::with_prefix(SQLEQ_PREFIX)
            .try_parsing(true)
            .separator("__")
            .prefix_separator("_")
            .list_separator(",")
            .with_list_parse_key("prune.keys");

        let config: Self = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(env_source)
            .build()?
            .try_deserialize()
            .map_err(|err| match err {
                config::ConfigError::Message(ref s)
                    if s.contains("does not have variant constructor") =>
                {
                    let (name, value) = extract_invalid_field(s);
                    ConfigError::InvalidParameter { name, value }
                }
                _ => err.into(),
            })?;

        config.prune.validate()?;
        config.log.validate()?;

        debug!(
            target: CONFIG,
            prune_keys = ?config.prune.keys,
            level = %config.log.level,
            "Loaded config"
        );

        Ok(config)
    }

    pub fn pruner(&self) -> Pruner {
        Pruner::from(&self.prune)
    }
}

impl PruneConfig {
    pub fn default_keys() -> Vec<String> {
        PRUNED_KEYS.iter().map(|key| key.to_string()).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.keys.iter().find(|key| key.trim().is_empty()) {
            Some(key) => Err(ConfigError::InvalidParameter {
                name: "prune.keys".to_string(),
                value: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for PruneConfig {
    fn default() -> Self {
        PruneConfig {
            keys: PruneConfig::default_keys(),
        }
    }
}

impl From<&PruneConfig> for Pruner {
    fn from(config: &PruneConfig) -> Self {
        Pruner::new(config.keys.iter().map(|key| key.trim()))
    }
}

///
/// Error string is `enum {name} does not have variant constructor {value}`
///
fn extract_invalid_field(input: &str) -> (String, String) {
    let words = input.split(' ').collect::<Vec<_>>();

    let default_name = "unknown".to_string();
    let default_val = "".to_string();

    if !input.starts_with("enum") {
        return (default_name, default_val);
    }

    let name = words.get(1).map_or(default_name, |w| w.to_string());
    let value = words.last().map_or(default_val, |w| w.to_string());

    (name, value)
}
