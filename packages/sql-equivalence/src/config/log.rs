use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use crate::error::ConfigError;
use crate::log::LOG_TARGETS;

/// Global level plus optional per-target overrides, keyed by the names in [`LOG_TARGETS`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub targets: BTreeMap<String, LogLevel>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    // Serde has no case insensitive option, so each accepted spelling is an alias
    #[default]
    #[serde(alias = "Text", alias = "TEXT")]
    Text,
    #[serde(alias = "Structured", alias = "STRUCTURED", alias = "json")]
    Structured,
}

/// Ordered from least to most verbose.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, <LogLevel as TryFrom<String>>::Error> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level '{value}'")),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        LogConfig {
            level,
            ..Default::default()
        }
    }

    /// Overrides the level of one target.
    pub fn target(mut self, target: &str, level: LogLevel) -> Self {
        self.targets.insert(target.to_string(), level);
        self
    }

    pub fn level_for(&self, target: &str) -> LogLevel {
        self.targets.get(target).copied().unwrap_or(self.level)
    }

    /// Most verbose level enabled anywhere.
    pub fn max_level(&self) -> LogLevel {
        self.targets.values().copied().fold(self.level, Ord::max)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self.targets.keys().find(|key| !LOG_TARGETS.contains(&key.as_str())) {
            Some(key) => Err(ConfigError::InvalidParameter {
                name: "log.targets".to_string(),
                value: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}
