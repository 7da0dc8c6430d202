//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Durations are written the human way (`"300ms"`, `"30s"`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rampart_core::{RampartError, RampartResult};
use rampart_report::ErrorLogConfig;
use serde::{Deserialize, Serialize};

/// Default session storage quota (5 MiB, the usual browser allowance)
pub const DEFAULT_SESSION_QUOTA: usize = 5 * 1024 * 1024;

/// Upper bound on every configured delay, cooldown and cache lifetime
pub const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampartConfig {
    pub errors: ErrorLogConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub health: HealthConfig,
}

impl RampartConfig {
    pub fn from_json_str(json: &str) -> RampartResult<Self> {
        let config: RampartConfig =
            serde_json::from_str(json).map_err(|e| RampartError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RampartResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> RampartResult<()> {
        if self.errors.capacity == 0 {
            return Err(RampartError::Config(
                "errors.capacity must be at least 1".into(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(RampartError::Config("logging.level must not be empty".into()));
        }
        if self.limits.scroll_throttle.is_zero() {
            return Err(RampartError::Config(
                "limits.scroll_throttle must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("limits.search_debounce", self.limits.search_debounce),
            ("limits.scroll_throttle", self.limits.scroll_throttle),
            ("health.cache_ttl", self.health.cache_ttl),
        ] {
            if value > MAX_CONFIGURED_DURATION {
                return Err(RampartError::Config(format!(
                    "{name} must not exceed {}",
                    humantime::format_duration(MAX_CONFIGURED_DURATION)
                )));
            }
        }
        Ok(())
    }
}

/// Output format of the tracing subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File backing the local area; in memory when unset
    pub persistent_path: Option<PathBuf>,
    /// Byte quota of the session area; unlimited when unset
    pub session_quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            persistent_path: None,
            session_quota_bytes: Some(DEFAULT_SESSION_QUOTA),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    #[serde(with = "human_duration")]
    pub search_debounce: Duration,
    #[serde(with = "human_duration")]
    pub scroll_throttle: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            search_debounce: Duration::from_millis(300),
            scroll_throttle: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    #[serde(with = "human_duration")]
    pub cache_ttl: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            cache_ttl: Duration::from_secs(30),
        }
    }
}

mod human_duration {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}
