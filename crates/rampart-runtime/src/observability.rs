//! Tracing subscriber setup

use rampart_core::{RampartError, RampartResult};
use tracing_subscriber::EnvFilter;

use crate::{LogFormat, LoggingConfig};

/// Build the filter: `RUST_LOG` when set, the configured level otherwise
pub fn env_filter(config: &LoggingConfig) -> RampartResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| RampartError::Config(format!("invalid log level {:?}: {e}", config.level)))
}

/// Install the global tracing subscriber.
///
/// Fails when the level cannot be parsed or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> RampartResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| RampartError::Config(format!("logging already initialised: {e}")))?;
    tracing::debug!(level = %config.level, format = ?config.format, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            ansi: false,
            ..LoggingConfig::default()
        };
        // Another test may have installed a subscriber first
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(RampartError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "rampart=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(env_filter(&config), Err(RampartError::Config(_))));
    }
}
