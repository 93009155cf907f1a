//! Tracing subscriber initialization.

use docvault_core::ConfigError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "docvault=info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, multi-line.
    Pretty,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Read `DOCVAULT_LOG_FORMAT` (`json` or `pretty`, default json).
    pub fn from_env() -> Self {
        let format = match std::env::var("DOCVAULT_LOG_FORMAT")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };
        Self {
            format,
            ..Default::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already installed, which callers that
/// may initialize more than once can ignore.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| ConfigError::InvalidValue {
        field: "tracing_subscriber".to_string(),
        value: format!("{:?}", config.format),
        reason: e.to_string(),
    })?;

    tracing::info!(
        format = ?config.format,
        default_filter = %config.default_filter,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_filter, "docvault=info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_second_init_fails_cleanly() {
        let config = TelemetryConfig::default();
        let _ = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(matches!(second, Err(ConfigError::InvalidValue { .. })));
    }
}
