//! Engine configuration

use crate::ConfigError;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_CACHE_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const DEFAULT_LIST_MAX_LIMIT: usize = 500;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 100;
pub const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 10_000;
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

// ============================================================================
// CACHE WRITE MODE
// ============================================================================

/// How post-commit cache work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheWriteMode {
    /// Spawned on the current Tokio runtime; the saga returns without
    /// waiting. Outside a runtime the work runs inline.
    #[default]
    Background,
    /// Awaited before the saga returns.
    Inline,
}

impl CacheWriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheWriteMode::Background => "background",
            CacheWriteMode::Inline => "inline",
        }
    }
}

impl FromStr for CacheWriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "background" => Ok(CacheWriteMode::Background),
            "inline" => Ok(CacheWriteMode::Inline),
            _ => Err(ConfigError::InvalidValue {
                field: "cache_write_mode".to_string(),
                value: s.to_string(),
                reason: "expected 'background' or 'inline'".to_string(),
            }),
        }
    }
}

// ============================================================================
// RETRY
// ============================================================================

/// Retry policy for a durable executor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_RETRY_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_RETRY_MAX_BACKOFF_MS),
            backoff_multiplier: DEFAULT_RETRY_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    /// Backoff to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", self.max_attempts, "must be at least 1"));
        }
        if !(self.backoff_multiplier > 0.0) {
            return Err(invalid(
                "retry.backoff_multiplier",
                self.backoff_multiplier,
                "must be positive",
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(invalid(
                "retry.initial_backoff",
                format!("{:?}", self.initial_backoff),
                "must not exceed retry.max_backoff",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Top-level configuration for the saga coordinator and read router.
#[derive(Debug, Clone, PartialEq)]
pub struct DocVaultConfig {
    /// TTL applied to both cache keys of a document (default: 15 minutes)
    pub cache_ttl: Duration,

    /// Scheduling of post-commit cache population and eviction
    pub cache_write_mode: CacheWriteMode,

    /// Whether a read miss writes the fetched payload back to the cache
    /// (default: false, only saves populate the cache)
    pub repopulate_on_miss: bool,

    /// Limit used when a list request asks for zero
    pub list_default_limit: usize,

    /// Upper bound on any list request
    pub list_max_limit: usize,

    pub retry: RetryConfig,
}

impl Default for DocVaultConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_write_mode: CacheWriteMode::Background,
            repopulate_on_miss: false,
            list_default_limit: DEFAULT_LIST_LIMIT,
            list_max_limit: DEFAULT_LIST_MAX_LIMIT,
            retry: RetryConfig::default(),
        }
    }
}

impl DocVaultConfig {
    /// Create DocVaultConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `DOCVAULT_CACHE_TTL_SECS`: cache TTL (default: 900)
    /// - `DOCVAULT_CACHE_WRITE_MODE`: `background` or `inline` (default: background)
    /// - `DOCVAULT_CACHE_REPOPULATE_ON_MISS`: repopulate cache on read miss (default: false)
    /// - `DOCVAULT_LIST_DEFAULT_LIMIT`: list limit when none given (default: 50)
    /// - `DOCVAULT_LIST_MAX_LIMIT`: list limit cap (default: 500)
    /// - `DOCVAULT_RETRY_MAX_ATTEMPTS`: executor attempts (default: 1)
    /// - `DOCVAULT_RETRY_INITIAL_BACKOFF_MS`: first backoff (default: 100)
    /// - `DOCVAULT_RETRY_MAX_BACKOFF_MS`: backoff cap (default: 10000)
    /// - `DOCVAULT_RETRY_BACKOFF_MULTIPLIER`: backoff growth (default: 2.0)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl = Duration::from_secs(
            parse_var(&lookup, "DOCVAULT_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let cache_write_mode = lookup("DOCVAULT_CACHE_WRITE_MODE")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let repopulate_on_miss = lookup("DOCVAULT_CACHE_REPOPULATE_ON_MISS")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let retry = RetryConfig {
            max_attempts: parse_var(&lookup, "DOCVAULT_RETRY_MAX_ATTEMPTS")
                .unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS),
            initial_backoff: Duration::from_millis(
                parse_var(&lookup, "DOCVAULT_RETRY_INITIAL_BACKOFF_MS")
                    .unwrap_or(DEFAULT_RETRY_INITIAL_BACKOFF_MS),
            ),
            max_backoff: Duration::from_millis(
                parse_var(&lookup, "DOCVAULT_RETRY_MAX_BACKOFF_MS")
                    .unwrap_or(DEFAULT_RETRY_MAX_BACKOFF_MS),
            ),
            backoff_multiplier: parse_var(&lookup, "DOCVAULT_RETRY_BACKOFF_MULTIPLIER")
                .unwrap_or(DEFAULT_RETRY_BACKOFF_MULTIPLIER),
        };

        Self {
            cache_ttl,
            cache_write_mode,
            repopulate_on_miss,
            list_default_limit: parse_var(&lookup, "DOCVAULT_LIST_DEFAULT_LIMIT")
                .unwrap_or(DEFAULT_LIST_LIMIT),
            list_max_limit: parse_var(&lookup, "DOCVAULT_LIST_MAX_LIMIT")
                .unwrap_or(DEFAULT_LIST_MAX_LIMIT),
            retry,
        }
    }

    /// Configuration suited to tests: inline cache writes, no retries.
    pub fn for_tests() -> Self {
        Self {
            cache_write_mode: CacheWriteMode::Inline,
            ..Default::default()
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_write_mode(mut self, mode: CacheWriteMode) -> Self {
        self.cache_write_mode = mode;
        self
    }

    pub fn with_repopulate_on_miss(mut self, repopulate: bool) -> Self {
        self.repopulate_on_miss = repopulate;
        self
    }

    pub fn with_list_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.list_default_limit = default_limit;
        self.list_max_limit = max_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", "0", "must be positive"));
        }
        if self.list_default_limit == 0 {
            return Err(invalid("list_default_limit", 0, "must be positive"));
        }
        if self.list_max_limit == 0 {
            return Err(invalid("list_max_limit", 0, "must be positive"));
        }
        if self.list_default_limit > self.list_max_limit {
            return Err(invalid(
                "list_default_limit",
                self.list_default_limit,
                "must not exceed list_max_limit",
            ));
        }
        self.retry.validate()
    }
}

/// Parse one variable, treating absence and garbage alike.
fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DocVaultConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert_eq!(config.cache_write_mode, CacheWriteMode::Background);
        assert!(!config.repopulate_on_miss);
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = DocVaultConfig::from_lookup(lookup_from(&[
            ("DOCVAULT_CACHE_TTL_SECS", "60"),
            ("DOCVAULT_CACHE_WRITE_MODE", "INLINE"),
            ("DOCVAULT_CACHE_REPOPULATE_ON_MISS", "true"),
            ("DOCVAULT_LIST_DEFAULT_LIMIT", "5"),
            ("DOCVAULT_LIST_MAX_LIMIT", "20"),
            ("DOCVAULT_RETRY_MAX_ATTEMPTS", "4"),
            ("DOCVAULT_RETRY_INITIAL_BACKOFF_MS", "10"),
            ("DOCVAULT_RETRY_MAX_BACKOFF_MS", "80"),
            ("DOCVAULT_RETRY_BACKOFF_MULTIPLIER", "3.0"),
        ]));

        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_write_mode, CacheWriteMode::Inline);
        assert!(config.repopulate_on_miss);
        assert_eq!(config.list_default_limit, 5);
        assert_eq!(config.list_max_limit, 20);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.retry.max_backoff, Duration::from_millis(80));
        assert_eq!(config.retry.backoff_multiplier, 3.0);
    }

    #[test]
    fn test_from_lookup_falls_back_on_garbage() {
        let config = DocVaultConfig::from_lookup(lookup_from(&[
            ("DOCVAULT_CACHE_TTL_SECS", "soon"),
            ("DOCVAULT_CACHE_WRITE_MODE", "sideways"),
        ]));
        assert_eq!(config, DocVaultConfig::default());
    }

    #[test]
    fn test_from_lookup_parses_each_field_at_its_own_width() {
        let config = DocVaultConfig::from_lookup(lookup_from(&[
            ("DOCVAULT_CACHE_TTL_SECS", "5000000000"),
            ("DOCVAULT_RETRY_MAX_ATTEMPTS", "5000000000"),
            ("DOCVAULT_LIST_MAX_LIMIT", " 75 "),
        ]));
        assert_eq!(config.cache_ttl, Duration::from_secs(5_000_000_000));
        assert_eq!(config.retry.max_attempts, DEFAULT_RETRY_MAX_ATTEMPTS);
        assert_eq!(config.list_max_limit, 75);
        assert_eq!(config.list_default_limit, DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(DocVaultConfig::default()
            .with_cache_ttl(Duration::ZERO)
            .validate()
            .is_err());
        assert!(DocVaultConfig::default()
            .with_list_limits(100, 10)
            .validate()
            .is_err());
        assert!(DocVaultConfig::default()
            .with_retry(RetryConfig::default().with_max_attempts(0))
            .validate()
            .is_err());
        assert!(DocVaultConfig::default()
            .with_retry(
                RetryConfig::default()
                    .with_initial_backoff(Duration::from_secs(60))
                    .with_max_backoff(Duration::from_secs(1))
            )
            .validate()
            .is_err());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig::default()
            .with_initial_backoff(Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(350));
        assert_eq!(retry.backoff_for(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_for(3), Duration::from_millis(350));
        assert_eq!(retry.backoff_for(10), Duration::from_millis(350));
    }

    #[test]
    fn test_cache_write_mode_parse() {
        assert_eq!("inline".parse::<CacheWriteMode>(), Ok(CacheWriteMode::Inline));
        assert!("never".parse::<CacheWriteMode>().is_err());
    }
}
