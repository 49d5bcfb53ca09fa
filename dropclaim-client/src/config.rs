//! Client configuration.

use std::time::Duration;

use dropclaim_core::RetryConfig;

/// Default query cache capacity (number of query results).
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Settings shared by every client operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Capacity of the process-wide query cache.
    pub cache_capacity: usize,
    /// Retry policy for direct (non-query) calls.
    pub retry: RetryConfig,
    /// Listing limit used when the caller gives none. `None` returns every
    /// campaign.
    pub default_list_limit: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_SIZE,
            retry: RetryConfig::default(),
            default_list_limit: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by environment variables:
    ///
    /// - `DROPCLAIM_CACHE_SIZE`
    /// - `DROPCLAIM_MAX_RETRIES`
    /// - `DROPCLAIM_BASE_DELAY_MS`
    /// - `DROPCLAIM_MAX_DELAY_MS`
    ///
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = Self::default();

        let retry = RetryConfig {
            max_retries: parse("DROPCLAIM_MAX_RETRIES")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.retry.max_retries),
            base_delay: parse("DROPCLAIM_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            max_delay: parse("DROPCLAIM_MAX_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
            ..defaults.retry
        }
        .validated();

        Self {
            cache_capacity: parse("DROPCLAIM_CACHE_SIZE")
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.cache_capacity),
            retry,
            default_list_limit: defaults.default_list_limit,
        }
    }
}
