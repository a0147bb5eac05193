//! Content cache configuration.

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_TTL_SECONDS: u64 = 15 * 60;
const DEFAULT_ENTRY_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup goes straight to the store.
    pub enabled: bool,
    /// Lifetime of an entry from the moment it is stored.
    pub ttl_seconds: u64,
    /// Maximum number of live entries before least-recently-used eviction.
    pub entry_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            entry_limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl.as_secs(),
            entry_limit: settings.entry_limit.get(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// The entry limit as `NonZeroUsize`, clamping zero to one.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
