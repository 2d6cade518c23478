//! Cache sizing configuration.
use crate::error::ConfigError;

/// Default byte budget for cached response values (1 MiB).
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1024 * 1024;

/// Default largest single response the cache will hold (100 KiB).
///
/// Responses above this are expected to be relayed uncached by the caller.
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 100 * 1024;

/// Sizing limits for a [`ResponseCache`](crate::cache::ResponseCache).
///
/// `max_size` bounds the total value bytes held at once; `max_object_size`
/// bounds a single value. Both are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Total value-byte budget.
    pub max_size: usize,
    /// Largest single value admitted.
    pub max_object_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_CACHE_SIZE,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
        }
    }
}

impl CacheConfig {
    /// Builds a config for the given budget, keeping the default object
    /// limit (clamped to the budget, which may be smaller).
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            max_object_size: max_size.min(DEFAULT_MAX_OBJECT_SIZE),
        }
    }

    /// Checks that the limits are mutually consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_object_size > self.max_size {
            return Err(ConfigError::new(format!(
                "max_object_size ({}) must not exceed max_size ({})",
                self.max_object_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Effective per-value limit: no value may exceed the whole budget.
    pub(crate) fn object_limit(&self) -> usize {
        self.max_object_size.min(self.max_size)
    }
}
