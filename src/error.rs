//! Error types for the relay-cache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are
//!   inconsistent (e.g. a per-object limit above the whole budget).
//! - [`InsertError`]: Returned when an insert cannot be carried out, either
//!   because the value can never fit ([`InsertError::TooLarge`]) or because
//!   the index could not make room ([`InsertError::OutOfMemory`]).
//!
//! A lookup miss is not an error; `find` conveys it with `None`. A
//! duplicate insert is not an error either; it is reported as the
//! `AlreadyPresent` outcome.
use std::fmt;

use crate::ds::robin_hood::IndexError;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheConfig::validate`](crate::config::CacheConfig::validate)
/// and the fallible cache constructor. Carries a human-readable description
/// of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InsertError
// ---------------------------------------------------------------------------

/// Error returned when a value cannot be inserted into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The value exceeds the per-object limit; the caller should relay it
    /// uncached.
    TooLarge {
        /// Size of the rejected value in bytes.
        size: usize,
        /// Effective per-object limit in bytes.
        limit: usize,
    },
    /// The hash index could not grow (allocation failure or capacity cap).
    /// The cache is left consistent; the caller may retry later.
    OutOfMemory,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::TooLarge { size, limit } => {
                write!(f, "value of {size} bytes exceeds the {limit}-byte object limit")
            }
            InsertError::OutOfMemory => f.write_str("cache index could not make room"),
        }
    }
}

impl std::error::Error for InsertError {}

impl From<IndexError> for InsertError {
    fn from(_: IndexError) -> Self {
        InsertError::OutOfMemory
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
