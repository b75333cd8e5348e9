//! Error types for the bufcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity, zero block size).
//! - [`DeviceError`]: Returned when the block device fails a transfer. Carries
//!   the underlying I/O error, when there is one, as its
//!   [`source`](std::error::Error::source).
//!
//! Exhaustion and reference-count misuse are not represented here: those
//! conditions mean the cache's bookkeeping can no longer be trusted, so they
//! terminate the offending operation with a panic instead of returning a
//! value (see `BufferCache` docs).
//!
//! ## Example Usage
//!
//! ```
//! use bufcache::cache::{BufferCache, CacheConfig};
//! use bufcache::device::MemoryDevice;
//! use bufcache::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let bad = CacheConfig {
//!     capacity: 0,
//!     ..CacheConfig::default()
//! };
//! let cache: Result<BufferCache<MemoryDevice>, ConfigError> =
//!     BufferCache::with_config(MemoryDevice::new(512), bad);
//! assert!(cache.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheConfig::validate`](crate::cache::CacheConfig::validate)
/// and [`BufferCache::with_config`](crate::cache::BufferCache::with_config).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use bufcache::cache::CacheConfig;
///
/// let mut config = CacheConfig::default();
/// config.block_size = 0;
/// let err = config.validate().unwrap_err();
/// assert!(err.to_string().contains("block size"));
/// ```
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
// DeviceError
// ---------------------------------------------------------------------------

/// Error returned when a block transfer fails.
///
/// Produced by [`BlockDevice`](crate::device::BlockDevice) implementations
/// and propagated unchanged through [`BlockGuard::fill`] and
/// [`BlockGuard::flush`](crate::cache::BlockGuard::flush); the cache never
/// interprets or retries a failed transfer, it only leaves the entry invalid
/// when a read fails.
///
/// [`BlockGuard::fill`]: crate::cache::BlockGuard::fill
///
/// # Example
///
/// ```
/// use std::io;
///
/// use bufcache::error::DeviceError;
///
/// let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
/// let err = DeviceError::with_source("read failed for block 0:7", io_err);
/// assert_eq!(err.to_string(), "read failed for block 0:7");
/// assert!(std::error::Error::source(&err).is_some());
/// ```
#[derive(Debug)]
pub struct DeviceError {
    message: String,
    source: Option<std::io::Error>,
}

impl DeviceError {
    /// Creates a new `DeviceError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            source: None,
        }
    }

    /// Creates a new `DeviceError` caused by an underlying I/O error.
    #[inline]
    pub fn with_source(msg: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(err.to_string(), "capacity must be > 0");
    }

    #[test]
    fn config_debug_includes_message() {
        let err = ConfigError::new("bad partition count");
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("bad partition count"));
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }

    // -- DeviceError ------------------------------------------------------

    #[test]
    fn device_display_shows_message() {
        let err = DeviceError::new("write failed for block 1:9");
        assert_eq!(err.to_string(), "write failed for block 1:9");
    }

    #[test]
    fn device_message_accessor() {
        let err = DeviceError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn device_without_source_has_no_source() {
        let err = DeviceError::new("no cause");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn device_source_chain_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = DeviceError::with_source("read failed", io_err);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("disk on fire"));
    }

    #[test]
    fn device_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<DeviceError>();
    }
}
