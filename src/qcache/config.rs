//! Configuration for the query cache.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SarissaError};

/// Default memory budget (16 MiB).
pub const DEFAULT_MAX_BYTES: i64 = 16 * 1024 * 1024;

/// Default minimum query time worth caching.
pub const DEFAULT_THRESHOLD_MS: u32 = 3000;

/// Default entry lifetime.
pub const DEFAULT_TTL_SECS: i64 = 60;

/// Budget and policy of the query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcacheConfig {
    /// Memory budget in bytes. Zero or negative disables the cache.
    pub max_bytes: i64,

    /// Queries faster than this are not cached.
    pub threshold_ms: u32,

    /// Entries older than this are treated as misses and dropped.
    pub ttl_secs: i64,
}

impl Default for QcacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            threshold_ms: DEFAULT_THRESHOLD_MS,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl QcacheConfig {
    /// Create a config with explicit values.
    pub fn new(max_bytes: i64, threshold_ms: u32, ttl_secs: i64) -> Self {
        Self {
            max_bytes,
            threshold_ms,
            ttl_secs,
        }
    }

    /// A config that turns caching off.
    pub fn disabled() -> Self {
        Self {
            max_bytes: 0,
            ..Default::default()
        }
    }

    /// Set the memory budget.
    pub fn with_max_bytes(mut self, max_bytes: i64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the admission threshold.
    pub fn with_threshold_ms(mut self, threshold_ms: u32) -> Self {
        self.threshold_ms = threshold_ms;
        self
    }

    /// Set the entry lifetime.
    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Whether caching is active at all.
    pub fn is_enabled(&self) -> bool {
        self.max_bytes > 0
    }

    /// Budget as an unsigned byte count (zero when disabled).
    pub fn budget(&self) -> usize {
        usize::try_from(self.max_bytes.max(0)).unwrap_or(usize::MAX)
    }

    /// Reject values that cannot come from a sane configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs < 0 {
            return Err(SarissaError::invalid_config(format!(
                "ttl_secs must not be negative, got {}",
                self.ttl_secs
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON config file. Missing keys take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: QcacheConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
