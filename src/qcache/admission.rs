//! Admission policy: which finished queries are worth caching.

use crate::qcache::config::QcacheConfig;

/// Snapshot of the admission rules derived from a [`QcacheConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    enabled: bool,
    threshold_ms: u32,
}

impl AdmissionPolicy {
    /// Derive the policy from a config.
    pub fn from_config(config: &QcacheConfig) -> Self {
        AdmissionPolicy {
            enabled: config.is_enabled(),
            threshold_ms: config.threshold_ms,
        }
    }

    /// Cheap check before the query runs.
    ///
    /// Building is skipped when the cache is off, or when an earlier run of
    /// the same query is known to have been faster than the threshold.
    /// Without any earlier observation the entry is built.
    pub fn should_build(&self, previous_elapsed_ms: Option<u32>) -> bool {
        if !self.enabled {
            return false;
        }
        previous_elapsed_ms.is_none_or(|ms| ms >= self.threshold_ms)
    }

    /// Definitive check once the query finished.
    pub fn should_store(&self, elapsed_ms: u32) -> bool {
        self.enabled && elapsed_ms >= self.threshold_ms
    }

    /// Minimum query time that gets cached.
    pub fn threshold_ms(&self) -> u32 {
        self.threshold_ms
    }
}
