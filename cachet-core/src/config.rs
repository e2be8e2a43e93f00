//! Configuration
//!
//! Tunables for caches and the reconciliation loop. Every struct has a
//! `Default` and deserializes with missing fields filled from it, so an
//! application can embed a partial `[cachet]` section in its own config.

use serde::{Deserialize, Serialize};

use crate::cache::Limiter;
use crate::error::{Error, Result};

/// Cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// The number of items a cache keeps.
    pub capacity: usize,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// The limiter keeping the `capacity` most recently touched items.
    pub fn limiter(&self) -> Result<Limiter> {
        Limiter::newest(self.capacity)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 5 }
    }
}

/// Bounds on one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// The number of commands a pass may execute before giving up.
    pub max_iterations: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { max_iterations: 1000 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub reconcile: ReconcileConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()
    }
}
