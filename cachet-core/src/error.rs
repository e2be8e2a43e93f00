//! Error types.
//!
//! The tagged unions at the heart of the crate (`AsyncValue`, `CacheItem`)
//! are closed enums, so an "unknown variant" can never be observed at
//! runtime. What remains are configuration mistakes and a reconciliation
//! loop that never settles.

use thiserror::Error;

/// Errors reported by cachet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A cache was configured to hold no entries at all.
    ///
    /// Such a cache evicts every awaited entry immediately, so a lookup
    /// would keep asking for the same command forever.
    #[error("cache capacity must be at least 1, got {capacity}")]
    InvalidCapacity { capacity: usize },

    /// The reconciliation loop kept finding pending commands.
    #[error("reconciliation did not settle after executing {iterations} commands")]
    ReconcileLimit { iterations: usize },
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = Error::InvalidCapacity { capacity: 0 };
        assert_eq!(err.to_string(), "cache capacity must be at least 1, got 0");

        let err = Error::ReconcileLimit { iterations: 12 };
        assert!(err.to_string().contains("12 commands"));
    }
}
