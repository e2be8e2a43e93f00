//! Request-Tracking Caches
//!
//! Remote data lives in small caches inside the application state. This
//! module defines the cache data model, the actions that drive it, the
//! reducer folding those actions into cache transitions, and a tokio-based
//! executor for fetch commands.

mod action;
mod definition;
mod fetch;
mod item;

pub use action::{CacheAction, CacheActionSource, CacheId, RequestId, RequestIds};
pub use definition::{CacheDefinition, CacheLookup, CacheView};
pub use fetch::{FetchCommand, FetchCommandExecutor};
pub use item::{Cache, CacheItem, Limiter};
