//! Cache Actions
//!
//! Caches change only through two actions, each scoped to one cache by its
//! [`CacheId`]:
//!
//! - [`CacheAction::Await`] records that a request for a key was issued.
//! - [`CacheAction::Receive`] delivers the value for a request.
//!
//! The [`RequestId`] carried by both correlates a completion with the
//! request it answers. Actions serialize, so a log of them can be stored
//! and replayed into an empty cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Names a cache. Actions for other ids are ignored by a cache's reducer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheId(Arc<str>);

impl CacheId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CacheId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlates a [`CacheAction::Receive`] with its [`CacheAction::Await`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates request ids of the form `{prefix}-{n}`.
///
/// A request id must be unique among everything dispatched into one cache.
/// Each generator counts on its own, so two generators built with
/// [`RequestIds::new`] and the same prefix produce the same ids. Either
/// share one generator (behind an `Arc`) between everything feeding a
/// cache, or build each with [`RequestIds::unique`].
#[derive(Debug)]
pub struct RequestIds {
    prefix: String,
    next: AtomicU64,
}

impl RequestIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }

    /// A generator whose ids no other generator in this process produces.
    ///
    /// The prefix is extended with a process-wide generator number, giving
    /// ids of the form `{prefix}-{generator}-{n}`.
    pub fn unique(prefix: impl AsRef<str>) -> Self {
        static GENERATORS: AtomicU64 = AtomicU64::new(0);
        let generator = GENERATORS.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("{}-{}", prefix.as_ref(), generator))
    }

    /// Generate the next id.
    pub fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId(format!("{}-{}", self.prefix, n))
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new("request")
    }
}

/// An action folded into a cache by its reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheAction<K, V, M> {
    /// A request for `key` was issued.
    Await {
        cache_id: CacheId,
        key: K,
        request_id: RequestId,
        meta: M,
    },
    /// The value for `request_id` arrived.
    Receive {
        cache_id: CacheId,
        request_id: RequestId,
        value: V,
    },
}

impl<K, V, M> CacheAction<K, V, M> {
    /// The cache this action is meant for.
    pub fn cache_id(&self) -> &CacheId {
        match self {
            CacheAction::Await { cache_id, .. } | CacheAction::Receive { cache_id, .. } => cache_id,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        match self {
            CacheAction::Await { request_id, .. } | CacheAction::Receive { request_id, .. } => request_id,
        }
    }
}

/// Anything a cache reducer can be applied to.
///
/// Application action types wrap cache actions next to their own actions;
/// implementing this trait lets every cache reducer pick out the actions
/// meant for it and ignore the rest.
pub trait CacheActionSource<K, V, M> {
    fn as_cache_action(&self) -> Option<&CacheAction<K, V, M>>;
}

impl<K, V, M> CacheActionSource<K, V, M> for CacheAction<K, V, M> {
    fn as_cache_action(&self) -> Option<&CacheAction<K, V, M>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_count_per_generator() {
        let ids = RequestIds::new("fetch");
        assert_eq!(ids.next_id().as_str(), "fetch-0");
        assert_eq!(ids.next_id().as_str(), "fetch-1");

        let other = RequestIds::new("fetch");
        assert_eq!(other.next_id().as_str(), "fetch-0");
    }

    #[test]
    fn unique_generators_never_collide() {
        let first = RequestIds::unique("fetch");
        let second = RequestIds::unique("fetch");
        let ids: Vec<_> = (0..3).flat_map(|_| [first.next_id(), second.next_id()]).collect();

        for (i, id) in ids.iter().enumerate() {
            assert!(id.as_str().starts_with("fetch-"));
            assert!(!ids[i + 1..].contains(id), "{id} generated twice");
        }
    }

    #[test]
    fn actions_know_their_cache() {
        let action: CacheAction<u32, String, ()> = CacheAction::Await {
            cache_id: "articles".into(),
            key: 1,
            request_id: "request-1".into(),
            meta: (),
        };
        assert_eq!(action.cache_id().as_str(), "articles");
        assert_eq!(action.request_id().as_str(), "request-1");
        assert!(action.as_cache_action().is_some());
    }

    #[test]
    fn actions_serialize_with_a_type_tag() {
        let action: CacheAction<u32, String, ()> = CacheAction::Receive {
            cache_id: "articles".into(),
            request_id: "request-1".into(),
            value: "hello".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"type":"receive","cache_id":"articles","request_id":"request-1","value":"hello"}"#
        );
        let back: CacheAction<u32, String, ()> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}
