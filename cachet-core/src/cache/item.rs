//! Cache Items and the Bounded Cache
//!
//! A [`Cache`] is a short, newest-first list of [`CacheItem`]s. Each item
//! records where one key is in its request lifecycle: a request is in
//! flight ([`CacheItem::Awaiting`]) or its value has arrived
//! ([`CacheItem::Received`]). A key with no item is absent.
//!
//! Keys are matched with a caller-supplied [`Equality`] rather than
//! hashing, since keys are often composite. Lookup is a linear scan; the
//! [`Limiter`] keeps caches small enough for that to be the fast path.
//!
//! Caches are immutable values. Every transition produces a new cache and
//! leaves the old one untouched, so a cache can be shared between state
//! snapshots and compared by identity with [`Cache::is_same`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::action::RequestId;
use crate::error::{Error, Result};
use crate::select::Equality;

/// One key's slot in a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheItem<K, V, M> {
    /// A request for `key` is in flight.
    Awaiting { key: K, request_id: RequestId, meta: M },
    /// The value for `key` has arrived.
    Received { key: K, value: V, meta: M },
}

impl<K, V, M> CacheItem<K, V, M> {
    pub fn awaiting(key: K, request_id: RequestId, meta: M) -> Self {
        CacheItem::Awaiting { key, request_id, meta }
    }

    pub fn received(key: K, value: V, meta: M) -> Self {
        CacheItem::Received { key, value, meta }
    }

    pub fn key(&self) -> &K {
        match self {
            CacheItem::Awaiting { key, .. } | CacheItem::Received { key, .. } => key,
        }
    }

    pub fn meta(&self) -> &M {
        match self {
            CacheItem::Awaiting { meta, .. } | CacheItem::Received { meta, .. } => meta,
        }
    }

    /// The request an awaiting item is waiting on.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            CacheItem::Awaiting { request_id, .. } => Some(request_id),
            CacheItem::Received { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            CacheItem::Received { value, .. } => Some(value),
            CacheItem::Awaiting { .. } => None,
        }
    }

    /// Returns `true` if this item is awaiting exactly `request_id`.
    pub fn is_awaiting(&self, request_id: &RequestId) -> bool {
        self.request_id() == Some(request_id)
    }
}

/// Bounds the number of items a cache keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limiter {
    /// Keep the `n` most recently touched items.
    Newest(NonZeroUsize),
    /// Never evict.
    Unbounded,
}

impl Limiter {
    /// Keep the `capacity` most recently touched items.
    ///
    /// A capacity of zero is rejected: such a cache could never hold the
    /// awaiting item that stops a key from being fetched again.
    pub fn newest(capacity: usize) -> Result<Self> {
        NonZeroUsize::new(capacity)
            .map(Limiter::Newest)
            .ok_or(Error::InvalidCapacity { capacity })
    }

    /// The maximum number of items, if any.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Limiter::Newest(capacity) => Some(capacity.get()),
            Limiter::Unbounded => None,
        }
    }

    /// Truncate a newest-first list in place, returning how many items
    /// were evicted.
    pub fn apply<T>(&self, items: &mut Vec<T>) -> usize {
        match self.capacity() {
            Some(capacity) if items.len() > capacity => {
                let evicted = items.len() - capacity;
                items.truncate(capacity);
                evicted
            }
            _ => 0,
        }
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Limiter::Newest(NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN))
    }
}

/// An immutable, newest-first list of cache items.
///
/// Cloning shares the items.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache<K, V, M> {
    items: Arc<Vec<CacheItem<K, V, M>>>,
}

impl<K, V, M> Cache<K, V, M> {
    /// An empty cache.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// A cache holding `items`, newest first.
    pub fn from_items(items: Vec<CacheItem<K, V, M>>) -> Self {
        Self { items: Arc::new(items) }
    }

    pub fn items(&self) -> &[CacheItem<K, V, M>] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CacheItem<K, V, M>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if both caches share the same items.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Find the item for `key`.
    pub fn find<E>(&self, key: &K, keys_equal: &E) -> Option<&CacheItem<K, V, M>>
    where
        E: Equality<K> + ?Sized,
    {
        self.items.iter().find(|item| keys_equal.equals(item.key(), key))
    }

    /// Find the item awaiting `request_id`.
    pub fn find_request(&self, request_id: &RequestId) -> Option<&CacheItem<K, V, M>> {
        self.items.iter().find(|item| item.is_awaiting(request_id))
    }
}

impl<K, V, M> Clone for Cache<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<K, V, M> Default for Cache<K, V, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq, M: PartialEq> PartialEq for Cache<K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other) || self.items == other.items
    }
}

impl<K: Eq, V: Eq, M: Eq> Eq for Cache<K, V, M> {}

impl<'a, K, V, M> IntoIterator for &'a Cache<K, V, M> {
    type Item = &'a CacheItem<K, V, M>;
    type IntoIter = std::slice::Iter<'a, CacheItem<K, V, M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::by_value;

    type Item = CacheItem<&'static str, i32, ()>;

    #[test]
    fn item_accessors() {
        let awaiting = Item::awaiting("a", "request-1".into(), ());
        assert_eq!(awaiting.key(), &"a");
        assert_eq!(awaiting.request_id(), Some(&RequestId::from("request-1")));
        assert_eq!(awaiting.value(), None);
        assert!(awaiting.is_awaiting(&"request-1".into()));
        assert!(!awaiting.is_awaiting(&"request-2".into()));

        let received = Item::received("b", 2, ());
        assert_eq!(received.key(), &"b");
        assert_eq!(received.request_id(), None);
        assert_eq!(received.value(), Some(&2));
    }

    #[test]
    fn find_uses_the_key_equality() {
        let cache = Cache::from_items(vec![Item::received("One", 1, ()), Item::received("two", 2, ())]);
        assert!(cache.find(&"one", &by_value::<&str>).is_none());

        let ignore_case = |l: &&str, r: &&str| l.eq_ignore_ascii_case(r);
        assert_eq!(cache.find(&"one", &ignore_case).and_then(CacheItem::value), Some(&1));
    }

    #[test]
    fn limiter_keeps_the_newest() {
        let limiter = Limiter::newest(2).unwrap();
        let mut items = vec![3, 2, 1];
        assert_eq!(limiter.apply(&mut items), 1);
        assert_eq!(items, vec![3, 2]);
        assert_eq!(limiter.apply(&mut items), 0);

        let mut items = vec![3, 2, 1];
        assert_eq!(Limiter::Unbounded.apply(&mut items), 0);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn limiter_rejects_zero_capacity() {
        assert_eq!(Limiter::newest(0), Err(Error::InvalidCapacity { capacity: 0 }));
        assert_eq!(Limiter::default().capacity(), Some(5));
    }

    #[test]
    fn caches_compare_by_identity_then_contents() {
        let cache = Cache::from_items(vec![Item::received("a", 1, ())]);
        let copy = Cache::from_items(vec![Item::received("a", 1, ())]);
        assert!(cache.is_same(&cache.clone()));
        assert!(!cache.is_same(&copy));
        assert_eq!(cache, copy);
    }

    #[test]
    fn cache_serializes_as_a_list() {
        let cache = Cache::from_items(vec![
            Item::awaiting("a", "request-1".into(), ()),
            Item::received("b", 2, ()),
        ]);
        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "state": "awaiting", "key": "a", "request_id": "request-1", "meta": null },
                { "state": "received", "key": "b", "value": 2, "meta": null },
            ])
        );
    }
}
