//! Cache Definitions
//!
//! A [`CacheDefinition`] binds a cache to the slice of application state
//! that holds it. It knows the cache's id, how to find the cache in a
//! state snapshot, how to compare keys and how many items to keep. From
//! that it provides:
//!
//! - the two correlated actions ([`CacheDefinition::await_value`] and
//!   [`CacheDefinition::receive_value`]),
//! - the reducer folding those actions into cache transitions
//!   ([`CacheDefinition::reduce`]),
//! - a selector handing out a [`CacheView`] for lookups inside composed
//!   selectors ([`CacheDefinition::selector`]).
//!
//! # Transitions
//!
//! Per key, a slot moves from absent to awaiting to received:
//!
//! 1. `Await(key, request_id, meta)` prepends an awaiting item and drops
//!    any other item for an equal key. A newer request preempts an older
//!    one, whatever state it was in.
//!
//! 2. `Receive(request_id, value)` replaces the item awaiting
//!    `request_id` with a received item carrying the same key and meta,
//!    moved to the front. If no item awaits that request (it was
//!    preempted, evicted, or already answered) nothing changes.
//!
//! 3. After either transition the limiter truncates the cache, evicting
//!    the least recently touched items.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, trace};

use super::action::{CacheAction, CacheActionSource, CacheId, RequestId};
use super::fetch::FetchCommand;
use super::item::{Cache, CacheItem, Limiter};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::select::{AsyncSelector, AsyncValue, Equality, SharedEquality};

type Projection<S, K, V, M> = dyn Fn(&S) -> &Cache<K, V, M> + Send + Sync;

/// Static description of one cache.
pub struct CacheDefinition<S, K, V, M> {
    id: CacheId,
    project: Arc<Projection<S, K, V, M>>,
    keys_equal: SharedEquality<K>,
    limiter: Limiter,
}

impl<S, K, V, M> CacheDefinition<S, K, V, M> {
    /// Define the cache `id`, found in the state by `project`.
    pub fn new<F, E>(id: impl Into<CacheId>, project: F, keys_equal: E, limiter: Limiter) -> Self
    where
        F: Fn(&S) -> &Cache<K, V, M> + Send + Sync + 'static,
        E: Equality<K> + 'static,
    {
        Self {
            id: id.into(),
            project: Arc::new(project),
            keys_equal: Arc::new(keys_equal),
            limiter,
        }
    }

    /// Like [`CacheDefinition::new`], with the limiter built from `config`.
    pub fn from_config<F, E>(id: impl Into<CacheId>, project: F, keys_equal: E, config: &CacheConfig) -> Result<Self>
    where
        F: Fn(&S) -> &Cache<K, V, M> + Send + Sync + 'static,
        E: Equality<K> + 'static,
    {
        Ok(Self::new(id, project, keys_equal, config.limiter()?))
    }

    pub fn id(&self) -> &CacheId {
        &self.id
    }

    pub fn limiter(&self) -> Limiter {
        self.limiter
    }

    pub fn keys_are_equal(&self, left: &K, right: &K) -> bool {
        self.keys_equal.equals(left, right)
    }

    /// The cache held by `state`.
    pub fn cache<'a>(&self, state: &'a S) -> &'a Cache<K, V, M> {
        (self.project)(state)
    }

    /// The action recording that a request for `key` was issued.
    pub fn await_value(&self, key: K, request_id: RequestId, meta: M) -> CacheAction<K, V, M> {
        CacheAction::Await {
            cache_id: self.id.clone(),
            key,
            request_id,
            meta,
        }
    }

    /// The action delivering the value for `request_id`.
    pub fn receive_value(&self, request_id: RequestId, value: V) -> CacheAction<K, V, M> {
        CacheAction::Receive {
            cache_id: self.id.clone(),
            request_id,
            value,
        }
    }

    /// The view used for lookups in `state`.
    pub fn view(&self, state: &S) -> CacheView<K, V, M> {
        CacheView {
            cache_id: self.id.clone(),
            cache: self.cache(state).clone(),
            keys_equal: Arc::clone(&self.keys_equal),
        }
    }

    /// Look up the item for `key` in `state`.
    pub fn get_for<'a>(&self, state: &'a S, key: &K) -> Option<&'a CacheItem<K, V, M>> {
        self.cache(state).find(key, &*self.keys_equal)
    }
}

impl<S, K, V, M> CacheDefinition<S, K, V, M>
where
    K: Clone,
    V: Clone,
    M: Clone,
{
    /// Fold `action` into `cache`.
    ///
    /// Actions that are not cache actions, or are meant for another cache,
    /// return `cache` itself (sharing its items), as does a `Receive` that
    /// matches no awaiting item.
    pub fn reduce<A>(&self, cache: &Cache<K, V, M>, action: &A) -> Cache<K, V, M>
    where
        A: CacheActionSource<K, V, M> + ?Sized,
    {
        match action.as_cache_action() {
            Some(action) if action.cache_id() == &self.id => self.apply(cache, action),
            _ => cache.clone(),
        }
    }

    fn apply(&self, cache: &Cache<K, V, M>, action: &CacheAction<K, V, M>) -> Cache<K, V, M> {
        match action {
            CacheAction::Await {
                key, request_id, meta, ..
            } => {
                let mut items = Vec::with_capacity(cache.len() + 1);
                items.push(CacheItem::awaiting(key.clone(), request_id.clone(), meta.clone()));
                items.extend(
                    cache
                        .iter()
                        .filter(|item| !self.keys_equal.equals(item.key(), key))
                        .cloned(),
                );
                trace!(cache_id = %self.id, %request_id, "awaiting value");
                self.limit(items)
            }
            CacheAction::Receive { request_id, value, .. } => {
                let Some(awaiting) = cache.find_request(request_id) else {
                    debug!(cache_id = %self.id, %request_id, "dropping value for a request that is no longer awaited");
                    return cache.clone();
                };

                let mut items = Vec::with_capacity(cache.len());
                items.push(CacheItem::received(
                    awaiting.key().clone(),
                    value.clone(),
                    awaiting.meta().clone(),
                ));
                items.extend(cache.iter().filter(|item| !item.is_awaiting(request_id)).cloned());
                trace!(cache_id = %self.id, %request_id, "value received");
                self.limit(items)
            }
        }
    }

    fn limit(&self, mut items: Vec<CacheItem<K, V, M>>) -> Cache<K, V, M> {
        let evicted = self.limiter.apply(&mut items);
        if evicted > 0 {
            trace!(cache_id = %self.id, evicted, "evicted cache items");
        }
        Cache::from_items(items)
    }
}

impl<S, K, V, M> CacheDefinition<S, K, V, M>
where
    S: 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    /// A selector yielding the [`CacheView`] of each state snapshot.
    ///
    /// Use it as an input of a composed selector and look keys up in the
    /// combining function.
    pub fn selector<P, C>(&self) -> AsyncSelector<S, P, C, CacheView<K, V, M>>
    where
        P: 'static,
        C: Send + Sync + 'static,
    {
        let definition = self.clone();
        AsyncSelector::from_value_fn(move |state: &S, _: &P| definition.view(state))
    }
}

impl<S, K, V, M> Clone for CacheDefinition<S, K, V, M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            project: Arc::clone(&self.project),
            keys_equal: Arc::clone(&self.keys_equal),
            limiter: self.limiter,
        }
    }
}

impl<S, K, V, M> Debug for CacheDefinition<S, K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDefinition")
            .field("id", &self.id)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// A cache as seen from one state snapshot.
///
/// Two views are equal when they show the same cache items, so a composed
/// selector only reruns its combining function after the cache changed.
pub struct CacheView<K, V, M> {
    cache_id: CacheId,
    cache: Cache<K, V, M>,
    keys_equal: SharedEquality<K>,
}

impl<K, V, M> CacheView<K, V, M> {
    pub fn cache_id(&self) -> &CacheId {
        &self.cache_id
    }

    pub fn cache(&self) -> &Cache<K, V, M> {
        &self.cache
    }

    /// Start a lookup of `key`.
    pub fn get_for(&self, key: K) -> CacheLookup<'_, K, V, M> {
        CacheLookup { view: self, key }
    }
}

impl<K, V, M> Clone for CacheView<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            cache_id: self.cache_id.clone(),
            cache: self.cache.clone(),
            keys_equal: Arc::clone(&self.keys_equal),
        }
    }
}

impl<K, V, M> PartialEq for CacheView<K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        self.cache_id == other.cache_id && self.cache.is_same(&other.cache)
    }
}

impl<K, V, M> Debug for CacheView<K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheView")
            .field("cache_id", &self.cache_id)
            .field("len", &self.cache.len())
            .finish()
    }
}

/// A pending lookup of one key. Finish it with a way to obtain the value
/// when the key is absent.
#[derive(Debug)]
pub struct CacheLookup<'a, K, V, M> {
    view: &'a CacheView<K, V, M>,
    key: K,
}

impl<'a, K, V, M> CacheLookup<'a, K, V, M> {
    /// The item for the key, if any.
    pub fn item(&self) -> Option<&'a CacheItem<K, V, M>> {
        let view = self.view;
        view.cache.find(&self.key, &*view.keys_equal)
    }

    /// `Pending(command)` when the key is absent, otherwise the item's
    /// state.
    pub fn or_else<C>(self, command: C) -> AsyncValue<C, V>
    where
        V: Clone,
    {
        self.or_else_with(|_| command)
    }

    /// Like [`CacheLookup::or_else`], building the command from the key
    /// only when it is needed.
    pub fn or_else_with<C, F>(self, command: F) -> AsyncValue<C, V>
    where
        V: Clone,
        F: FnOnce(K) -> C,
    {
        match self.item() {
            Some(CacheItem::Awaiting { .. }) => AsyncValue::Awaiting,
            Some(CacheItem::Received { value, .. }) => AsyncValue::Received(value.clone()),
            None => AsyncValue::pending(command(self.key)),
        }
    }

    /// `Pending` with a [`FetchCommand`] running `fetch` when the key is
    /// absent, otherwise the item's state.
    pub fn or_fetch<F, Fut>(self, fetch: F) -> AsyncValue<FetchCommand<K, V>, V>
    where
        V: Clone,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let cache_id = self.view.cache_id.clone();
        self.or_else_with(|key| FetchCommand::new(cache_id, key, fetch))
    }
}
