//! Fetch Commands
//!
//! A [`FetchCommand`] bundles everything needed to fill one cache slot:
//! the cache id, the key, and a thunk producing the value's future. It is
//! what [`CacheLookup::or_fetch`](super::CacheLookup::or_fetch) emits for
//! an absent key.
//!
//! [`FetchCommandExecutor`] runs fetch commands on a tokio runtime. For
//! each command it dispatches an `Await` action right away, spawns the
//! future, and dispatches the matching `Receive` once the future resolves.
//! Request ids come from a [`RequestIds`] generator unique to the executor,
//! unless one is shared through [`FetchCommandExecutor::with_request_ids`].

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::action::{CacheAction, CacheId, RequestIds};
use crate::connect::CommandExecutor;

type Fetch<V> = dyn Fn() -> BoxFuture<'static, V> + Send + Sync;

/// A request to fetch the value for `key` into the cache `cache_id`.
pub struct FetchCommand<K, V> {
    cache_id: CacheId,
    key: K,
    fetch: Arc<Fetch<V>>,
}

impl<K, V> FetchCommand<K, V> {
    pub fn new<F, Fut>(cache_id: CacheId, key: K, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        Self {
            cache_id,
            key,
            fetch: Arc::new(move || fetch().boxed()),
        }
    }

    pub fn cache_id(&self) -> &CacheId {
        &self.cache_id
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Start the fetch.
    pub fn fetch(&self) -> BoxFuture<'static, V> {
        (self.fetch)()
    }
}

impl<K: Clone, V> Clone for FetchCommand<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache_id: self.cache_id.clone(),
            key: self.key.clone(),
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<K: Debug, V> Debug for FetchCommand<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCommand")
            .field("cache_id", &self.cache_id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

type Dispatch<K, V> = dyn Fn(CacheAction<K, V, ()>) + Send + Sync;

/// Executes [`FetchCommand`]s on a tokio runtime.
pub struct FetchCommandExecutor<K, V> {
    handle: Handle,
    request_ids: Arc<RequestIds>,
    dispatch: Arc<Dispatch<K, V>>,
}

impl<K, V> FetchCommandExecutor<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    /// Run fetches on `handle`, reporting progress through `dispatch`.
    pub fn new<D>(handle: Handle, dispatch: D) -> Self
    where
        D: Fn(CacheAction<K, V, ()>) + Send + Sync + 'static,
    {
        Self {
            handle,
            request_ids: Arc::new(RequestIds::unique("fetch")),
            dispatch: Arc::new(dispatch),
        }
    }

    /// Draw request ids from `request_ids` instead of the executor's own
    /// generator.
    ///
    /// Executors dispatching into the same cache must share one generator,
    /// or each use one built by [`RequestIds::unique`].
    pub fn with_request_ids(mut self, request_ids: Arc<RequestIds>) -> Self {
        self.request_ids = request_ids;
        self
    }

    /// Dispatch `Await` for the command, then spawn its fetch.
    ///
    /// The returned handle completes after `Receive` was dispatched.
    pub fn spawn(&self, command: FetchCommand<K, V>) -> JoinHandle<()> {
        let request_id = self.request_ids.next_id();
        let future = command.fetch();
        let FetchCommand { cache_id, key, .. } = command;

        debug!(%cache_id, %request_id, "fetch started");
        (self.dispatch)(CacheAction::Await {
            cache_id: cache_id.clone(),
            key,
            request_id: request_id.clone(),
            meta: (),
        });

        let dispatch = Arc::clone(&self.dispatch);
        self.handle.spawn(async move {
            let value = future.await;
            debug!(%cache_id, %request_id, "fetch completed");
            dispatch(CacheAction::Receive {
                cache_id,
                request_id,
                value,
            });
        })
    }
}

impl<K, V> CommandExecutor<FetchCommand<K, V>> for FetchCommandExecutor<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn execute(&self, command: FetchCommand<K, V>) {
        self.spawn(command);
    }
}

impl<K, V> Debug for FetchCommandExecutor<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCommandExecutor")
            .field("request_ids", &self.request_ids)
            .finish_non_exhaustive()
    }
}
