//! App-State Subscriber
//!
//! An [`AppStateSubscriber`] keeps one consumer's [`ConnectedState`] in
//! step with the application state. Register [`AppStateSubscriber::notify`]
//! with the state container; every notification runs one reconciliation
//! pass and stores the result when anything changed.
//!
//! # Re-entrancy
//!
//! Commands executed during a pass dispatch actions, and the container
//! notifies its subscribers about those too. Fetches also complete on
//! other threads while a pass runs. A notification arriving during a pass
//! does not start a second one; it marks the subscriber as pending, and
//! the running pass goes again before returning. The guard lives on the
//! subscriber, so independent subscribers never block each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::executor::SharedExecutor;
use super::props::AsyncProps;
use super::reconcile::next_async_props_and_state;
use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::select::Identity;

/// What a consumer gets to see.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedState<A, Y> {
    /// The reconciled async props.
    pub async_props: A,
    /// Plain values read from the state the async props settled on.
    pub sync_props: Y,
}

type StateFn<S> = dyn Fn() -> S + Send + Sync;
type MapFn<S, P, T> = dyn Fn(&S, &P) -> T + Send + Sync;
type Listener<A, Y> = dyn Fn(&Arc<ConnectedState<A, Y>>) + Send + Sync;

/// Keeps a [`ConnectedState`] reconciled with the application state.
pub struct AppStateSubscriber<S, P, A, Y>
where
    A: AsyncProps<S, P>,
{
    get_state: Box<StateFn<S>>,
    executor: SharedExecutor<A::Command>,
    map_async: Box<MapFn<S, P, A>>,
    map_sync: Box<MapFn<S, P, Y>>,
    props: Mutex<P>,
    current: Mutex<Option<Arc<ConnectedState<A, Y>>>>,
    listener: Option<Box<Listener<A, Y>>>,
    config: ReconcileConfig,
    on_call_stack: AtomicBool,
    pending: AtomicBool,
}

impl<S, P, A, Y> AppStateSubscriber<S, P, A, Y>
where
    P: Identity,
    A: AsyncProps<S, P>,
    A::Command: Clone,
    Y: PartialEq,
{
    pub fn new<G, MA, MS>(get_state: G, executor: SharedExecutor<A::Command>, map_async: MA, map_sync: MS, props: P) -> Self
    where
        G: Fn() -> S + Send + Sync + 'static,
        MA: Fn(&S, &P) -> A + Send + Sync + 'static,
        MS: Fn(&S, &P) -> Y + Send + Sync + 'static,
    {
        Self {
            get_state: Box::new(get_state),
            executor,
            map_async: Box::new(map_async),
            map_sync: Box::new(map_sync),
            props: Mutex::new(props),
            current: Mutex::new(None),
            listener: None,
            config: ReconcileConfig::default(),
            on_call_stack: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Call `listener` with every new connected state.
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: Fn(&Arc<ConnectedState<A, Y>>) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// The current connected state, if a pass completed.
    pub fn snapshot(&self) -> Option<Arc<ConnectedState<A, Y>>> {
        self.current.lock().clone()
    }

    pub fn props(&self) -> P {
        self.props.lock().clone()
    }

    /// Reconcile the connected state with the current application state.
    ///
    /// Returns `Ok(true)` if the connected state changed. A call made while
    /// a pass is running, from a command or from another thread, returns
    /// `Ok(false)` at once and makes the running pass go again.
    pub fn notify(&self) -> Result<bool> {
        let Some(mut guard) = self.enter() else {
            trace!("deferring notification to the running pass");
            return Ok(false);
        };

        let mut changed = false;
        loop {
            self.pending.store(false, Ordering::SeqCst);
            changed |= self.pass()?;
            drop(guard);

            if !self.pending.load(Ordering::SeqCst) {
                return Ok(changed);
            }
            // Whoever got in first runs the deferred pass.
            match self.enter() {
                Some(next) => guard = next,
                None => return Ok(changed),
            }
        }
    }

    /// Take the guard, or leave a pending mark for whoever holds it.
    fn enter(&self) -> Option<CallStackGuard<'_>> {
        CallStackGuard::enter(&self.on_call_stack).or_else(|| {
            self.pending.store(true, Ordering::SeqCst);
            // The holder may have checked for pending marks already.
            CallStackGuard::enter(&self.on_call_stack)
        })
    }

    fn pass(&self) -> Result<bool> {
        let props = self.props();
        let previous = self.snapshot();

        let (async_props, state) = next_async_props_and_state(
            &*self.executor,
            || (self.get_state)(),
            |state: &S, props: &P| (self.map_async)(state, props),
            &props,
            previous.as_ref().map(|previous| &previous.async_props),
            &self.config,
        )?;
        let sync_props = (self.map_sync)(&state, &props);

        let changed = match &previous {
            Some(previous) => async_props.has_changed_from(&previous.async_props) || sync_props != previous.sync_props,
            None => true,
        };
        if !changed {
            return Ok(false);
        }

        let next = Arc::new(ConnectedState {
            async_props,
            sync_props,
        });
        *self.current.lock() = Some(Arc::clone(&next));
        if let Some(listener) = &self.listener {
            listener(&next);
        }
        Ok(true)
    }

    /// Replace the own props, running a pass if they are a new snapshot.
    pub fn set_props(&self, props: P) -> Result<bool> {
        {
            let mut current = self.props.lock();
            if current.is_same(&props) {
                return Ok(false);
            }
            *current = props;
        }
        self.notify()
    }
}

impl<S, P, A, Y> std::fmt::Debug for AppStateSubscriber<S, P, A, Y>
where
    A: AsyncProps<S, P>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStateSubscriber")
            .field("connected", &self.current.lock().is_some())
            .field("config", &self.config)
            .field("on_call_stack", &self.on_call_stack.load(Ordering::Relaxed))
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Marks a subscriber as running until dropped.
struct CallStackGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CallStackGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CallStackGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
