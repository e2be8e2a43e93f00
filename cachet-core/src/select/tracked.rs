//! Tracked Inputs
//!
//! A [`Tracked`] records that a derived value depends on some "user input"
//! (a query string, a selected id, ...). It captures the input's value at
//! the time the derived value was computed and can later tell whether the
//! input has changed since.
//!
//! The reconciliation loop uses this to decide what to show while a value
//! is being recomputed: if the tracked inputs are unchanged the refresh is
//! incidental and the previous value stays on screen; if they changed, the
//! previous value no longer answers the user's question and is dropped.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::equality::Equality;

/// Identifies the selector a [`Tracked`] was derived from.
///
/// Lists of tracked inputs are deduplicated by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackedId(u64);

impl TrackedId {
    /// Generate a new unique id.
    ///
    /// Ids are unique within the process and only ever compared with each
    /// other. They are never serialized, so their values carry no meaning.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TrackedId {
    fn default() -> Self {
        Self::new()
    }
}

type ChangePredicate<S, P> = Arc<dyn Fn(&S, &P) -> bool + Send + Sync>;

/// A recorded dependency on an input, with change detection.
pub struct Tracked<S, P> {
    source: TrackedId,
    has_changed: ChangePredicate<S, P>,
}

impl<S, P> Tracked<S, P> {
    /// Capture the value `selector` yields for `state` and `props`.
    ///
    /// The resulting record reports a change when `selector` later yields a
    /// value that `equality` considers different from the captured one.
    pub fn capture<T, F, E>(source: TrackedId, selector: Arc<F>, state: &S, props: &P, equality: E) -> Self
    where
        S: 'static,
        P: 'static,
        T: Send + Sync + 'static,
        F: Fn(&S, &P) -> T + Send + Sync + ?Sized + 'static,
        E: Equality<T> + 'static,
    {
        let captured = selector(state, props);
        Self::new(source, selector, captured, equality)
    }

    /// Like [`Tracked::capture`], for a value the caller already computed.
    pub fn new<T, F, E>(source: TrackedId, selector: Arc<F>, captured: T, equality: E) -> Self
    where
        S: 'static,
        P: 'static,
        T: Send + Sync + 'static,
        F: Fn(&S, &P) -> T + Send + Sync + ?Sized + 'static,
        E: Equality<T> + 'static,
    {
        Self {
            source,
            has_changed: Arc::new(move |state: &S, props: &P| {
                let current = selector(state, props);
                !equality.equals(&captured, &current)
            }),
        }
    }

    /// The selector this record was derived from.
    pub fn source(&self) -> TrackedId {
        self.source
    }

    /// Returns `true` if the input differs from the captured value.
    pub fn has_changed(&self, state: &S, props: &P) -> bool {
        (self.has_changed)(state, props)
    }
}

impl<S, P> Clone for Tracked<S, P> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            has_changed: Arc::clone(&self.has_changed),
        }
    }
}

impl<S, P> Debug for Tracked<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked").field("source", &self.source).finish()
    }
}

/// Merge two lists of tracked inputs.
///
/// Records of `right` whose source is not yet present are added to the
/// front; a source already present keeps its first record.
pub fn combine_tracked<S, P>(left: &[Tracked<S, P>], right: &[Tracked<S, P>]) -> Vec<Tracked<S, P>> {
    let mut combined = left.to_vec();
    for tracked in right {
        if !combined.iter().any(|t| t.source == tracked.source) {
            combined.insert(0, tracked.clone());
        }
    }
    combined
}

/// Returns `true` if any of the tracked inputs changed.
pub fn some_has_changed<S, P>(tracked: &[Tracked<S, P>], state: &S, props: &P) -> bool {
    tracked.iter().any(|t| t.has_changed(state, props))
}
