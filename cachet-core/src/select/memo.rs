//! Memo Implementation
//!
//! A [`Memo`] wraps a function and remembers its most recent call. It is a
//! cache of size one: the last parameters and the last result.
//!
//! # How Memos Work
//!
//! 1. On a call, the new parameters are compared with the remembered ones
//!    using the memo's *parameter equality*. If they are equivalent, the
//!    remembered result is returned and the function is not run.
//!
//! 2. Otherwise the function runs. Its result is compared with the
//!    remembered result using the *result equality*. If they are
//!    equivalent, the remembered result is kept and returned instead of the
//!    fresh one.
//!
//! 3. The new parameters are remembered either way.
//!
//! Step 2 is what keeps results referentially stable: a selector that is
//! recomputed from a different state snapshot, but arrives at the same
//! value, hands out the very same `Arc` it handed out before. Consumers can
//! then detect "nothing changed" with a pointer comparison.
//!
//! # Thread Safety
//!
//! The remembered call is protected by a lock, but the lock is not held
//! while the wrapped function runs, so the function may itself call other
//! memos (or, in principle, this one).

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use super::equality::{Equality, SharedEquality};

/// The remembered call.
#[derive(Clone)]
struct LastCall<A, R> {
    params: A,
    result: R,
}

/// A single-slot memoized function.
///
/// # Type Parameters
///
/// - `A`: the parameters, passed as one value (use a tuple for several).
/// - `R`: the result. Must be `Clone`; in practice it is an `Arc`.
pub struct Memo<A, R> {
    /// The wrapped function.
    compute: Box<dyn Fn(&A) -> R + Send + Sync>,

    /// Decides whether a call can be answered from the slot.
    params_equal: SharedEquality<A>,

    /// Decides whether a fresh result may be replaced by the remembered one.
    /// `None` means a fresh result always wins.
    results_equal: Option<SharedEquality<R>>,

    /// The most recent call.
    last: Mutex<Option<LastCall<A, R>>>,
}

impl<A, R> Memo<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Wrap `compute`, answering repeated calls whose parameters satisfy
    /// `params_equal`.
    pub fn new<F, E>(compute: F, params_equal: E) -> Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        E: Equality<A> + 'static,
    {
        Self {
            compute: Box::new(compute),
            params_equal: Arc::new(params_equal),
            results_equal: None,
            last: Mutex::new(None),
        }
    }

    /// Keep the remembered result whenever a recomputation yields an
    /// equivalent one.
    pub fn with_result_equality<E>(mut self, results_equal: E) -> Self
    where
        E: Equality<R> + 'static,
    {
        self.results_equal = Some(Arc::new(results_equal));
        self
    }

    /// Call the memoized function.
    pub fn call(&self, params: A) -> R {
        let previous = {
            let last = self.last.lock();
            match last.as_ref() {
                Some(call) if self.params_equal.equals(&call.params, &params) => {
                    return call.result.clone();
                }
                Some(call) => Some(call.result.clone()),
                None => None,
            }
        };

        let fresh = (self.compute)(&params);

        let result = match (previous, &self.results_equal) {
            (Some(previous), Some(results_equal)) if results_equal.equals(&previous, &fresh) => previous,
            _ => fresh,
        };

        *self.last.lock() = Some(LastCall {
            params,
            result: result.clone(),
        });

        result
    }

    /// Forget the remembered call.
    pub fn clear(&self) {
        *self.last.lock() = None;
    }

    /// Check if the memo remembers a call.
    pub fn has_value(&self) -> bool {
        self.last.lock().is_some()
    }
}

impl<A, R> Debug for Memo<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("has_value", &self.last.lock().is_some())
            .field("keeps_equal_results", &self.results_equal.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
