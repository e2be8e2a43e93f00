//! Asynchronous Selectors
//!
//! A selector is a pure projection from a state snapshot `S` (and the own
//! props `P` of whoever asks) to a derived value. An [`AsyncSelector`]
//! yields an [`AsyncSelectorResult`]: an [`AsyncValue`] together with the
//! tracked inputs that justify keeping a stale value around while that
//! value is recomputed.
//!
//! Results are handed out behind an `Arc`. Composed selectors keep
//! returning the same `Arc` for as long as the underlying value is
//! unchanged, so "did anything change?" is a pointer comparison.

use std::fmt::Debug;
use std::sync::Arc;

use super::async_value::AsyncValue;
use super::tracked::Tracked;

/// What a selector passes to the selectors composed from it.
pub struct AsyncSelectorResult<S, P, C, V> {
    value: AsyncValue<C, V>,
    tracked: Vec<Tracked<S, P>>,
}

/// A shared selector result.
pub type SelectorOutput<S, P, C, V> = Arc<AsyncSelectorResult<S, P, C, V>>;

impl<S, P, C, V> AsyncSelectorResult<S, P, C, V> {
    pub fn new(value: AsyncValue<C, V>, tracked: Vec<Tracked<S, P>>) -> Self {
        Self { value, tracked }
    }

    /// A received value that depends on no tracked input.
    pub fn from_value(value: V) -> Self {
        Self::new(AsyncValue::Received(value), Vec::new())
    }

    pub fn value(&self) -> &AsyncValue<C, V> {
        &self.value
    }

    pub fn tracked(&self) -> &[Tracked<S, P>] {
        &self.tracked
    }

    /// The first command this result is waiting on, if any.
    pub fn first_command(&self) -> Option<&C> {
        self.value.commands().first()
    }

    /// The value to present, or `None` while it is not yet available.
    pub fn received_value(&self) -> Option<&V> {
        self.value.received_value()
    }

    pub fn into_parts(self) -> (AsyncValue<C, V>, Vec<Tracked<S, P>>) {
        (self.value, self.tracked)
    }
}

impl<S, P, C, V> Clone for AsyncSelectorResult<S, P, C, V>
where
    C: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            tracked: self.tracked.clone(),
        }
    }
}

impl<S, P, C, V> Debug for AsyncSelectorResult<S, P, C, V>
where
    C: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSelectorResult")
            .field("value", &self.value)
            .field("tracked", &self.tracked)
            .finish()
    }
}

/// Equivalence of two shared results, as used by memoized selectors.
///
/// The same `Arc` is always equivalent; otherwise the async values decide
/// (see [`AsyncValue::is_equivalent`]). Tracked inputs are ignored: two
/// results produced by the same selectors track the same inputs.
pub fn results_are_equal<S, P, C, V>(left: &SelectorOutput<S, P, C, V>, right: &SelectorOutput<S, P, C, V>) -> bool
where
    V: PartialEq,
{
    Arc::ptr_eq(left, right) || left.value.is_equivalent(&right.value)
}

type SelectFn<S, P, C, V> = dyn Fn(&S, &P) -> SelectorOutput<S, P, C, V> + Send + Sync;

/// A selector producing [`AsyncSelectorResult`]s.
///
/// Cloning is cheap and clones share any memoized state.
pub struct AsyncSelector<S, P, C, V> {
    select: Arc<SelectFn<S, P, C, V>>,
}

impl<S, P, C, V> AsyncSelector<S, P, C, V>
where
    S: 'static,
    P: 'static,
    C: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Wrap a function that already produces shared results.
    pub fn new<F>(select: F) -> Self
    where
        F: Fn(&S, &P) -> SelectorOutput<S, P, C, V> + Send + Sync + 'static,
    {
        Self {
            select: Arc::new(select),
        }
    }

    /// Lift a plain selector: its value is always received.
    pub fn from_value_fn<F>(select: F) -> Self
    where
        F: Fn(&S, &P) -> V + Send + Sync + 'static,
    {
        Self::new(move |state: &S, props: &P| Arc::new(AsyncSelectorResult::from_value(select(state, props))))
    }

    /// Lift a selector that computes an [`AsyncValue`] without tracking
    /// any input.
    pub fn from_async_fn<F>(select: F) -> Self
    where
        F: Fn(&S, &P) -> AsyncValue<C, V> + Send + Sync + 'static,
    {
        Self::new(move |state: &S, props: &P| Arc::new(AsyncSelectorResult::new(select(state, props), Vec::new())))
    }
}

impl<S, P, C, V> AsyncSelector<S, P, C, V> {
    /// Evaluate the selector.
    pub fn select(&self, state: &S, props: &P) -> SelectorOutput<S, P, C, V> {
        (self.select)(state, props)
    }
}

impl<S, P, C, V> Clone for AsyncSelector<S, P, C, V> {
    fn clone(&self) -> Self {
        Self {
            select: Arc::clone(&self.select),
        }
    }
}

impl<S, P, C, V> Debug for AsyncSelector<S, P, C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSelector").finish_non_exhaustive()
    }
}

/// Anything usable as an input of a composed selector.
///
/// Implemented by [`AsyncSelector`] and by plain selector functions
/// `Fn(&S, &P) -> V`, whose values are coerced to received results. This
/// lets synchronous and asynchronous selectors compose transparently.
/// Closures need their argument types spelled out, e.g.
/// `|state: &State, _: &()| state.query.clone()`.
pub trait IntoAsyncSelector<S, P, C> {
    type Value;

    fn into_async_selector(self) -> AsyncSelector<S, P, C, Self::Value>;
}

impl<S, P, C, V> IntoAsyncSelector<S, P, C> for AsyncSelector<S, P, C, V> {
    type Value = V;

    fn into_async_selector(self) -> AsyncSelector<S, P, C, V> {
        self
    }
}

impl<S, P, C, V, F> IntoAsyncSelector<S, P, C> for F
where
    S: 'static,
    P: 'static,
    C: Send + Sync + 'static,
    V: Send + Sync + 'static,
    F: Fn(&S, &P) -> V + Send + Sync + 'static,
{
    type Value = V;

    fn into_async_selector(self) -> AsyncSelector<S, P, C, V> {
        AsyncSelector::from_value_fn(self)
    }
}
