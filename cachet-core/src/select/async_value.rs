//! The AsyncValue Algebra
//!
//! An [`AsyncValue`] is "a value that may require work to obtain". It is in
//! exactly one of three states:
//!
//! - [`AsyncValue::Pending`]: one or more commands must run before a value
//!   can exist.
//! - [`AsyncValue::Awaiting`]: a request is in flight; nothing to run, no
//!   value yet.
//! - [`AsyncValue::Received`]: the value is available now.
//!
//! `combine`, `sequence`, `map` and `flatten` make this an applicative
//! functor. When two values are combined, commands always surface, an
//! awaiting value blocks value production unless a command is needed, and
//! only full availability runs the combining function.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cache::CacheItem;

/// The commands carried by a pending value. Almost always exactly one.
pub type Commands<C> = SmallVec<[C; 1]>;

/// A value that may require work to obtain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsyncValue<C, V> {
    /// Commands must run before a value can exist.
    Pending(Commands<C>),
    /// A request is in flight.
    Awaiting,
    /// The value is available.
    Received(V),
}

impl<C, V> AsyncValue<C, V> {
    /// A value that needs `command` to run.
    pub fn pending(command: C) -> Self {
        AsyncValue::Pending(smallvec::smallvec![command])
    }

    /// A value whose request is in flight.
    pub fn awaiting() -> Self {
        AsyncValue::Awaiting
    }

    /// An available value.
    pub fn received(value: V) -> Self {
        AsyncValue::Received(value)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncValue::Pending(_))
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, AsyncValue::Awaiting)
    }

    pub fn is_received(&self) -> bool {
        matches!(self, AsyncValue::Received(_))
    }

    /// Applicative merge of two values.
    ///
    /// `Pending` absorbs anything but another `Pending`, in which case the
    /// command lists are concatenated left before right. `Awaiting` absorbs
    /// `Received`. Only two `Received` values invoke `f`.
    pub fn combine<W, R, F>(self, right: AsyncValue<C, W>, f: F) -> AsyncValue<C, R>
    where
        F: FnOnce(V, W) -> R,
    {
        match (self, right) {
            (AsyncValue::Pending(mut left), AsyncValue::Pending(right)) => {
                left.extend(right);
                AsyncValue::Pending(left)
            }
            (AsyncValue::Pending(left), _) => AsyncValue::Pending(left),
            (_, AsyncValue::Pending(right)) => AsyncValue::Pending(right),
            (AsyncValue::Awaiting, _) | (_, AsyncValue::Awaiting) => AsyncValue::Awaiting,
            (AsyncValue::Received(left), AsyncValue::Received(right)) => AsyncValue::Received(f(left, right)),
        }
    }

    /// Transform the received value; `Pending` and `Awaiting` pass through.
    pub fn map<R, F>(self, f: F) -> AsyncValue<C, R>
    where
        F: FnOnce(V) -> R,
    {
        match self {
            AsyncValue::Pending(commands) => AsyncValue::Pending(commands),
            AsyncValue::Awaiting => AsyncValue::Awaiting,
            AsyncValue::Received(value) => AsyncValue::Received(f(value)),
        }
    }

    /// `map` followed by `flatten`.
    pub fn and_then<R, F>(self, f: F) -> AsyncValue<C, R>
    where
        F: FnOnce(V) -> AsyncValue<C, R>,
    {
        self.map(f).flatten()
    }

    /// Borrow the payload.
    pub fn as_ref(&self) -> AsyncValue<&C, &V> {
        match self {
            AsyncValue::Pending(commands) => AsyncValue::Pending(commands.iter().collect()),
            AsyncValue::Awaiting => AsyncValue::Awaiting,
            AsyncValue::Received(value) => AsyncValue::Received(value),
        }
    }

    /// The commands of a pending value, otherwise nothing.
    pub fn commands(&self) -> &[C] {
        match self {
            AsyncValue::Pending(commands) => commands.as_slice(),
            AsyncValue::Awaiting | AsyncValue::Received(_) => &[],
        }
    }

    /// Take the commands out of a pending value.
    pub fn into_commands(self) -> Commands<C> {
        match self {
            AsyncValue::Pending(commands) => commands,
            AsyncValue::Awaiting | AsyncValue::Received(_) => Commands::new(),
        }
    }

    /// The received value, if any.
    pub fn received_value(&self) -> Option<&V> {
        match self {
            AsyncValue::Received(value) => Some(value),
            AsyncValue::Pending(_) | AsyncValue::Awaiting => None,
        }
    }

    pub fn into_received(self) -> Option<V> {
        match self {
            AsyncValue::Received(value) => Some(value),
            AsyncValue::Pending(_) | AsyncValue::Awaiting => None,
        }
    }

    /// Equivalence used for memoization.
    ///
    /// Two `Received` are equal if their values are, two `Awaiting` always
    /// are. Pending values never compare equal: commands are short-lived
    /// and not worth comparing.
    pub fn is_equivalent(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        match (self, other) {
            (AsyncValue::Received(left), AsyncValue::Received(right)) => left == right,
            (AsyncValue::Awaiting, AsyncValue::Awaiting) => true,
            _ => false,
        }
    }
}

impl<C, V> AsyncValue<C, AsyncValue<C, V>> {
    /// Monadic join: unwrap a received value that is itself an `AsyncValue`.
    ///
    /// Combining functions may return an `AsyncValue` to inject their own
    /// pending or awaiting signal; flattening merges that back in.
    pub fn flatten(self) -> AsyncValue<C, V> {
        match self {
            AsyncValue::Pending(commands) => AsyncValue::Pending(commands),
            AsyncValue::Awaiting => AsyncValue::Awaiting,
            AsyncValue::Received(inner) => inner,
        }
    }
}

impl<C, K, V, M> From<CacheItem<K, V, M>> for AsyncValue<C, V> {
    fn from(item: CacheItem<K, V, M>) -> Self {
        match item {
            CacheItem::Awaiting { .. } => AsyncValue::Awaiting,
            CacheItem::Received { value, .. } => AsyncValue::Received(value),
        }
    }
}

/// Left fold of [`AsyncValue::combine`] seeded with `Received(vec![])`.
///
/// The accumulator vector is created here and never shared, so values are
/// pushed into it in place.
pub fn sequence<C, V, I>(values: I) -> AsyncValue<C, Vec<V>>
where
    I: IntoIterator<Item = AsyncValue<C, V>>,
{
    let values = values.into_iter();
    let seed = AsyncValue::Received(Vec::with_capacity(values.size_hint().0));
    values.fold(seed, |acc, value| {
        acc.combine(value, |mut values, value| {
            values.push(value);
            values
        })
    })
}

/// Sequence `values`, then apply `f` to the collected values.
pub fn combine_many<C, V, R, I, F>(values: I, f: F) -> AsyncValue<C, R>
where
    I: IntoIterator<Item = AsyncValue<C, V>>,
    F: FnOnce(Vec<V>) -> R,
{
    sequence(values).map(f)
}
