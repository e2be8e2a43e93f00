//! Equality Capabilities
//!
//! Cachet never relies on a single notion of "the same value". Cache keys
//! are matched with a caller-supplied equality (keys are often composite),
//! memoized selectors compare their inputs semantically, and state
//! snapshots are compared by identity.
//!
//! An [`Equality`] is anything that can decide whether two values are
//! equivalent. Plain functions and closures of shape `Fn(&T, &T) -> bool`
//! qualify automatically.

use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

/// A pluggable equivalence predicate.
pub trait Equality<T: ?Sized>: Send + Sync {
    /// Returns `true` if `left` and `right` are equivalent.
    fn equals(&self, left: &T, right: &T) -> bool;
}

impl<T, F> Equality<T> for F
where
    T: ?Sized,
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn equals(&self, left: &T, right: &T) -> bool {
        self(left, right)
    }
}

/// Shared, type-erased equality.
pub type SharedEquality<T> = Arc<dyn Equality<T>>;

/// Structural equality through `PartialEq`.
pub fn by_value<T: PartialEq + ?Sized>(left: &T, right: &T) -> bool {
    left == right
}

/// Reference equality for shared values.
pub fn same_arc<T: ?Sized>(left: &Arc<T>, right: &Arc<T>) -> bool {
    Arc::ptr_eq(left, right)
}

/// Element-wise equality of two slices.
pub fn slices_are_equal<T, E>(left: &[T], right: &[T], equality: &E) -> bool
where
    E: Equality<T> + ?Sized,
{
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| equality.equals(l, r))
}

/// Shallow equality of two maps: same keys, equivalent values.
///
/// Key order is not significant.
pub fn maps_are_equal<K, V, E>(left: &IndexMap<K, V>, right: &IndexMap<K, V>, equality: &E) -> bool
where
    K: Hash + Eq,
    E: Equality<V> + ?Sized,
{
    left.len() == right.len()
        && left.iter().all(|(key, l)| match right.get(key) {
            Some(r) => equality.equals(l, r),
            None => false,
        })
}

/// Identity comparison for state and props snapshots.
///
/// Selectors are memoized on the identity of the snapshot they were called
/// with: calling a selector twice with the same snapshot must not evaluate
/// anything. Snapshots are cheap handles, so implementors are `Clone`.
pub trait Identity: Clone + Send + Sync + 'static {
    /// Returns `true` if both handles refer to the same snapshot.
    fn is_same(&self, other: &Self) -> bool;
}

impl<T: ?Sized + Send + Sync + 'static> Identity for Arc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl Identity for () {
    fn is_same(&self, _other: &Self) -> bool {
        true
    }
}
