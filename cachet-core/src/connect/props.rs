//! Async Props
//!
//! A consumer asks for several derived values at once: its *async props*,
//! one [`SelectorOutput`] per property. The reconciliation loop needs three
//! things from such a set, captured by [`AsyncProps`]:
//!
//! - the first pending command, in property order,
//! - how to merge a fresh evaluation with the previous output,
//! - whether anything changed, by reference, since the previous output.
//!
//! Two implementations are provided. [`PropMap`] is a string-keyed map of
//! same-typed properties. The [`async_props!`](crate::async_props) macro
//! declares a struct with one typed field per property and implements
//! [`AsyncProps`] for it.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::select::{some_has_changed, SelectorOutput};

/// A set of selector results handed to one consumer.
pub trait AsyncProps<S, P>: Sized {
    type Command;

    /// The first command any property is pending on.
    fn next_command(&self) -> Option<&Self::Command>;

    /// Merge a settled evaluation `next` with the `previous` output,
    /// property by property (see [`next_property`]).
    fn reconcile(previous: Option<&Self>, next: Self, state: &S, props: &P) -> Self;

    /// Returns `true` if any property is a different result than in
    /// `previous`.
    fn has_changed_from(&self, previous: &Self) -> bool;
}

/// Choose what one property shows after a pass.
///
/// A received value always wins. Otherwise the new evaluation is shown
/// only if the previous output's tracked inputs changed: the user asked
/// something new, so the old answer must go. If they did not, the refresh
/// is incidental and the previous output stays.
pub fn next_property<S, P, C, V>(
    previous: Option<&SelectorOutput<S, P, C, V>>,
    next: SelectorOutput<S, P, C, V>,
    state: &S,
    props: &P,
) -> SelectorOutput<S, P, C, V> {
    match previous {
        _ if next.value().is_received() => next,
        Some(previous) if !some_has_changed(previous.tracked(), state, props) => Arc::clone(previous),
        _ => next,
    }
}

/// String-keyed async props of one value type.
///
/// Properties are visited in insertion order.
pub struct PropMap<S, P, C, V> {
    props: IndexMap<String, SelectorOutput<S, P, C, V>>,
}

impl<S, P, C, V> PropMap<S, P, C, V> {
    pub fn new() -> Self {
        Self { props: IndexMap::new() }
    }

    /// Add or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, result: SelectorOutput<S, P, C, V>) {
        self.props.insert(name.into(), result);
    }

    /// Builder form of [`PropMap::insert`].
    pub fn with(mut self, name: impl Into<String>, result: SelectorOutput<S, P, C, V>) -> Self {
        self.insert(name, result);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SelectorOutput<S, P, C, V>> {
        self.props.get(name)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, SelectorOutput<S, P, C, V>> {
        self.props.iter()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// The value of every property, `None` where it is not yet available.
    pub fn to_sync_props(&self) -> IndexMap<String, Option<V>>
    where
        V: Clone,
    {
        self.props
            .iter()
            .map(|(name, result)| (name.clone(), result.received_value().cloned()))
            .collect()
    }
}

impl<S, P, C, V> AsyncProps<S, P> for PropMap<S, P, C, V> {
    type Command = C;

    fn next_command(&self) -> Option<&C> {
        self.props.values().find_map(|result| result.first_command())
    }

    fn reconcile(previous: Option<&Self>, next: Self, state: &S, props: &P) -> Self {
        let reconciled = next
            .props
            .into_iter()
            .map(|(name, result)| {
                let before = previous.and_then(|previous| previous.props.get(&name));
                let result = next_property(before, result, state, props);
                (name, result)
            })
            .collect();
        Self { props: reconciled }
    }

    fn has_changed_from(&self, previous: &Self) -> bool {
        self.props.len() != previous.props.len()
            || previous.props.iter().any(|(name, before)| match self.props.get(name) {
                Some(now) => !Arc::ptr_eq(before, now),
                None => true,
            })
    }
}

impl<S, P, C, V> Clone for PropMap<S, P, C, V> {
    fn clone(&self) -> Self {
        Self {
            props: self.props.clone(),
        }
    }
}

impl<S, P, C, V> Default for PropMap<S, P, C, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P, C: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for PropMap<S, P, C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.props.iter()).finish()
    }
}

/// Declare a struct of typed async props.
///
/// ```rust
/// use std::sync::Arc;
/// use cachet_core::async_props;
///
/// struct AppState;
/// #[derive(Debug, Clone, PartialEq)]
/// enum Command {
///     FetchArticles,
/// }
///
/// async_props! {
///     /// What the article list shows.
///     #[derive(Debug, Clone)]
///     pub struct ArticleProps<Arc<AppState>, (), Command> => ArticleValues {
///         titles: Vec<String>,
///         user_name: String,
///     }
/// }
/// ```
///
/// expands to `ArticleProps`, holding one `SelectorOutput` per field, an
/// [`AsyncProps`] implementation visiting the fields in declaration order,
/// and `ArticleValues`, holding one `Option` per field, built by
/// `ArticleProps::to_sync_props`.
#[macro_export]
macro_rules! async_props {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident < $state:ty, $props:ty, $command:ty > => $values:ident {
            $( $(#[$field_meta:meta])* $field:ident : $value:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$field_meta])* pub $field: $crate::select::SelectorOutput<$state, $props, $command, $value>, )*
        }

        /// Presentable values; `None` where a value is not yet available.
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $values {
            $( pub $field: ::std::option::Option<$value>, )*
        }

        impl $name {
            /// The received value of every property.
            pub fn to_sync_props(&self) -> $values {
                $values {
                    $( $field: self.$field.received_value().cloned(), )*
                }
            }
        }

        impl $crate::connect::AsyncProps<$state, $props> for $name {
            type Command = $command;

            fn next_command(&self) -> ::std::option::Option<&$command> {
                let command: ::std::option::Option<&$command> = ::std::option::Option::None;
                $( let command = command.or_else(|| self.$field.first_command()); )*
                command
            }

            fn reconcile(previous: ::std::option::Option<&Self>, next: Self, state: &$state, props: &$props) -> Self {
                Self {
                    $(
                        $field: $crate::connect::next_property(
                            previous.map(|previous| &previous.$field),
                            next.$field,
                            state,
                            props,
                        ),
                    )*
                }
            }

            fn has_changed_from(&self, previous: &Self) -> bool {
                false $( || !::std::sync::Arc::ptr_eq(&self.$field, &previous.$field) )*
            }
        }
    };
}
