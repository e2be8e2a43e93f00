//! The Reconciliation Loop
//!
//! [`next_async_props`] brings a consumer's async props to a fixed point:
//!
//! ```text
//! loop:
//!     state   := read state
//!     next    := map state to async props
//!     command := first pending command of next, in property order
//!     if there is none: stop
//!     execute command
//! ```
//!
//! Only one command runs per iteration, and the state is read again before
//! the next one is chosen. Two properties waiting on the same cache slot
//! therefore cause one fetch: once the first command dispatched its
//! `Await`, the slot is awaiting for both.
//!
//! When no command remains, every property is merged with the previous
//! output using [`AsyncProps::reconcile`]. [`next_async_props_and_state`]
//! also hands back the state the loop settled on, so anything else a
//! consumer reads can come from the same snapshot.

use tracing::{trace, warn};

use super::executor::CommandExecutor;
use super::props::AsyncProps;
use crate::config::ReconcileConfig;
use crate::error::{Error, Result};

/// Run commands until none is pending, then merge with `previous`.
///
/// Fails with [`Error::ReconcileLimit`] once `config.max_iterations`
/// commands ran and another one is still pending, which happens when the
/// executor never moves a slot out of the absent state.
pub fn next_async_props<S, P, A, X, G, M>(
    executor: &X,
    get_state: G,
    map_state: M,
    props: &P,
    previous: Option<&A>,
    config: &ReconcileConfig,
) -> Result<A>
where
    A: AsyncProps<S, P>,
    A::Command: Clone,
    X: CommandExecutor<A::Command> + ?Sized,
    G: Fn() -> S,
    M: Fn(&S, &P) -> A,
{
    next_async_props_and_state(executor, get_state, map_state, props, previous, config).map(|(next, _)| next)
}

/// [`next_async_props`], also returning the state the props were mapped
/// from in the last iteration.
pub fn next_async_props_and_state<S, P, A, X, G, M>(
    executor: &X,
    get_state: G,
    map_state: M,
    props: &P,
    previous: Option<&A>,
    config: &ReconcileConfig,
) -> Result<(A, S)>
where
    A: AsyncProps<S, P>,
    A::Command: Clone,
    X: CommandExecutor<A::Command> + ?Sized,
    G: Fn() -> S,
    M: Fn(&S, &P) -> A,
{
    let mut state = get_state();
    let mut next = map_state(&state, props);
    let mut executed = 0;

    while let Some(command) = next.next_command().cloned() {
        if executed == config.max_iterations {
            warn!(iterations = executed, "reconciliation did not settle");
            return Err(Error::ReconcileLimit { iterations: executed });
        }
        executed += 1;
        trace!(iteration = executed, "executing command");
        executor.execute(command);

        state = get_state();
        next = map_state(&state, props);
    }

    let next = A::reconcile(previous, next, &state, props);
    Ok((next, state))
}
