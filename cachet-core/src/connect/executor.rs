//! The command-execution seam.

use std::sync::Arc;

/// Runs the side effect a command describes.
///
/// Executors are expected, by convention, to eventually dispatch an `Await`
/// and then a `Receive` action for the command, synchronously or later.
/// Nothing here depends on the timing, and failures are the executor's own
/// business.
pub trait CommandExecutor<C> {
    fn execute(&self, command: C);
}

impl<C, F> CommandExecutor<C> for F
where
    F: Fn(C),
{
    fn execute(&self, command: C) {
        self(command)
    }
}

/// A shared executor.
pub type SharedExecutor<C> = Arc<dyn CommandExecutor<C> + Send + Sync>;
