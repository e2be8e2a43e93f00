//! Connecting Consumers
//!
//! This module drives derived values to a presentable state:
//!
//! - [`CommandExecutor`]: the seam through which commands take effect
//! - [`AsyncProps`]: a consumer's set of selector results
//! - [`next_async_props`]: the reconciliation loop
//! - [`AppStateSubscriber`]: a consumer's connected state, kept current
//!   across state changes

mod executor;
mod props;
mod reconcile;
mod subscriber;

pub use executor::{CommandExecutor, SharedExecutor};
pub use props::{next_property, AsyncProps, PropMap};
pub use reconcile::{next_async_props, next_async_props_and_state};
pub use subscriber::{AppStateSubscriber, ConnectedState};
