//! Asynchronous Selectors
//!
//! This module contains the derivation half of Cachet:
//!
//! - [`AsyncValue`]: the tri-state "pending / awaiting / received" value and
//!   its combinators
//! - [`Memo`]: a single-slot memoized function with parameter and result
//!   equality
//! - [`Tracked`]: user-input dependencies with change detection
//! - [`AsyncSelector`]: selectors producing shared [`AsyncSelectorResult`]s
//! - [`create_async_selector`] and [`create_tracked_selector`]: composition
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cachet_core::select::{create_async_selector, AsyncSelector, AsyncValue};
//!
//! struct AppState {
//!     width: u32,
//!     height: u32,
//! }
//!
//! let width = |state: &Arc<AppState>, _: &()| state.width;
//! let height = |state: &Arc<AppState>, _: &()| state.height;
//! let area: AsyncSelector<Arc<AppState>, (), (), u32> =
//!     create_async_selector((width, height), |(w, h): (u32, u32)| w * h);
//!
//! let state = Arc::new(AppState { width: 3, height: 4 });
//! assert_eq!(area.select(&state, &()).value(), &AsyncValue::Received(12));
//! ```

mod async_value;
mod compose;
mod equality;
mod memo;
mod selector;
mod tracked;

pub use async_value::{combine_many, sequence, AsyncValue, Commands};
pub use compose::{
    create_async_selector, create_async_selector_flat, create_tracked_selector, IntoSelectorInputs, SelectorInputs,
};
pub use equality::{by_value, maps_are_equal, same_arc, slices_are_equal, Equality, Identity, SharedEquality};
pub use memo::Memo;
pub use selector::{results_are_equal, AsyncSelector, AsyncSelectorResult, IntoAsyncSelector, SelectorOutput};
pub use tracked::{combine_tracked, some_has_changed, Tracked, TrackedId};
