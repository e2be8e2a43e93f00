//! Cachet Core
//!
//! This crate reconciles a synchronous application state with data that
//! has to be fetched asynchronously. Given a state snapshot it decides, for
//! every derived value, whether the value is available, is on its way, or
//! needs a command (such as a network fetch) to be issued, while avoiding
//! redundant fetches, redundant recomputation and stale output.
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - `select`: the `AsyncValue` algebra, memoization and selector
//!   composition
//! - `cache`: request-tracking caches, their actions and reducer, and fetch
//!   commands
//! - `connect`: the reconciliation loop and the app-state subscriber
//!
//! Data flows from the application state through cache selectors (which
//! read cache items or emit a fetch command) into composed selectors. The
//! reconciliation loop executes pending commands, which dispatch actions
//! into the state, and re-reads the state until no command remains.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cachet_core::cache::{Cache, CacheDefinition, CacheView, Limiter};
//! use cachet_core::select::{by_value, create_async_selector_flat, AsyncSelector, AsyncValue};
//!
//! #[derive(Default)]
//! struct AppState {
//!     query: String,
//!     results: Cache<String, Vec<String>, ()>,
//! }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Search(String);
//!
//! let results = CacheDefinition::new(
//!     "results",
//!     |state: &Arc<AppState>| &state.results,
//!     by_value::<String>,
//!     Limiter::default(),
//! );
//!
//! let query = |state: &Arc<AppState>, _: &()| state.query.clone();
//! let search: AsyncSelector<Arc<AppState>, (), Search, Vec<String>> = create_async_selector_flat(
//!     (query, results.selector()),
//!     |(query, cache): (String, CacheView<String, Vec<String>, ()>)| {
//!         cache.get_for(query.clone()).or_else(Search(query))
//!     },
//! );
//!
//! let state = Arc::new(AppState {
//!     query: "guitar".into(),
//!     ..AppState::default()
//! });
//! let result = search.select(&state, &());
//! assert_eq!(result.value(), &AsyncValue::pending(Search("guitar".into())));
//! ```

pub mod cache;
pub mod config;
pub mod connect;
pub mod error;
pub mod select;

pub use config::Config;
pub use error::{Error, Result};
