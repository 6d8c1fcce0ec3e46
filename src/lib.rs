//! Typed, cache-aware client for the Tessera content API.
//!
//! - [`api`]: one async function per endpoint, plus chunking helpers.
//! - [`cache`]: structural query keys and the LRU query cache.
//! - [`query`]: cached reads built from a key and a fetch function.
//! - [`mutation`]: writes with optimistic updates, rollback and
//!   invalidation.
//! - [`QueryClient`]: owns the transport, cache and notifier.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod telemetry;

pub use tessera_api_types as types;

pub use client::{ClientConfig, QueryClient};
pub use error::{ApiError, ApiResult};
pub use mutation::{Mutation, MutationState, Outcome, PendingMutation};
pub use notify::{Action, Notification, NotificationLog, Notifier, Phase, TracingNotifier};
pub use query::{DebouncedQuery, Debouncer, Query, QueryOptions, QueryResult};
