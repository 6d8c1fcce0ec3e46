//! Query cache.
//!
//! Every cached read lives under a structural [`QueryKey`]. Keys are built by
//! the typed builders in [`keys`] so that the same logical query always maps
//! to the same entry, and so that invalidating a parent key reaches every
//! query derived from it.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! capacity = 1000
//! ```

mod config;
pub mod keys;
mod lock;
mod snapshot;
mod store;

pub use config::CacheConfig;
pub use keys::{
    ItemKey, ItemKeys, KeyParams, KeyPart, MemberKey, MemberKeys, MembershipKeys, ParamValue,
    QueryKey, SubscriptionKeys, TagKeys,
};
pub(crate) use lock::mutex_lock;
pub use snapshot::{Rollback, Snapshot};
pub use store::{EntryState, FetchStatus, FetchTicket, QueryCache};
