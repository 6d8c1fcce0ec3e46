//! Cached reads.
//!
//! A [`Query`] binds a cache key to the function that fetches it. Hooks in
//! the submodules build queries for each resource as methods on
//! [`QueryClient`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ApiContext;
use crate::cache::{FetchStatus, QueryCache, QueryKey};
use crate::client::QueryClient;
use crate::error::{ApiError, ApiResult};
use flight::Flight;

mod chat;
mod debounce;
mod flight;
mod items;
mod members;
mod memberships;
mod subscriptions;
mod tags;

pub use debounce::{DebouncedQuery, Debouncer};
pub(crate) use flight::InFlight;

const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;
type FanOut<T> = Box<dyn Fn(&QueryCache, &T) + Send + Sync>;

/// Defaults applied to every query built by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a cached value is served without refetching.
    pub stale_time: Duration,
    /// Delay applied to debounced search input.
    pub debounce: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl From<&crate::config::QuerySettings> for QueryOptions {
    fn from(settings: &crate::config::QuerySettings) -> Self {
        Self {
            stale_time: settings.stale_time,
            debounce: settings.debounce,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<Arc<ApiError>>,
    /// True once a fetch has completed for this key.
    pub is_fetched: bool,
    /// True while a fetch for this key is in flight.
    pub is_loading: bool,
}

impl<T> QueryResult<T> {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Query<'c, T> {
    client: &'c QueryClient,
    key: QueryKey,
    enabled: bool,
    stale_time: Duration,
    fetcher: Fetcher<T>,
    fan_out: Option<FanOut<T>>,
}

impl<'c, T> Query<'c, T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(client: &'c QueryClient, key: QueryKey, enabled: bool, fetcher: Fetcher<T>) -> Self {
        Self {
            client,
            key,
            enabled,
            stale_time: client.options().stale_time,
            fetcher,
            fan_out: None,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Further restrict enablement; a query disabled by a missing id stays
    /// disabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled &= enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Also write parts of each fetched value under other keys.
    pub(crate) fn fan_out<F>(mut self, fan_out: F) -> Self
    where
        F: Fn(&QueryCache, &T) + Send + Sync + 'static,
    {
        self.fan_out = Some(Box::new(fan_out));
        self
    }

    /// Serve a fresh cached value, or fetch. Disabled queries never fetch,
    /// and concurrent fetches of one key share a single request.
    pub async fn fetch(&self) -> QueryResult<T> {
        if !self.enabled {
            debug!(key = %self.key, "Query disabled");
            return QueryResult {
                is_fetched: false,
                ..self.state()
            };
        }

        let cache = self.client.cache();
        if cache.is_fresh(&self.key, self.stale_time) {
            if let Some(data) = cache.get::<T>(&self.key) {
                counter!("tessera_cache_hit_total").increment(1);
                return QueryResult {
                    data: Some(data),
                    error: None,
                    is_fetched: true,
                    is_loading: false,
                };
            }
        }

        counter!("tessera_cache_miss_total").increment(1);
        match self.client.in_flight().join(&self.key) {
            Flight::Leader(guard) => {
                let result = self.run().await;
                guard.land(result.error.clone());
                result
            }
            Flight::Follower(receiver) => match flight::wait(receiver).await {
                Some(error) => QueryResult {
                    data: self.client.cache().peek::<T>(&self.key),
                    error,
                    is_fetched: true,
                    is_loading: false,
                },
                None => self.run().await,
            },
        }
    }

    /// Fetch regardless of freshness and enablement.
    pub async fn refetch(&self) -> QueryResult<T> {
        self.run().await
    }

    /// Current cache state for the key, without fetching.
    pub fn state(&self) -> QueryResult<T> {
        let cache = self.client.cache();
        let state = cache.state(&self.key);
        QueryResult {
            data: cache.peek::<T>(&self.key),
            error: None,
            is_fetched: state.is_some_and(|s| s.updated_at.is_some()),
            is_loading: state.is_some_and(|s| s.status == FetchStatus::Fetching),
        }
    }

    async fn run(&self) -> QueryResult<T> {
        let cache = self.client.cache();
        let ticket = cache.begin_fetch(&self.key);

        match (self.fetcher)().await {
            Ok(value) => {
                counter!("tessera_query_fetch_total", "outcome" => "ok").increment(1);
                let stored = cache.complete_fetch(&ticket, value.clone());
                if !stored {
                    return QueryResult {
                        data: cache.peek::<T>(&self.key),
                        error: None,
                        is_fetched: true,
                        is_loading: false,
                    };
                }
                if let Some(fan_out) = &self.fan_out {
                    fan_out(cache, &value);
                }
                QueryResult {
                    data: Some(value),
                    error: None,
                    is_fetched: true,
                    is_loading: false,
                }
            }
            Err(err) => {
                counter!("tessera_query_fetch_total", "outcome" => "error").increment(1);
                cache.fail_fetch(&ticket);
                if err.is_contract_violation() {
                    warn!(key = %self.key, error = %err, "Query fetched without a required argument");
                } else {
                    debug!(key = %self.key, error = %err, "Query fetch failed");
                }
                QueryResult {
                    data: cache.peek::<T>(&self.key),
                    error: Some(Arc::new(err)),
                    is_fetched: true,
                    is_loading: false,
                }
            }
        }
    }
}

impl QueryClient {
    /// Build a query for `key`. The fetch closure receives a clone of the
    /// API context on every run.
    pub fn query<T, F, Fut>(&self, key: QueryKey, enabled: bool, fetch: F) -> Query<'_, T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let api = self.api().clone();
        let fetcher: Fetcher<T> = Box::new(move || fetch(api.clone()).boxed());
        Query::new(self, key, enabled, fetcher)
    }
}

/// The id a fetch needs, or `UndefinedArgument` when a forced refetch runs
/// without it.
pub(crate) fn require(id: Option<Uuid>, name: &'static str) -> ApiResult<Uuid> {
    id.ok_or(ApiError::UndefinedArgument(name))
}
