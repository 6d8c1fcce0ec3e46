//! The client object that ties the HTTP layer, the query cache and the
//! notifier together.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::api::{ApiContext, RequestLimits};
use crate::cache::{CacheConfig, QueryCache, QueryKey};
use crate::config::Settings;
use crate::error::ApiResult;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::query::{InFlight, QueryOptions};

/// Everything needed to build a [`QueryClient`].
#[derive(Clone)]
pub struct ClientConfig {
    pub api_host: Url,
    /// Transport to reuse; a default one is built when absent.
    pub http: Option<Client>,
    pub session: Option<String>,
    /// Receives mutation notifications; logs through `tracing` when absent.
    pub notifier: Option<Arc<dyn Notifier>>,
    /// Server pushes replace settle-time invalidation for realtime-backed
    /// mutations.
    pub enable_websocket: bool,
    pub default_query_options: QueryOptions,
    pub cache: CacheConfig,
    pub limits: RequestLimits,
}

impl ClientConfig {
    pub fn new(api_host: Url) -> Self {
        Self {
            api_host,
            http: None,
            session: None,
            notifier: None,
            enable_websocket: false,
            default_query_options: QueryOptions::default(),
            cache: CacheConfig::default(),
            limits: RequestLimits::default(),
        }
    }

    /// Config from resolved settings, with a transport honouring the
    /// configured timeout.
    pub fn from_settings(settings: &Settings) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(ApiContext::user_agent())
            .timeout(settings.api.timeout)
            .build()?;
        Ok(Self {
            api_host: settings.api.host.clone(),
            http: Some(http),
            session: settings.api.token.clone(),
            notifier: None,
            enable_websocket: settings.realtime.enable_websocket,
            default_query_options: QueryOptions::from(&settings.query),
            cache: CacheConfig::from(&settings.cache),
            limits: settings.api.limits,
        })
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_websocket(mut self, enable: bool) -> Self {
        self.enable_websocket = enable;
        self
    }

    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.default_query_options = options;
        self
    }

    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Entry point for cached reads ([`crate::query`]) and mutations
/// ([`crate::mutation`]).
pub struct QueryClient {
    api: ApiContext,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    options: QueryOptions,
    enable_websocket: bool,
    in_flight: InFlight,
}

impl QueryClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = match config.http {
            Some(http) => http,
            None => ApiContext::default_client()?,
        };
        let api = ApiContext::new(http, &config.api_host, config.session, config.limits);
        let notifier = config
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));

        info!(
            host = %api.base(),
            authenticated = api.session().is_some(),
            websocket = config.enable_websocket,
            cache_capacity = config.cache.capacity,
            "Query client ready"
        );

        Ok(Self {
            api,
            cache: Arc::new(QueryCache::new(&config.cache)),
            notifier,
            options: config.default_query_options,
            enable_websocket: config.enable_websocket,
            in_flight: InFlight::default(),
        })
    }

    pub fn api(&self) -> &ApiContext {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn websocket_enabled(&self) -> bool {
        self.enable_websocket
    }

    /// Replace the session token. Cached data is kept; callers that switch
    /// accounts should also call [`QueryCache::clear`].
    pub fn set_session(&mut self, session: Option<String>) {
        self.api.set_session(session);
    }

    /// Mark every entry under `prefix` stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.cache.invalidate(prefix)
    }

    pub(crate) fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(&notification);
    }
}
