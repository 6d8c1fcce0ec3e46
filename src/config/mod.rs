//! Configuration layer: typed settings with layered precedence
//! (file → environment → command-line overrides).

use std::{path::Path, str::FromStr, time::Duration};

use clap::{Args, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::api::RequestLimits;

const LOCAL_CONFIG_BASENAME: &str = "tessera";
const ENV_PREFIX: &str = "TESSERA";
const DEFAULT_API_HOST: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_READ_TARGETS: usize = 20;
const DEFAULT_MAX_MODIFY_TARGETS: usize = 20;
const DEFAULT_CACHE_CAPACITY: usize = 1000;
const DEFAULT_STALE_TIME_MS: u64 = 60_000;
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Command-line overrides, flattened into any binary that loads settings.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the API host.
    #[arg(long = "api-host", env = "TESSERA_API_HOST", value_name = "URL")]
    pub api_host: Option<String>,

    /// Override the session token.
    #[arg(long = "api-token", env = "TESSERA_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Override the request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS")]
    pub api_timeout_seconds: Option<u64>,

    /// Override the maximum number of ids per read request.
    #[arg(long = "api-max-read-targets", value_name = "COUNT")]
    pub api_max_read_targets: Option<usize>,

    /// Override the maximum number of ids per modify request.
    #[arg(long = "api-max-modify-targets", value_name = "COUNT")]
    pub api_max_modify_targets: Option<usize>,

    /// Override the query cache capacity.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Override how long cached reads are served without refetching.
    #[arg(long = "query-stale-time-ms", value_name = "MILLISECONDS")]
    pub query_stale_time_ms: Option<u64>,

    /// Toggle websocket-driven settlement.
    #[arg(
        long = "realtime-enable-websocket",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub enable_websocket: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved client settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub query: QuerySettings,
    pub realtime: RealtimeSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub host: Url,
    pub token: Option<String>,
    pub timeout: Duration,
    pub limits: RequestLimits,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub stale_time: Duration,
    pub debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    pub enable_websocket: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → overrides).
pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    cache: RawCacheSettings,
    query: RawQuerySettings,
    realtime: RawRealtimeSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = overrides.api_host.as_ref() {
            self.api.host = Some(host.clone());
        }
        if let Some(token) = overrides.api_token.as_ref() {
            self.api.token = Some(token.clone());
        }
        if let Some(seconds) = overrides.api_timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(max) = overrides.api_max_read_targets {
            self.api.max_read_targets = Some(max);
        }
        if let Some(max) = overrides.api_max_modify_targets {
            self.api.max_modify_targets = Some(max);
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
        if let Some(ms) = overrides.query_stale_time_ms {
            self.query.stale_time_ms = Some(ms);
        }
        if let Some(enabled) = overrides.enable_websocket {
            self.realtime.enable_websocket = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            cache,
            query,
            realtime,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            cache: build_cache_settings(cache)?,
            query: build_query_settings(query),
            realtime: RealtimeSettings {
                enable_websocket: realtime.enable_websocket.unwrap_or(false),
            },
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let host_value = api.host.unwrap_or_else(|| DEFAULT_API_HOST.to_string());
    let host = Url::parse(host_value.trim())
        .map_err(|err| LoadError::invalid("api.host", format!("failed to parse: {err}")))?;
    if !matches!(host.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.host",
            format!("unsupported scheme `{}`", host.scheme()),
        ));
    }

    let token = api.token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let limits = RequestLimits {
        max_read_targets: non_zero(
            api.max_read_targets.unwrap_or(DEFAULT_MAX_READ_TARGETS),
            "api.max_read_targets",
        )?,
        max_modify_targets: non_zero(
            api.max_modify_targets.unwrap_or(DEFAULT_MAX_MODIFY_TARGETS),
            "api.max_modify_targets",
        )?,
    };

    Ok(ApiSettings {
        host,
        token,
        timeout: Duration::from_secs(timeout_secs),
        limits,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;
    Ok(CacheSettings { capacity })
}

fn build_query_settings(query: RawQuerySettings) -> QuerySettings {
    QuerySettings {
        stale_time: Duration::from_millis(query.stale_time_ms.unwrap_or(DEFAULT_STALE_TIME_MS)),
        debounce: Duration::from_millis(query.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };
    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    Ok(LoggingSettings { level, format })
}

fn non_zero(value: usize, key: &'static str) -> Result<usize, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    host: Option<String>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
    max_read_targets: Option<usize>,
    max_modify_targets: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    stale_time_ms: Option<u64>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRealtimeSettings {
    enable_websocket: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
