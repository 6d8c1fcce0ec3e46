use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError(err.to_string()))
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tessera_cache_hit_total",
            Unit::Count,
            "Total number of query reads served from a fresh cache entry."
        );
        describe_counter!(
            "tessera_cache_miss_total",
            Unit::Count,
            "Total number of query reads that had to fetch."
        );
        describe_counter!(
            "tessera_cache_evict_total",
            Unit::Count,
            "Total number of cache evictions due to capacity."
        );
        describe_counter!(
            "tessera_cache_invalidated_total",
            Unit::Count,
            "Total number of cache entries marked invalidated."
        );
        describe_counter!(
            "tessera_query_fetch_total",
            Unit::Count,
            "Total number of query fetches, labelled by outcome."
        );
        describe_counter!(
            "tessera_mutation_total",
            Unit::Count,
            "Total number of settled mutations, labelled by action and outcome."
        );
        describe_histogram!(
            "tessera_mutation_ms",
            Unit::Milliseconds,
            "Mutation latency from request to settlement in milliseconds."
        );
    });
}
