use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "storefront_refresh_total",
            Unit::Count,
            "Product refresh cycles by outcome."
        );
        describe_histogram!(
            "storefront_refresh_ms",
            Unit::Milliseconds,
            "Product refresh cycle latency in milliseconds."
        );
        describe_counter!(
            "storefront_refresh_joined_total",
            Unit::Count,
            "Refresh triggers that joined a cycle already in flight."
        );
        describe_gauge!(
            "storefront_cache_records",
            Unit::Count,
            "Number of product records in the current cache snapshot."
        );
        describe_counter!(
            "storefront_upstream_requests_total",
            Unit::Count,
            "Reseller API calls by endpoint and outcome."
        );
    });
}
