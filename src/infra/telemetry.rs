use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "satam_edge_fetch_total",
            Unit::Count,
            "Intercepted fetches by strategy and response source."
        );
        describe_counter!(
            "satam_edge_passthrough_total",
            Unit::Count,
            "Requests forwarded without worker interception."
        );
        describe_counter!(
            "satam_edge_cache_put_total",
            Unit::Count,
            "Responses written into a cache store."
        );
        describe_counter!(
            "satam_edge_cache_purged_total",
            Unit::Count,
            "Stale cache stores deleted at activation."
        );
        describe_histogram!(
            "satam_edge_install_ms",
            Unit::Milliseconds,
            "Critical asset precache latency in milliseconds."
        );
    });
}
