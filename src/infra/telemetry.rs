use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    cache::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS},
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

pub const METRIC_GATE_REDIRECT: &str = "asksniff_gate_redirect_total";

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
            METRIC_CACHE_HIT,
            Unit::Count,
            "Content cache lookups answered from a live entry."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Content cache lookups that had to query the store."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Content cache entries pushed out by the entry limit."
        );
        describe_counter!(
            METRIC_GATE_REDIRECT,
            Unit::Count,
            "Requests redirected by the disclaimer, age, login or editor gates."
        );
    });
}
