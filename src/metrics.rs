use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

use crate::config::ConfigSource;

/// Register metric descriptions. Safe to call multiple times; recording
/// works against whatever recorder the host process installed.
pub fn init_metric_descriptions() {
    describe_counter!(
        "pricing_calculations_total",
        "Total number of pricing calculations"
    );
    describe_histogram!(
        "pricing_calculation_duration_seconds",
        "Pricing calculation duration in seconds"
    );
    describe_counter!(
        "pricing_config_cache_lookups_total",
        "Config cache lookups by outcome"
    );
    describe_counter!(
        "pricing_config_fallback_total",
        "Calculations served from fallback configuration"
    );
    describe_counter!(
        "pricing_bundled_failures_total",
        "Bundled sub-calculations that degraded to zero"
    );
    describe_counter!(
        "pricing_sync_events_total",
        "Config change events applied by realtime sync"
    );
}

/// Record a completed calculation
pub fn record_calculation(service: &str, source: ConfigSource, duration: Duration) {
    let source = match source {
        ConfigSource::Live => "live",
        ConfigSource::Cached => "cached",
        ConfigSource::Fallback => "fallback",
    };
    counter!(
        "pricing_calculations_total",
        "service" => service.to_string(),
        "source" => source,
    )
    .increment(1);
    histogram!(
        "pricing_calculation_duration_seconds",
        "service" => service.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a cache lookup outcome ("hit", "miss", "force_reload")
pub fn record_cache_lookup(service: &str, outcome: &'static str) {
    counter!(
        "pricing_config_cache_lookups_total",
        "service" => service.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record a fallback-config resolution ("missing", "store_error")
pub fn record_config_fallback(service: &str, reason: &'static str) {
    counter!(
        "pricing_config_fallback_total",
        "service" => service.to_string(),
        "reason" => reason,
    )
    .increment(1);
}

/// Record a degraded bundled sub-calculation ("hours", "cost")
pub fn record_bundled_failure(stage: &'static str) {
    counter!("pricing_bundled_failures_total", "stage" => stage).increment(1);
}

/// Record an applied config change event
pub fn record_sync_event(service: &str) {
    counter!(
        "pricing_sync_events_total",
        "service" => service.to_string(),
    )
    .increment(1);
}
