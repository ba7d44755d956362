//! Prometheus metrics exposed on `/metrics`.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder and register the metric descriptions.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metric_descriptions();
    Ok(handle)
}

fn register_metric_descriptions() {
    describe_gauge!(
        "smarthome_dashboard_uptime_seconds",
        "Time in seconds since the dashboard session started"
    );
    describe_gauge!(
        "smarthome_devices_total",
        "Number of registered devices by kind"
    );

    describe_counter!(
        "smarthome_sync_ticks_total",
        "Total number of reconciliation ticks started"
    );
    describe_counter!(
        "smarthome_device_updates_total",
        "Total number of successful remote reads merged into the registry"
    );
    describe_counter!(
        "smarthome_device_update_errors_total",
        "Total number of remote reads that failed during a tick"
    );

    describe_counter!(
        "smarthome_remote_write_errors_total",
        "Total number of control commands rejected or lost"
    );
    describe_counter!(
        "smarthome_deferred_colors_total",
        "Total number of colors stored for a lamp that was off"
    );
    describe_counter!(
        "smarthome_deferred_colors_applied_total",
        "Total number of stored colors written on power-on"
    );
}

pub struct Metrics;

impl Metrics {
    pub fn set_uptime(start_time: Instant) {
        gauge!("smarthome_dashboard_uptime_seconds").set(start_time.elapsed().as_secs_f64());
    }

    pub fn set_device_count(kind: &str, count: usize) {
        gauge!("smarthome_devices_total", "kind" => kind.to_string()).set(count as f64);
    }

    pub fn inc_ticks() {
        counter!("smarthome_sync_ticks_total").increment(1);
    }

    pub fn inc_device_updates(kind: &str) {
        counter!("smarthome_device_updates_total", "kind" => kind.to_string()).increment(1);
    }

    pub fn inc_device_update_errors(kind: &str) {
        counter!("smarthome_device_update_errors_total", "kind" => kind.to_string())
            .increment(1);
    }

    pub fn inc_write_errors(kind: &str) {
        counter!("smarthome_remote_write_errors_total", "kind" => kind.to_string()).increment(1);
    }

    pub fn inc_deferred_colors() {
        counter!("smarthome_deferred_colors_total").increment(1);
    }

    pub fn inc_deferred_colors_applied() {
        counter!("smarthome_deferred_colors_applied_total").increment(1);
    }
}
