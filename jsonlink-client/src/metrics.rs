//! Client metrics
//!
//! OpenTelemetry instruments recorded by the client when the builder was
//! given an observability config (or an explicit `ClientMetrics`). Without a
//! global meter provider they are no-ops.
//!
//! | Instrument | Kind | Attributes |
//! |---|---|---|
//! | `jsonlink.client.connection.state` | gauge (0/1/2) | |
//! | `jsonlink.client.requests.total` | counter | method, status |
//! | `jsonlink.client.request.duration` | histogram (s) | method, status |
//! | `jsonlink.client.errors.total` | counter | error_type |
//! | `jsonlink.client.notifications.received` | counter | method |
//! | `jsonlink.client.handler.failures` | counter | method |
//! | `jsonlink.client.reconnection.attempts` | counter | |
//! | `jsonlink.client.reconnection.success` | counter | |

use crate::connection_state::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    InstrumentationScope, KeyValue,
};

/// Instruments for one client
pub struct ClientMetrics {
    pub connection_state: Gauge<i64>,
    pub requests_total: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub notifications_received: Counter<u64>,
    pub handler_failures: Counter<u64>,
    pub reconnection_attempts: Counter<u64>,
    pub reconnection_success: Counter<u64>,
}

impl ClientMetrics {
    /// Instruments on the global meter provider, scoped to `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        let scope = InstrumentationScope::builder(service_name.into())
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        Self::new_with_meter(&global::meter_with_scope(scope))
    }

    /// Instruments on a caller-provided meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("jsonlink.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected)")
                .build(),
            requests_total: meter
                .u64_counter("jsonlink.client.requests.total")
                .with_description("Requests settled, by method and outcome")
                .build(),
            request_duration: meter
                .f64_histogram("jsonlink.client.request.duration")
                .with_description("Time from send to settlement")
                .with_unit("s")
                .build(),
            errors_total: meter
                .u64_counter("jsonlink.client.errors.total")
                .with_description("Errors by kind")
                .build(),
            notifications_received: meter
                .u64_counter("jsonlink.client.notifications.received")
                .with_description("Notifications received from the server")
                .build(),
            handler_failures: meter
                .u64_counter("jsonlink.client.handler.failures")
                .with_description("Notification handlers that failed or panicked")
                .build(),
            reconnection_attempts: meter
                .u64_counter("jsonlink.client.reconnection.attempts")
                .with_description("Automatic reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("jsonlink.client.reconnection.success")
                .with_description("Automatic reconnections that succeeded")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.as_gauge(), &[]);
    }

    /// Record a settled request; `status` is "success" or an error kind
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }

    pub fn record_notification(&self, method: &str) {
        self.notifications_received
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    pub fn record_handler_failures(&self, method: &str, failed: usize) {
        self.handler_failures
            .add(failed as u64, &[KeyValue::new("method", method.to_string())]);
    }

    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }
}
