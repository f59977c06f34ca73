//! Client configuration
//!
//! Everything is optional. Without calls, `build` gives a WebSocket client
//! with no request timeout, no automatic reconnection and no metrics.
//!
//! ```rust,no_run
//! use jsonlink_client::{ClientBuilder, ExponentialBackoff, StaticEntrypoint};
//! use std::time::Duration;
//!
//! # async fn example() -> jsonlink_core::Result<()> {
//! let client = ClientBuilder::new()
//!     .request_timeout(Duration::from_secs(10))
//!     .with_reconnect(Box::new(ExponentialBackoff::default()))
//!     .with_default_observability()
//!     .service_name("workspace-dashboard")
//!     .build()?;
//!
//! client.connect(StaticEntrypoint::new("ws://localhost:8080/api")).await?;
//! # Ok(())
//! # }
//! ```

use crate::client::JsonRpcClient;
use crate::metrics::ClientMetrics;
use crate::reconnect::{ExponentialBackoff, ReconnectionStrategy};
use crate::transport::Transport;
use crate::websocket::WebSocketTransport;
use jsonlink_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`JsonRpcClient`]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    request_timeout: Option<Duration>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            request_timeout: None,
            reconnect_strategy: None,
            observability_config: None,
            service_name: None,
            metrics: None,
        }
    }

    /// Use `transport` instead of WebSocket
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Fail requests with `Error::Timeout` after `timeout`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Reconnect automatically after an unexpected loss
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Reconnect automatically with `ExponentialBackoff::default()`
    pub fn with_default_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(ExponentialBackoff::default()));
        self
    }

    /// Leave reconnection to the caller (default)
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect_strategy = None;
        self
    }

    /// Install tracing and OpenTelemetry on `build`, and record metrics
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Service name for observability; overrides the config's
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Record metrics on existing instruments without installing anything
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Create the client; it starts Disconnected
    ///
    /// # Errors
    ///
    /// `Error::Internal` when observability was requested and could not be
    /// installed (for example because a global subscriber already exists).
    pub fn build(self) -> Result<JsonRpcClient> {
        let metrics = match self.observability_config {
            Some(mut config) => {
                if let Some(name) = self.service_name {
                    config.service_name = name;
                }
                jsonlink_core::init_observability(config.clone()).map_err(|e| {
                    Error::Internal(format!("failed to initialize observability: {}", e))
                })?;
                Some(Arc::new(ClientMetrics::new(config.service_name)))
            }
            None => self.metrics,
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));

        tracing::debug!(
            request_timeout_ms = self.request_timeout.map(|t| t.as_millis() as u64),
            auto_reconnect = self.reconnect_strategy.is_some(),
            metrics = metrics.is_some(),
            "Client built"
        );

        Ok(JsonRpcClient::from_parts(
            transport,
            self.request_timeout,
            self.reconnect_strategy,
            metrics,
        ))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
