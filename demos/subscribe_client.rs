//! WebSocket subscription client
//!
//! Connects to a JSON-RPC server, subscribes to an event feed and prints
//! every notification until Ctrl-C. The entrypoint is resolved from
//! `JSONLINK_URL` on every (re)connect.
//!
//! Run with: JSONLINK_URL=ws://127.0.0.1:8080 cargo run --example subscribe_client

use jsonlink::core::ObservabilityConfig;
use jsonlink::{ClientBuilder, Error, JsonRpcApi, NotificationHandler};
use serde_json::json;

async fn resolve_entrypoint() -> jsonlink::Result<String> {
    std::env::var("JSONLINK_URL")
        .map_err(|_| Error::ConnectFailed("JSONLINK_URL is not set".to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let observability = ObservabilityConfig::new("jsonlink-subscribe-demo")
        .with_traces(std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok())
        .with_metrics(false);

    let client = ClientBuilder::new()
        .request_timeout(std::time::Duration::from_secs(10))
        .with_default_reconnect()
        .with_observability(observability)
        .build()?;
    let api = JsonRpcApi::new(client);

    api.connect(|| resolve_entrypoint()).await?;
    tracing::info!("Connected");

    let on_event = NotificationHandler::new(|params| {
        println!("event: {}", params);
        Ok(())
    });
    api.subscribe("events/subscribe", "events/published", on_event.clone(), json!({"topic": "*"}))?;

    tokio::signal::ctrl_c().await?;

    api.unsubscribe("events/unsubscribe", "events/published", &on_event)?;
    api.client().disconnect();
    jsonlink::core::shutdown_observability();
    Ok(())
}
