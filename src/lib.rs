//! jsonlink - JSON-RPC 2.0 client with notification subscriptions
//!
//! Convenience crate re-exporting the jsonlink sub-crates:
//!
//! - **jsonlink-core**: envelopes, codec, error taxonomy, observability setup
//! - **jsonlink-client**: the client, its transports and the subscription facade
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jsonlink::{JsonRpcApi, JsonRpcClient, NotificationHandler, StaticEntrypoint};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = JsonRpcApi::new(JsonRpcClient::builder().build()?);
//!     api.connect(StaticEntrypoint::new("ws://localhost:8080/api")).await?;
//!
//!     api.subscribe(
//!         "workspace/subscribe",
//!         "workspace/statusChanged",
//!         NotificationHandler::new(|params| {
//!             println!("status: {}", params);
//!             Ok(())
//!         }),
//!         json!({"workspaceId": "ws-1"}),
//!     )?;
//!
//!     let info: serde_json::Value = api.request("workspace/get", json!({"id": "ws-1"})).await?;
//!     println!("{}", info);
//!     Ok(())
//! }
//! ```

pub use jsonlink_client as client;
pub use jsonlink_core as core;

pub use jsonlink_client::{
    ClientBuilder, ConnectionState, EntrypointProvider, JsonRpcApi, JsonRpcClient,
    NotificationHandler, StaticEntrypoint,
};
pub use jsonlink_core::{Error, Result};
