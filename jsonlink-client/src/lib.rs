//! JSON-RPC 2.0 client with notification subscriptions
//!
//! # Core Features
//!
//! - **Request-Response**: numeric ids, out-of-order responses matched by id,
//!   typed params and results through serde
//! - **Notifications**: a registry of handlers per method name, dispatched in
//!   registration order with per-handler failure isolation
//! - **Connection lifecycle**: lazily resolved entrypoint, shared connect
//!   attempts, pending requests rejected on loss
//! - **Transports**: WebSocket (tokio-tungstenite) and in-memory
//! - **Auto-Reconnection**: optional, with exponential backoff or fixed delays
//! - **Observability**: tracing spans/events and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jsonlink_client::{JsonRpcClient, NotificationHandler, StaticEntrypoint, WebSocketTransport};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JsonRpcClient::new(WebSocketTransport::new());
//!
//!     client.add_notification_handler(
//!         "workspace/statusChanged",
//!         NotificationHandler::new(|params| {
//!             println!("status: {}", params);
//!             Ok(())
//!         }),
//!     );
//!
//!     client.connect(StaticEntrypoint::new("ws://localhost:8080/api")).await?;
//!
//!     let workspaces: Value = client.request("workspace/list", json!({"limit": 10})).await?;
//!     println!("{}", workspaces);
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod client_builder;
mod connection_state;
mod entrypoint;
mod memory;
mod metrics;
mod notification;
mod reconnect;
mod request;
mod transport;
mod websocket;

pub use api::JsonRpcApi;
pub use client::JsonRpcClient;
pub use client_builder::ClientBuilder;
pub use connection_state::ConnectionState;
pub use entrypoint::{EntrypointProvider, StaticEntrypoint};
pub use memory::{MemoryPeer, MemoryTransport};
pub use metrics::ClientMetrics;
pub use notification::{DispatchOutcome, NotificationHandler, NotificationRegistry};
pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy};
pub use transport::{Transport, TransportConnection, TransportEvent};
pub use websocket::WebSocketTransport;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, ignoring poisoning
///
/// Handlers run outside every lock, so a poisoned guard can only come from
/// a panic inside this crate's own short critical sections.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
