//! In-process transport
//!
//! `MemoryTransport` connects the client to a [`MemoryPeer`] living in the
//! same process. The peer plays the server: it reads what the client sent and
//! pushes responses, notifications, closes and failures back. Used by the
//! test suite and the in-memory demo, and handy for applications that want a
//! loopback server without sockets.
//!
//! ```rust
//! use jsonlink_client::{JsonRpcClient, MemoryTransport, StaticEntrypoint};
//! use serde_json::{json, Value};
//!
//! # #[tokio::main]
//! # async fn main() -> jsonlink_core::Result<()> {
//! let transport = MemoryTransport::new();
//! let client = JsonRpcClient::new(transport.clone());
//!
//! client.connect(StaticEntrypoint::new("memory://server")).await?;
//! let mut peer = transport.accept().await.expect("peer");
//!
//! let server = tokio::spawn(async move {
//!     let request = peer.recv_request().await.expect("request");
//!     peer.respond(request.id, json!("pong"));
//!     peer
//! });
//!
//! let reply: Value = client.request("ping", ()).await?;
//! assert_eq!(reply, json!("pong"));
//! # let _ = server.await;
//! # Ok(())
//! # }
//! ```

use crate::transport::{Transport, TransportConnection, TransportEvent};
use async_trait::async_trait;
use jsonlink_core::{
    codec, Error, Id, JsonRpcErrorData, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    Result,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Transport whose connections end in a [`MemoryPeer`]
///
/// Clones share the same accept queue, so a test can keep one clone and hand
/// the other to the client.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

struct Shared {
    incoming_tx: mpsc::UnboundedSender<MemoryPeer>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
    opened_urls: Mutex<Vec<String>>,
    refusing: AtomicBool,
}

impl MemoryTransport {
    /// Create a transport with an empty accept queue
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                incoming_tx,
                incoming_rx: tokio::sync::Mutex::new(incoming_rx),
                opened_urls: Mutex::new(Vec::new()),
                refusing: AtomicBool::new(false),
            }),
        }
    }

    /// Wait for the next connection opened by a client
    pub async fn accept(&self) -> Option<MemoryPeer> {
        self.shared.incoming_rx.lock().await.recv().await
    }

    /// Number of `open` calls seen, refused ones included
    pub fn open_count(&self) -> usize {
        crate::lock(&self.shared.opened_urls).len()
    }

    /// URLs passed to `open`, oldest first
    pub fn opened_urls(&self) -> Vec<String> {
        crate::lock(&self.shared.opened_urls).clone()
    }

    /// Make subsequent `open` calls fail (or succeed again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.refusing.store(refuse, Ordering::SeqCst);
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, url: &str) -> Result<TransportConnection> {
        crate::lock(&self.shared.opened_urls).push(url.to_string());

        if self.shared.refusing.load(Ordering::SeqCst) {
            return Err(Error::ConnectFailed(format!("connection to {} refused", url)));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            url: url.to_string(),
            from_client: outbound_rx,
            to_client: events_tx,
        };
        self.shared
            .incoming_tx
            .send(peer)
            .map_err(|_| Error::ConnectFailed("memory transport shut down".to_string()))?;

        Ok(TransportConnection::new(outbound_tx, events_rx))
    }
}

/// Server side of an in-memory connection
///
/// Dropping the peer looks like the server going away without a close frame.
pub struct MemoryPeer {
    url: String,
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryPeer {
    /// URL the client opened
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next raw message from the client; `None` once the client let go
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next message if one is already queued
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Next message parsed as JSON
    pub async fn recv_json(&mut self) -> Option<Value> {
        let text = self.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Next message parsed as a request
    pub async fn recv_request(&mut self) -> Option<JsonRpcRequest> {
        serde_json::from_value(self.recv_json().await?).ok()
    }

    /// Next message parsed as a notification
    pub async fn recv_notification(&mut self) -> Option<JsonRpcNotification> {
        serde_json::from_value(self.recv_json().await?).ok()
    }

    /// Push raw text to the client; false if the client is gone
    pub fn send_raw(&self, text: impl Into<String>) -> bool {
        self.to_client
            .send(TransportEvent::Message(text.into()))
            .is_ok()
    }

    /// Answer request `id` with a result
    pub fn respond(&self, id: Id, result: Value) -> bool {
        self.send_encoded(&JsonRpcResponse::success(result, id))
    }

    /// Answer request `id` with an error object
    pub fn respond_error(&self, id: Id, error: JsonRpcErrorData) -> bool {
        self.send_encoded(&JsonRpcResponse::error(error, id))
    }

    /// Push a notification
    pub fn notify(&self, method: &str, params: Value) -> bool {
        let params = match params {
            Value::Null => None,
            other => Some(other),
        };
        self.send_encoded(&JsonRpcNotification::new(method, params))
    }

    /// Close the connection from the server side
    pub fn close(self, reason: Option<&str>) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed(reason.map(str::to_string)));
    }

    /// Fail the connection with a transport error
    pub fn fail(self, reason: &str) {
        let _ = self.to_client.send(TransportEvent::Error(reason.to_string()));
    }

    fn send_encoded<T: serde::Serialize>(&self, message: &T) -> bool {
        match codec::encode(message) {
            Ok(text) => self.send_raw(text),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_hands_peer_to_accept() {
        let transport = MemoryTransport::new();
        let connection = transport.open("memory://a").await.unwrap();
        let (outbound, mut events) = connection.into_parts();

        let mut peer = transport.accept().await.unwrap();
        assert_eq!(peer.url(), "memory://a");

        outbound.send("hello".to_string()).unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("hello"));

        assert!(peer.notify("tick", json!([1])));
        match events.recv().await {
            Some(TransportEvent::Message(text)) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["method"], "tick");
            }
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_open_is_counted() {
        let transport = MemoryTransport::new();
        transport.refuse_connections(true);

        let result = transport.open("memory://down").await;
        assert!(matches!(result, Err(Error::ConnectFailed(_))));
        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.opened_urls(), vec!["memory://down".to_string()]);
    }

    #[tokio::test]
    async fn test_peer_close_and_drop() {
        let transport = MemoryTransport::new();
        let (_outbound, mut events) = transport.open("memory://a").await.unwrap().into_parts();
        let peer = transport.accept().await.unwrap();

        peer.close(Some("bye"));
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Closed(Some("bye".to_string())))
        );
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_none_after_client_drops() {
        let transport = MemoryTransport::new();
        let (outbound, _events) = transport.open("memory://a").await.unwrap().into_parts();
        let mut peer = transport.accept().await.unwrap();

        drop(outbound);
        assert!(peer.recv().await.is_none());
    }
}
