//! JSON-RPC client
//!
//! `JsonRpcClient` owns one logical connection and three pieces of state:
//!
//! - the pending request table, keyed by request id
//! - the notification handler registry, keyed by method name
//! - the connection slot (state, live connection, in-flight connect attempt)
//!
//! # Lifecycle
//!
//! 1. **Connect**: `connect(provider)` resolves the entrypoint and opens the
//!    transport. Concurrent callers share one attempt.
//! 2. **Use**: `request`, `notify` and handler registration. Handlers may be
//!    registered before connecting; the registry survives reconnects.
//! 3. **Loss**: a close or error from the transport rejects every pending
//!    request with `ConnectionLost` and returns to Disconnected. With a
//!    reconnection strategy the client then retries on its own.
//! 4. **Disconnect**: `disconnect()` tears the connection down deliberately.
//!
//! # Cloning
//!
//! Clones share everything. The receive task holds a clone while the
//! connection is open, so call `disconnect` to release a connected client.

use crate::client_builder::ClientBuilder;
use crate::connection_state::{ActiveConnection, ConnectionManager, ConnectionState, SharedConnect};
use crate::entrypoint::EntrypointProvider;
use crate::metrics::ClientMetrics;
use crate::notification::{NotificationHandler, NotificationRegistry};
use crate::reconnect::ReconnectionStrategy;
use crate::request::RequestManager;
use crate::transport::{Transport, TransportEvent};
use futures::FutureExt;
use jsonlink_core::{
    codec, Error, Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, Result,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

/// JSON-RPC 2.0 client over a pluggable transport
#[derive(Clone)]
pub struct JsonRpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    requests: RequestManager,
    notifications: NotificationRegistry,
    connection: ConnectionManager,
    request_timeout: Option<Duration>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl JsonRpcClient {
    /// Client with default settings: no timeout, no automatic reconnection
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_parts(Arc::new(transport), None, None, None)
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        request_timeout: Option<Duration>,
        strategy: Option<Box<dyn ReconnectionStrategy>>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                requests: RequestManager::new(),
                notifications: NotificationRegistry::new(),
                connection: ConnectionManager::new(strategy),
                request_timeout,
                metrics,
            }),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }

    /// Number of requests waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.requests.pending_count()
    }

    /// The notification handler registry
    pub fn notifications(&self) -> &NotificationRegistry {
        &self.inner.notifications
    }

    /// Connect using `provider` to resolve the URL
    ///
    /// Returns the in-flight attempt when already Connecting, and resolves
    /// immediately when already Connected; `provider` is ignored then.
    ///
    /// # Errors
    ///
    /// `Error::ConnectFailed` when resolving the entrypoint or opening the
    /// transport fails, or when `disconnect` cancelled the attempt.
    #[tracing::instrument(skip(self, provider))]
    pub async fn connect<P>(&self, provider: P) -> Result<()>
    where
        P: EntrypointProvider + 'static,
    {
        self.connect_with(Arc::new(provider)).await
    }

    /// [`connect`](Self::connect) with a shared provider
    pub async fn connect_with(&self, provider: Arc<dyn EntrypointProvider>) -> Result<()> {
        let attempt = self
            .inner
            .connection
            .begin_connect(provider, |epoch, provider| self.spawn_open(epoch, provider));
        attempt.await
    }

    /// Close the current connection (if any) and connect again
    #[tracing::instrument(skip(self, provider))]
    pub async fn reconnect<P>(&self, provider: P) -> Result<()>
    where
        P: EntrypointProvider + 'static,
    {
        let requests = &self.inner.requests;
        let attempt = self.inner.connection.restart(
            Arc::new(provider),
            || {
                let failed = requests.fail_all(Error::ConnectionLost);
                if failed > 0 {
                    tracing::info!(failed_requests = failed, "Pending requests rejected by reconnect");
                }
            },
            |epoch, provider| self.spawn_open(epoch, provider),
        );
        attempt.await
    }

    /// Close the connection and reject pending requests
    ///
    /// Also stops automatic reconnection. Does nothing when already
    /// Disconnected.
    pub fn disconnect(&self) {
        let requests = &self.inner.requests;
        let closed = self
            .inner
            .connection
            .close(|| requests.fail_all(Error::ConnectionLost));

        if let Some(failed) = closed {
            tracing::info!(failed_requests = failed, "Disconnected");
            self.record_state(ConnectionState::Disconnected);
        }
    }

    fn spawn_open(&self, epoch: u64, provider: Arc<dyn EntrypointProvider>) -> SharedConnect {
        self.record_state(ConnectionState::Connecting);
        let task = tokio::spawn(self.clone().open(epoch, provider));
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::ConnectFailed(format!("connect task failed: {}", e))),
            }
        }
        .boxed()
        .shared()
    }

    async fn open(self, epoch: u64, provider: Arc<dyn EntrypointProvider>) -> Result<()> {
        let url = match provider.entrypoint().await {
            Ok(url) => url,
            Err(e) => return self.abandon_connect(epoch, format!("entrypoint resolution failed: {}", e)),
        };

        tracing::info!(url = %url, "Opening transport");
        let connection = match self.inner.transport.open(&url).await {
            Ok(connection) => connection,
            Err(Error::ConnectFailed(reason)) => return self.abandon_connect(epoch, reason),
            Err(e) => return self.abandon_connect(epoch, e.to_string()),
        };

        let (outbound, events) = connection.into_parts();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        if !self
            .inner
            .connection
            .connected(epoch, ActiveConnection::new(outbound, shutdown_tx))
        {
            tracing::debug!(url = %url, "Connect attempt superseded");
            return Err(Error::ConnectFailed("connect attempt was cancelled".to_string()));
        }

        tracing::info!(url = %url, "Connected");
        self.record_state(ConnectionState::Connected);
        tokio::spawn(self.clone().receive_loop(epoch, events, shutdown_rx));
        Ok(())
    }

    fn abandon_connect(&self, epoch: u64, reason: String) -> Result<()> {
        tracing::warn!(reason = %reason, "Connect failed");
        if self.inner.connection.connect_failed(epoch) {
            self.record_state(ConnectionState::Disconnected);
        }
        self.record_error("connect_failed");
        Err(Error::ConnectFailed(reason))
    }

    async fn receive_loop(
        self,
        epoch: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("Receive loop stopped");
                    return;
                }
                event = events.recv() => match event {
                    Some(TransportEvent::Message(text)) => self.handle_message(&text),
                    Some(TransportEvent::Closed(reason)) => {
                        break reason.unwrap_or_else(|| "closed by peer".to_string());
                    }
                    Some(TransportEvent::Error(e)) => {
                        self.record_error("transport");
                        break format!("transport error: {}", e);
                    }
                    None => break "transport went away".to_string(),
                }
            }
        };

        self.connection_lost(epoch, &reason);
    }

    fn connection_lost(&self, epoch: u64, reason: &str) {
        let requests = &self.inner.requests;
        let Some(failed) = self.inner.connection.lost(
            epoch,
            || requests.fail_all(Error::ConnectionLost),
            |provider| tokio::spawn(self.clone().reconnect_loop(provider)),
        ) else {
            return;
        };

        tracing::warn!(reason = %reason, failed_requests = failed, "Connection lost");
        self.record_state(ConnectionState::Disconnected);
        self.record_error("connection_lost");
    }

    async fn reconnect_loop(self, provider: Arc<dyn EntrypointProvider>) {
        let mut attempt = 0;
        loop {
            if self.state() != ConnectionState::Disconnected {
                return;
            }

            let Some(delay) = self.inner.connection.next_reconnect_delay(attempt) else {
                tracing::error!(attempts = attempt, "Reconnection abandoned");
                return;
            };

            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::time::sleep(delay).await;

            if let Some(metrics) = &self.inner.metrics {
                metrics.record_reconnection_attempt();
            }

            match self.connect_with(provider.clone()).await {
                Ok(()) => {
                    tracing::info!(attempt, "Reconnected");
                    self.inner.connection.reset_strategy();
                    if let Some(metrics) = &self.inner.metrics {
                        metrics.record_reconnection_success();
                    }
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Reconnection attempt failed");
                    attempt += 1;
                }
            }
        }
    }

    /// Send a request and wait for its result
    ///
    /// `params` that serialize to `null` (such as `()`) are left out of the
    /// envelope. The result is deserialized into `R`; use
    /// `serde_json::Value` to take it as is.
    ///
    /// # Errors
    ///
    /// - `TransportUnavailable` when not Connected
    /// - `Rpc` when the server answered with an error object
    /// - `ConnectionLost` when the connection dropped first
    /// - `Timeout` when a request timeout is configured and elapsed
    /// - `Serialization` when params or result do not convert
    #[tracing::instrument(skip(self, method, params), fields(method = %method))]
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let params = codec::encode_params(params)?;
        let requests = &self.inner.requests;

        let (id, rx) = self.inner.connection.with_outbound(|outbound| {
            let id = requests.next_id();
            let text = codec::encode_request(&JsonRpcRequest::new(method, params, id.clone()))?;
            let rx = requests.register(id.clone(), method)?;
            if outbound.send(text).is_err() {
                // transport already gone; its close event is on the way
                requests.fail(&id, Error::ConnectionLost);
            }
            Ok((id, rx))
        })?;

        tracing::debug!(id = %id, "Request sent");

        let outcome = match self.inner.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    requests.fail(&id, Error::Timeout);
                    Ok(Err(Error::Timeout))
                }
            },
            None => rx.await,
        };

        let result = outcome
            .unwrap_or(Err(Error::ConnectionLost))
            .and_then(|value| {
                serde_json::from_value::<R>(value).map_err(|e| Error::Serialization(e.to_string()))
            });

        let status = match &result {
            Ok(_) => "success",
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Request failed");
                e.kind()
            }
        };
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_request(method, status, started.elapsed().as_secs_f64());
        }

        result
    }

    /// Send a notification
    ///
    /// Fire and forget: when not Connected the notification is logged and
    /// dropped. Only serialization failures are returned.
    pub fn notify<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        let notification = JsonRpcNotification::new(method, codec::encode_params(params)?);
        let text = codec::encode_notification(&notification)?;

        let sent = self.inner.connection.with_outbound(|outbound| {
            // A dead peer shows up as a transport event.
            let _ = outbound.send(text);
            Ok(())
        });

        match sent {
            Ok(()) => tracing::debug!(method, "Notification sent"),
            Err(_) => tracing::warn!(method, "Notification dropped: not connected"),
        }
        Ok(())
    }

    /// Register `handler` for notifications named `name`
    ///
    /// Returns false if this handler was already registered under `name`.
    pub fn add_notification_handler(&self, name: &str, handler: NotificationHandler) -> bool {
        self.inner.notifications.add(name, handler)
    }

    /// Remove one handler from `name`
    pub fn remove_notification_handler(&self, name: &str, handler: &NotificationHandler) -> bool {
        self.inner.notifications.remove(name, handler)
    }

    /// Remove every handler from `name`
    pub fn remove_all_notification_handlers(&self, name: &str) -> usize {
        self.inner.notifications.remove_all(name)
    }

    fn handle_message(&self, text: &str) {
        match codec::decode(text) {
            Ok(message) => self.dispatch(message, true),
            Err(e) => {
                let id = serde_json::from_str(text)
                    .ok()
                    .and_then(|raw: serde_json::Value| codec::response_id(&raw));
                self.drop_malformed(id, e);
            }
        }
    }

    /// Log a payload that failed to decode and settle the request it answers
    fn drop_malformed(&self, id: Option<Id>, error: Error) {
        self.record_error(error.kind());
        if let Some(id) = id {
            if self.inner.requests.fail(&id, error.clone()) {
                tracing::warn!(id = %id, error = %error, "Malformed response rejected its request");
                return;
            }
        }
        tracing::warn!(error = %error, "Dropping inbound payload");
    }

    fn dispatch(&self, message: JsonRpcMessage, top_level: bool) {
        match message {
            JsonRpcMessage::Response(response) => {
                let id = response.id.clone();
                if !self.inner.requests.complete(response) {
                    tracing::warn!(id = %id, "Dropping response for unknown request id");
                }
            }
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Notification received");
                let outcome = self.inner.notifications.dispatch(&notification);
                if let Some(metrics) = &self.inner.metrics {
                    metrics.record_notification(&notification.method);
                    if outcome.failed > 0 {
                        metrics.record_handler_failures(&notification.method, outcome.failed);
                    }
                }
            }
            JsonRpcMessage::Request(request) => {
                tracing::warn!(method = %request.method, id = %request.id, "Ignoring request from server");
            }
            JsonRpcMessage::Batch(items) if top_level => {
                tracing::debug!(batch_size = items.len(), "Batch received");
                for item in items {
                    let id = codec::response_id(&item);
                    match codec::decode_value(item) {
                        Ok(message) => self.dispatch(message, false),
                        Err(e) => self.drop_malformed(id, e),
                    }
                }
            }
            JsonRpcMessage::Batch(_) => {
                tracing::warn!("Dropping nested batch");
                self.record_error("malformed_message");
            }
        }
    }

    fn record_state(&self, state: ConnectionState) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.update_connection_state(state);
        }
    }

    fn record_error(&self, kind: &str) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_error(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entrypoint::StaticEntrypoint;
    use crate::memory::{MemoryPeer, MemoryTransport};
    use crate::reconnect::FixedDelay;
    use jsonlink_core::{Id, JsonRpcErrorData};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    async fn connected_pair() -> (JsonRpcClient, MemoryTransport, MemoryPeer) {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::new(transport.clone());
        client.connect(StaticEntrypoint::new("memory://test")).await.unwrap();
        let peer = transport.accept().await.unwrap();
        (client, transport, peer)
    }

    async fn wait_for_state(client: &JsonRpcClient, state: ConnectionState) {
        let mut rx = client.state_changes();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == state))
            .await
            .expect("state change timed out")
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_resolves_with_result() {
        let (client, _transport, mut peer) = connected_pair().await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, Value>("sum", json!([1, 2])).await }
        });

        let request = peer.recv_request().await.unwrap();
        assert_eq!(request.id, Id::Number(1));
        assert_eq!(request.method, "sum");
        assert_eq!(request.params, Some(json!([1, 2])));
        peer.respond(request.id, json!(3));

        assert_eq!(call.await.unwrap().unwrap(), json!(3));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_null_params_are_omitted() {
        let (client, _transport, mut peer) = connected_pair().await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, Value>("ping", ()).await }
        });

        let raw = peer.recv_json().await.unwrap();
        assert!(raw.get("params").is_none());
        peer.respond(Id::Number(1), Value::Null);

        assert_eq!(call.await.unwrap().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced_verbatim() {
        let (client, _transport, mut peer) = connected_pair().await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, Value>("workspace/get", json!({"id": "x"})).await }
        });

        let request = peer.recv_request().await.unwrap();
        let error = JsonRpcErrorData::with_data(-32000, "missing", json!({"id": "x"}));
        peer.respond_error(request.id, error.clone());

        match call.await.unwrap() {
            Err(Error::Rpc(data)) => assert_eq!(data, error),
            other => panic!("Expected RPC error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_while_disconnected() {
        let client = JsonRpcClient::new(MemoryTransport::new());

        let result = client.request::<_, Value>("ping", ()).await;
        assert!(matches!(result, Err(Error::TransportUnavailable)));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_result_deserialization_failure() {
        let (client, _transport, mut peer) = connected_pair().await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, u32>("name", ()).await }
        });

        let request = peer.recv_request().await.unwrap();
        peer.respond(request.id, json!("not a number"));

        assert!(matches!(call.await.unwrap(), Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn test_request_timeout_clears_pending_entry() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::builder()
            .transport(transport.clone())
            .request_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        client.connect(StaticEntrypoint::new("memory://slow")).await.unwrap();
        let mut peer = transport.accept().await.unwrap();

        let result = client.request::<_, Value>("slow", ()).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(client.pending_requests(), 0);

        // a late answer is dropped
        let request = peer.recv_request().await.unwrap();
        peer.respond(request.id, json!(1));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_peer_close_rejects_pending_and_keeps_handlers() {
        let (client, _transport, mut peer) = connected_pair().await;
        client.add_notification_handler("evt", NotificationHandler::new(|_| Ok(())));

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, Value>("hang", ()).await }
        });
        peer.recv_request().await.unwrap();

        peer.close(Some("going away"));

        assert!(matches!(call.await.unwrap(), Err(Error::ConnectionLost)));
        wait_for_state(&client, ConnectionState::Disconnected).await;
        assert_eq!(client.notifications().handler_count("evt"), 1);
    }

    #[tokio::test]
    async fn test_transport_error_counts_as_loss() {
        let (client, _transport, peer) = connected_pair().await;

        peer.fail("reset by peer");

        wait_for_state(&client, ConnectionState::Disconnected).await;
        let result = client.request::<_, Value>("ping", ()).await;
        assert!(matches!(result, Err(Error::TransportUnavailable)));
    }

    #[tokio::test]
    async fn test_disconnect_rejects_pending() {
        let (client, _transport, mut peer) = connected_pair().await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.request::<_, Value>("hang", ()).await }
        });
        peer.recv_request().await.unwrap();

        client.disconnect();

        assert!(matches!(call.await.unwrap(), Err(Error::ConnectionLost)));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        // the transport sees the client let go
        assert!(peer.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_when_connected_does_not_reopen() {
        let (client, transport, _peer) = connected_pair().await;

        client.connect(StaticEntrypoint::new("memory://other")).await.unwrap();
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn test_entrypoint_failure() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::new(transport.clone());

        let result = client
            .connect(|| async { Err::<String, _>(Error::Internal("no discovery".into())) })
            .await;

        assert!(matches!(result, Err(Error::ConnectFailed(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_open_failure_then_retry() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::new(transport.clone());

        transport.refuse_connections(true);
        let result = client.connect(StaticEntrypoint::new("memory://x")).await;
        match result {
            Err(Error::ConnectFailed(reason)) => assert!(reason.contains("refused")),
            other => panic!("Expected ConnectFailed, got {:?}", other),
        }
        assert_eq!(client.state(), ConnectionState::Disconnected);

        transport.refuse_connections(false);
        client.connect(StaticEntrypoint::new("memory://x")).await.unwrap();
        assert!(client.is_connected());
        assert_eq!(transport.open_count(), 2);
    }

    #[tokio::test]
    async fn test_reconnect_resolves_entrypoint_again() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::new(transport.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let provider = {
            let calls = calls.clone();
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, Error>(format!("memory://node-{}", n)) }
            }
        };

        client.connect(provider.clone()).await.unwrap();
        client.reconnect(provider).await.unwrap();

        assert!(client.is_connected());
        assert_eq!(
            transport.opened_urls(),
            vec!["memory://node-0".to_string(), "memory://node-1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stale_connection_close_is_ignored() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::new(transport.clone());

        client.connect(StaticEntrypoint::new("memory://a")).await.unwrap();
        let old_peer = transport.accept().await.unwrap();

        client.reconnect(StaticEntrypoint::new("memory://b")).await.unwrap();
        let _new_peer = transport.accept().await.unwrap();

        old_peer.close(None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_notifications_and_malformed_payloads() {
        let (client, _transport, peer) = connected_pair().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.add_notification_handler(
            "tick",
            NotificationHandler::new(move |params| {
                sink.lock().unwrap().push(params.clone());
                Ok(())
            }),
        );

        peer.send_raw("{not json");
        peer.send_raw(r#"{"jsonrpc":"2.0","id":99,"result":1}"#);
        peer.send_raw(r#"{"jsonrpc":"2.0","id":5,"method":"server/ask"}"#);
        peer.send_raw(r#"[{"jsonrpc":"2.0","method":"tick","params":[1]},{"bad":true},[]]"#);
        peer.notify("tick", json!([2]));

        tokio::time::timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!([1]), json!([2])]);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_malformed_response_rejects_its_request() {
        let (client, _transport, mut peer) = connected_pair().await;

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.request::<_, Value>("workspace/get", ()).await })
            })
            .collect();
        for _ in 0..3 {
            peer.recv_request().await.unwrap();
        }

        // error object without a message
        peer.send_raw(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000}}"#);
        // wrong protocol version
        peer.send_raw(r#"{"jsonrpc":"1.0","id":2,"result":"ok"}"#);
        // broken item inside a batch
        peer.send_raw(r#"[{"jsonrpc":"2.0","id":3,"error":{"code":99999999999,"message":"x"}}]"#);

        for call in calls {
            let outcome = tokio::time::timeout(Duration::from_secs(2), call)
                .await
                .expect("request left hanging")
                .unwrap();
            assert!(matches!(outcome, Err(Error::MalformedMessage(_))), "{:?}", outcome);
        }
        assert_eq!(client.pending_requests(), 0);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_notification_with_wrong_version_is_dropped() {
        let (client, _transport, peer) = connected_pair().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        client.add_notification_handler(
            "tick",
            NotificationHandler::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        peer.send_raw(r#"{"jsonrpc":"1.0","method":"tick","params":[0]}"#);
        peer.send_raw(r#"{"method":"tick","params":[0]}"#);
        peer.notify("tick", json!([1]));

        tokio::time::timeout(Duration::from_secs(2), async {
            while seen.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notify_sends_and_drops_when_disconnected() {
        let (client, _transport, mut peer) = connected_pair().await;

        client.notify("status/watch", json!({"id": "ws"})).unwrap();
        let notification = peer.recv_notification().await.unwrap();
        assert_eq!(notification.method, "status/watch");
        assert_eq!(notification.params, Some(json!({"id": "ws"})));

        client.disconnect();
        assert!(client.notify("status/watch", ()).is_ok());
    }

    #[tokio::test]
    async fn test_auto_reconnect_after_loss() {
        let transport = MemoryTransport::new();
        let client = JsonRpcClient::builder()
            .transport(transport.clone())
            .with_reconnect(Box::new(FixedDelay::new(Duration::from_millis(10)).with_max_attempts(5)))
            .build()
            .unwrap();

        client.connect(StaticEntrypoint::new("memory://auto")).await.unwrap();
        let peer = transport.accept().await.unwrap();
        peer.fail("network down");

        let second = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.url(), "memory://auto");
        wait_for_state(&client, ConnectionState::Connected).await;
    }
}
