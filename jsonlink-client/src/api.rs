//! Subscription facade
//!
//! Servers following the subscribe/notify convention expose an *event*
//! method the client notifies to start or stop a feed, and push the feed as
//! notifications under a separate *notification* name. `JsonRpcApi` pairs the
//! two: subscribing registers the handler locally and then notifies the
//! event; unsubscribing removes it and notifies the event again without
//! params.
//!
//! ```rust,no_run
//! use jsonlink_client::{JsonRpcApi, JsonRpcClient, NotificationHandler, StaticEntrypoint};
//! use serde_json::json;
//!
//! # async fn example(client: JsonRpcClient) -> jsonlink_core::Result<()> {
//! let api = JsonRpcApi::new(client);
//! api.connect(StaticEntrypoint::new("ws://localhost:8080/api")).await?;
//!
//! let on_status = NotificationHandler::new(|params| {
//!     println!("status: {}", params);
//!     Ok(())
//! });
//! api.subscribe(
//!     "workspace/subscribe",
//!     "workspace/statusChanged",
//!     on_status.clone(),
//!     json!({"workspaceId": "ws-1"}),
//! )?;
//!
//! // ...
//! api.unsubscribe("workspace/unsubscribe", "workspace/statusChanged", &on_status)?;
//! # Ok(())
//! # }
//! ```

use crate::client::JsonRpcClient;
use crate::entrypoint::EntrypointProvider;
use crate::notification::NotificationHandler;
use jsonlink_core::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Event subscriptions and requests over one [`JsonRpcClient`]
#[derive(Clone)]
pub struct JsonRpcApi {
    client: JsonRpcClient,
}

impl JsonRpcApi {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    /// Register `handler` under `notification`, then notify `event`
    ///
    /// The handler is registered before anything is sent, so the first
    /// notification the server pushes in reply is delivered to it.
    pub fn subscribe<P: Serialize>(
        &self,
        event: &str,
        notification: &str,
        handler: NotificationHandler,
        params: P,
    ) -> Result<()> {
        self.client.add_notification_handler(notification, handler);
        self.client.notify(event, params)
    }

    /// Remove `handler` from `notification`, then notify `event` without params
    pub fn unsubscribe(
        &self,
        event: &str,
        notification: &str,
        handler: &NotificationHandler,
    ) -> Result<()> {
        self.client.remove_notification_handler(notification, handler);
        self.client.notify(event, ())
    }

    /// Remove every handler from `notification`, then notify `event` once
    pub fn unsubscribe_all(&self, event: &str, notification: &str) -> Result<()> {
        self.client.remove_all_notification_handlers(notification);
        self.client.notify(event, ())
    }

    pub async fn connect<P>(&self, provider: P) -> Result<()>
    where
        P: EntrypointProvider + 'static,
    {
        self.client.connect(provider).await
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.client.request(method, params).await
    }
}

impl From<JsonRpcClient> for JsonRpcApi {
    fn from(client: JsonRpcClient) -> Self {
        Self::new(client)
    }
}
