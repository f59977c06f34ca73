//! WebSocket transport
//!
//! Each opened connection is split into two tasks:
//!
//! - a writer draining the outbound channel into the socket; when the client
//!   drops its sender the writer closes the socket
//! - a reader turning frames into [`TransportEvent`]s
//!
//! Binary frames holding UTF-8 are delivered like text; ping/pong frames are
//! answered by tungstenite and never surface.

use crate::transport::{Transport, TransportConnection, TransportEvent};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use jsonlink_core::{Error, Result};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Transport over `ws://` / `wss://` using tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create a WebSocket transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    #[tracing::instrument(skip(self))]
    async fn open(&self, url: &str) -> Result<TransportConnection> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;

        let (mut sink, mut stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let writer_events = events_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::warn!(error = %e, "WebSocket send failed");
                    let _ = writer_events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            }
            tracing::debug!("Outbound channel dropped, closing WebSocket");
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let event = match frame {
                    Ok(Message::Text(text)) => TransportEvent::Message(text),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => TransportEvent::Message(text),
                        Err(_) => {
                            tracing::warn!("Ignoring non UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        let _ = events_tx.send(TransportEvent::Closed(reason));
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = events_tx.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                };

                if events_tx.send(event).is_err() {
                    // client no longer listening
                    return;
                }
            }
            let _ = events_tx.send(TransportEvent::Closed(None));
        });

        Ok(TransportConnection::new(outbound_tx, events_rx))
    }
}
