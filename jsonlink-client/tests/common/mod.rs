//! Shared helpers for jsonlink-client integration tests
//!
//! `MockWsServer` is a small WebSocket server on an ephemeral port. Every
//! text frame it receives is recorded and passed to a handler whose reply
//! (if any) is sent back. Tests can also push frames to every connected
//! client and close all connections from the server side.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

type Handler = Arc<dyn Fn(String) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone)]
enum Command {
    Push(String),
    CloseAll,
}

/// Mock WebSocket server for client tests
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
    commands: broadcast::Sender<Command>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Server that records messages and never answers
    pub async fn silent() -> Self {
        Self::with_handler(|_| None).await
    }

    /// Server that answers every request with its params as the result
    pub async fn echo() -> Self {
        Self::with_handler(|text| {
            let request: Value = serde_json::from_str(&text).ok()?;
            let id = request.get("id")?.as_i64()?;
            Some(mock_response(id, request.get("params").cloned().unwrap_or(Value::Null)))
        })
        .await
    }

    /// Server with a custom reply function
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(String) -> Option<String> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (message_tx, message_rx) = mpsc::channel::<String>(100);
        let (commands, _) = broadcast::channel::<Command>(64);
        let connections = Arc::new(AtomicUsize::new(0));

        let server_commands = commands.clone();
        let server_connections = connections.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let handler = handler.clone();
                        let message_tx = message_tx.clone();
                        let mut command_rx = server_commands.subscribe();
                        server_connections.fetch_add(1, Ordering::SeqCst);

                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            let (mut write, mut read) = ws_stream.split();

                            loop {
                                tokio::select! {
                                    frame = read.next() => match frame {
                                        Some(Ok(Message::Text(text))) => {
                                            let _ = message_tx.send(text.clone()).await;
                                            if let Some(reply) = handler(text) {
                                                let _ = write.send(Message::Text(reply)).await;
                                            }
                                        }
                                        Some(Ok(_)) => {}
                                        _ => break,
                                    },
                                    command = command_rx.recv() => match command {
                                        Ok(Command::Push(text)) => {
                                            let _ = write.send(Message::Text(text)).await;
                                        }
                                        Ok(Command::CloseAll) | Err(_) => {
                                            let _ = write.send(Message::Close(None)).await;
                                            break;
                                        }
                                    },
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx,
            commands,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next message a client sent, within 5 seconds
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next message parsed as JSON
    pub async fn wait_for_json(&mut self) -> Option<Value> {
        serde_json::from_str(&self.wait_for_message().await?).ok()
    }

    /// Send a frame to every connected client
    pub fn push(&self, text: String) {
        let _ = self.commands.send(Command::Push(text));
    }

    /// Close every open connection with a close frame
    pub fn close_connections(&self) {
        let _ = self.commands.send(Command::CloseAll);
    }

    pub async fn shutdown(self) {
        self.close_connections();
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// A URL nothing listens on
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

pub fn mock_response(id: i64, result: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id
    })
    .to_string()
}

pub fn mock_error_response(id: i64, code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message
        },
        "id": id
    })
    .to_string()
}

pub fn mock_notification(method: &str, params: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    })
    .to_string()
}

/// Poll `condition` every 5ms for up to 2 seconds
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_error_response_format() {
        let response: Value = serde_json::from_str(&mock_error_response(1, -32601, "Method not found")).unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], 1);
    }

    #[test]
    fn test_mock_notification_has_no_id() {
        let notification: Value = serde_json::from_str(&mock_notification("event", json!({"data": "test"}))).unwrap();
        assert_eq!(notification["method"], "event");
        assert!(notification.get("id").is_none());
    }
}
