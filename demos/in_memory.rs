//! In-memory subscription demo
//!
//! A fake workspace server runs in a task on the other end of a
//! `MemoryTransport`. The client subscribes to status changes, makes a
//! request that triggers a few of them, then unsubscribes.
//!
//! Run with: cargo run --example in_memory

use jsonlink::client::{MemoryPeer, MemoryTransport};
use jsonlink::{JsonRpcApi, JsonRpcClient, NotificationHandler, StaticEntrypoint};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct StatusChanged {
    workspace: String,
    status: String,
}

async fn serve(mut peer: MemoryPeer) {
    while let Some(text) = peer.recv().await {
        let Ok(message) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let method = message["method"].as_str().unwrap_or_default().to_string();

        match (method.as_str(), message.get("id")) {
            ("workspace/start", Some(id)) => {
                let id = serde_json::from_value(id.clone()).unwrap_or(jsonlink::core::Id::Null);
                let workspace = message["params"]["workspace"].as_str().unwrap_or("?").to_string();
                peer.respond(id, json!({"accepted": true}));
                for status in ["STARTING", "RUNNING"] {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    peer.notify(
                        "workspace/statusChanged",
                        json!({"workspace": workspace, "status": status}),
                    );
                }
            }
            (event, None) => tracing::info!(event, "Server got event"),
            (other, Some(id)) => {
                let id = serde_json::from_value(id.clone()).unwrap_or(jsonlink::core::Id::Null);
                peer.respond_error(id, jsonlink::core::JsonRpcErrorData::method_not_found(other));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let transport = MemoryTransport::new();
    let api = JsonRpcApi::new(JsonRpcClient::new(transport.clone()));

    api.connect(StaticEntrypoint::new("memory://workspace-server")).await?;
    let peer = transport.accept().await.ok_or("server side missing")?;
    let server = tokio::spawn(serve(peer));

    let on_status = NotificationHandler::typed(|event: StatusChanged| {
        println!("{} is now {}", event.workspace, event.status);
        Ok(())
    });
    api.subscribe(
        "workspace/subscribe",
        "workspace/statusChanged",
        on_status.clone(),
        json!({"workspace": "ws-1"}),
    )?;

    let reply: Value = api.request("workspace/start", json!({"workspace": "ws-1"})).await?;
    println!("start accepted: {}", reply["accepted"]);

    tokio::time::sleep(Duration::from_millis(200)).await;

    api.unsubscribe("workspace/unsubscribe", "workspace/statusChanged", &on_status)?;

    match api.request::<_, Value>("workspace/delete", json!({"workspace": "ws-1"})).await {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("delete failed as expected: {}", e),
    }

    api.client().disconnect();
    server.await?;
    Ok(())
}
