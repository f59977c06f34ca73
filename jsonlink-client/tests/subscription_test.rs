//! Notification registry and subscription facade tests

mod common;

use common::eventually;
use jsonlink_client::{
    JsonRpcApi, JsonRpcClient, MemoryPeer, MemoryTransport, NotificationHandler, StaticEntrypoint,
};
use jsonlink_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn connected_api() -> (JsonRpcApi, MemoryPeer) {
    let transport = MemoryTransport::new();
    let api = JsonRpcApi::new(JsonRpcClient::new(transport.clone()));
    api.connect(StaticEntrypoint::new("memory://events")).await.unwrap();
    let peer = transport.accept().await.unwrap();
    (api, peer)
}

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> NotificationHandler {
    let log = log.clone();
    NotificationHandler::new(move |params| {
        log.lock().unwrap().push(format!("{}:{}", tag, params));
        Ok(())
    })
}

#[tokio::test]
async fn test_handlers_receive_in_wire_and_registration_order() {
    let (api, peer) = connected_api().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    api.subscribe("feed/subscribe", "feed/item", recorder(&log, "first"), ()).unwrap();
    api.subscribe("feed/subscribe", "feed/item", recorder(&log, "second"), ()).unwrap();

    peer.notify("feed/item", json!(1));
    peer.notify("feed/item", json!(2));

    assert!(eventually(|| log.lock().unwrap().len() == 4).await);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first:1", "second:1", "first:2", "second:2"]
    );
}

#[tokio::test]
async fn test_removed_handler_is_not_invoked() {
    let (api, peer) = connected_api().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let keep = recorder(&log, "keep");
    let drop_me = recorder(&log, "drop");

    api.subscribe("feed/subscribe", "feed/item", keep, ()).unwrap();
    api.subscribe("feed/subscribe", "feed/item", drop_me.clone(), ()).unwrap();
    api.unsubscribe("feed/unsubscribe", "feed/item", &drop_me).unwrap();

    peer.notify("feed/item", json!("x"));

    assert!(eventually(|| !log.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*log.lock().unwrap(), vec!["keep:\"x\""]);
}

#[tokio::test]
async fn test_unsubscribe_all_silences_notification() {
    let (api, mut peer) = connected_api().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    api.subscribe("feed/subscribe", "feed/item", recorder(&log, "a"), ()).unwrap();
    api.subscribe("feed/subscribe", "feed/item", recorder(&log, "b"), ()).unwrap();
    api.unsubscribe_all("feed/unsubscribe", "feed/item").unwrap();

    for _ in 0..2 {
        assert_eq!(peer.recv_notification().await.unwrap().method, "feed/subscribe");
    }
    assert_eq!(peer.recv_notification().await.unwrap().method, "feed/unsubscribe");

    peer.notify("feed/item", json!(1));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_handlers_are_isolated() {
    let (api, peer) = connected_api().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    api.subscribe(
        "feed/subscribe",
        "feed/item",
        NotificationHandler::new(|_| Err(Error::Handler("rejected".into()))),
        (),
    )
    .unwrap();
    api.subscribe(
        "feed/subscribe",
        "feed/item",
        NotificationHandler::new(|_| panic!("handler bug")),
        (),
    )
    .unwrap();
    api.subscribe("feed/subscribe", "feed/item", recorder(&log, "ok"), ()).unwrap();

    peer.notify("feed/item", json!(1));
    peer.notify("feed/item", json!(2));

    assert!(eventually(|| log.lock().unwrap().len() == 2).await);
    assert!(api.client().is_connected());
}

#[tokio::test]
async fn test_typed_handler_over_connection() {
    #[derive(Deserialize)]
    struct StatusChanged {
        workspace: String,
        status: String,
    }

    let (api, peer) = connected_api().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    api.subscribe(
        "workspace/subscribe",
        "workspace/statusChanged",
        NotificationHandler::typed(move |event: StatusChanged| {
            sink.lock().unwrap().push((event.workspace, event.status));
            Ok(())
        }),
        json!({"workspace": "ws-1"}),
    )
    .unwrap();

    peer.notify(
        "workspace/statusChanged",
        json!({"workspace": "ws-1", "status": "RUNNING"}),
    );

    assert!(eventually(|| seen.lock().unwrap().len() == 1).await);
    assert_eq!(
        seen.lock().unwrap()[0],
        ("ws-1".to_string(), "RUNNING".to_string())
    );
}

#[tokio::test]
async fn test_handlers_registered_before_connect_survive_reconnect() {
    let transport = MemoryTransport::new();
    let client = JsonRpcClient::new(transport.clone());
    let log = Arc::new(Mutex::new(Vec::new()));
    client.add_notification_handler("tick", recorder(&log, "t"));

    client.connect(StaticEntrypoint::new("memory://one")).await.unwrap();
    transport.accept().await.unwrap().close(None);
    assert!(eventually(|| !client.is_connected()).await);

    client.connect(StaticEntrypoint::new("memory://two")).await.unwrap();
    let peer = transport.accept().await.unwrap();
    peer.notify("tick", Value::Null);

    assert!(eventually(|| log.lock().unwrap().len() == 1).await);
    assert_eq!(*log.lock().unwrap(), vec!["t:null"]);
}

#[tokio::test]
async fn test_subscribe_while_disconnected_still_registers() {
    let api = JsonRpcApi::new(JsonRpcClient::new(MemoryTransport::new()));
    let handler = NotificationHandler::new(|_| Ok(()));

    assert!(api.subscribe("feed/subscribe", "feed/item", handler, ()).is_ok());
    assert_eq!(api.client().notifications().handler_count("feed/item"), 1);
}
