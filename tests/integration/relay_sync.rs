//! Sync, roster, bounded-log, and persistence behavior of the relay.
//!
//! Covers the connect-time state replay, private resynchronization,
//! viewer-count broadcasts, activity log bounding through the wire, and the
//! write-through persistence of board state.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use taskboard_proto::activity::ActivityKind;
use taskboard_proto::codec;
use taskboard_proto::event::{ClientEvent, ServerEvent};
use taskboard_proto::task::{TaskDraft, TaskId, TaskStatus};
use taskboard_relay::activity::ActivityLog;
use taskboard_relay::board::BoardStore;
use taskboard_relay::persist::Persister;
use taskboard_relay::relay::{self, BoardState, RelayState};

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_test_server() -> std::net::SocketAddr {
    let (addr, _handle) = relay::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server");
    addr
}

async fn connect(addr: std::net::SocketAddr) -> WsClient {
    let url = format!("ws://{addr}/ws");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    for _ in 0..4 {
        recv(&mut ws).await;
    }
    ws
}

async fn send(ws: &mut WsClient, event: &ClientEvent) {
    let text = codec::encode_client(event).unwrap();
    ws.send(tungstenite::Message::Text(text.into()))
        .await
        .unwrap();
}

async fn recv(ws: &mut WsClient) -> ServerEvent {
    let msg = ws.next().await.unwrap().unwrap();
    codec::decode_server(msg.into_text().unwrap().as_str()).unwrap()
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        status: Some(TaskStatus::ToDo),
        ..TaskDraft::default()
    }
}

/// Creates a task, draining the two broadcast events.
async fn create_task(ws: &mut WsClient, title: &str) {
    send(ws, &ClientEvent::CreateTask(draft(title))).await;
    recv(ws).await; // task-created
    recv(ws).await; // activity-added
}

#[tokio::test]
async fn resync_is_idempotent() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    create_task(&mut ws, "one").await;
    create_task(&mut ws, "two").await;

    let mut collections = Vec::new();
    for _ in 0..2 {
        send(&mut ws, &ClientEvent::RequestSync).await;
        match recv(&mut ws).await {
            ServerEvent::TasksSynced(tasks) => collections.push(tasks),
            other => panic!("expected tasks-synced, got {other:?}"),
        }
        match recv(&mut ws).await {
            ServerEvent::ActivitySynced(_) => {}
            other => panic!("expected activity-synced, got {other:?}"),
        }
    }

    // No mutation in between: both resyncs return the identical collection.
    assert_eq!(collections[0], collections[1]);
    assert_eq!(collections[0].len(), 2);
}

#[tokio::test]
async fn resync_is_private_to_the_requester() {
    let addr = start_test_server().await;
    let mut ws_a = connect(addr).await;
    let mut ws_b = connect(addr).await;
    recv(&mut ws_a).await; // viewers-count = 2

    send(&mut ws_b, &ClientEvent::RequestSync).await;
    recv(&mut ws_b).await; // tasks-synced
    recv(&mut ws_b).await; // activity-synced

    // A hears nothing from B's resync; the next thing A sees is a real
    // broadcast.
    create_task(&mut ws_b, "visible").await;
    match recv(&mut ws_a).await {
        ServerEvent::TaskCreated(task) => assert_eq!(task.title, "visible"),
        other => panic!("expected task-created, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_of_unknown_id_emits_nothing() {
    let addr = start_test_server().await;
    let mut ws_a = connect(addr).await;
    let mut ws_b = connect(addr).await;
    recv(&mut ws_a).await; // viewers-count = 2

    send(&mut ws_a, &ClientEvent::DeleteTask(TaskId::new())).await;

    // The originator gets a private not-found error...
    match recv(&mut ws_a).await {
        ServerEvent::Error { reason } => assert!(reason.contains("no task"), "got: {reason}"),
        other => panic!("expected error, got {other:?}"),
    }

    // ...and no activity entry was written, no broadcast sent.
    send(&mut ws_b, &ClientEvent::RequestSync).await;
    match recv(&mut ws_b).await {
        ServerEvent::TasksSynced(tasks) => assert!(tasks.is_empty()),
        other => panic!("expected tasks-synced, got {other:?}"),
    }
    match recv(&mut ws_b).await {
        ServerEvent::ActivitySynced(log) => assert!(log.is_empty()),
        other => panic!("expected activity-synced, got {other:?}"),
    }
}

#[tokio::test]
async fn viewer_count_tracks_connects_and_disconnects() {
    let addr = start_test_server().await;
    let mut ws_a = connect(addr).await;

    let ws_b = connect(addr).await;
    match recv(&mut ws_a).await {
        ServerEvent::ViewersCount(2) => {}
        other => panic!("expected viewers-count 2, got {other:?}"),
    }

    drop(ws_b);
    match recv(&mut ws_a).await {
        ServerEvent::ViewersCount(1) => {}
        other => panic!("expected viewers-count 1, got {other:?}"),
    }
    match recv(&mut ws_a).await {
        ServerEvent::ViewersOnline(online) => assert_eq!(online.len(), 1),
        other => panic!("expected viewers-online, got {other:?}"),
    }
}

#[tokio::test]
async fn late_viewer_receives_current_state_on_connect() {
    let addr = start_test_server().await;
    let mut ws_a = connect(addr).await;
    create_task(&mut ws_a, "already here").await;

    // A reconnecting client is just a new viewer: the initial sync carries
    // the canonical state.
    let url = format!("ws://{addr}/ws");
    let (mut ws_b, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    match recv(&mut ws_b).await {
        ServerEvent::TasksSynced(tasks) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].title, "already here");
        }
        other => panic!("expected tasks-synced, got {other:?}"),
    }
    match recv(&mut ws_b).await {
        ServerEvent::ActivitySynced(log) => {
            assert_eq!(log.len(), 1);
            assert_eq!(log[0].kind, ActivityKind::Create);
        }
        other => panic!("expected activity-synced, got {other:?}"),
    }
}

#[tokio::test]
async fn activity_log_is_bounded_over_the_wire() {
    // Cap the log at 5 and push 8 mutations through.
    let dir = tempfile::tempdir().unwrap();
    let board = BoardState {
        tasks: BoardStore::new(),
        activity: ActivityLog::with_cap(5),
    };
    let state = Arc::new(RelayState::with_config(board, Persister::new(dir.path())));
    let (addr, _handle) = relay::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server");

    let mut ws = connect(addr).await;
    for i in 0..8 {
        create_task(&mut ws, &format!("task-{i}")).await;
    }

    send(&mut ws, &ClientEvent::RequestSync).await;
    recv(&mut ws).await; // tasks-synced
    match recv(&mut ws).await {
        ServerEvent::ActivitySynced(log) => {
            assert_eq!(log.len(), 5);
            // Newest first; the three oldest entries were evicted.
            assert_eq!(log[0].task_title, "task-7");
            assert_eq!(log[4].task_title, "task-3");
        }
        other => panic!("expected activity-synced, got {other:?}"),
    }
}

#[tokio::test]
async fn mutations_are_written_through_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let persister = Persister::new(dir.path());
    let state = Arc::new(RelayState::with_config(
        BoardState::default(),
        persister.clone(),
    ));
    let (addr, _handle) = relay::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server");

    let mut ws = connect(addr).await;
    create_task(&mut ws, "durable").await;

    // The save runs on a spawned task; poll until it lands.
    let mut persisted = Vec::new();
    for _ in 0..40 {
        let (tasks, _) = persister.load();
        if !tasks.is_empty() {
            persisted = tasks;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].title, "durable");

    let (_, activity) = persister.load();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].kind, ActivityKind::Create);
}
