//! End-to-end board mutation flows over a live WebSocket connection.
//!
//! Each test starts a relay on an OS-assigned port, connects one or more
//! tungstenite clients, and drives the full create/update/move/comment/
//! delete surface, asserting on the exact event sequences viewers observe.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use taskboard_proto::activity::ActivityKind;
use taskboard_proto::codec;
use taskboard_proto::event::{ClientEvent, MoveRequest, ServerEvent};
use taskboard_proto::task::{Priority, Task, TaskDraft, TaskPatch, TaskStatus};
use taskboard_relay::relay;

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_test_server() -> std::net::SocketAddr {
    let (addr, _handle) = relay::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server");
    addr
}

/// Connects a viewer and drains the initial sync (tasks-synced,
/// activity-synced, viewers-online, viewers-count).
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

fn draft(title: &str, status: TaskStatus, priority: Priority) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        status: Some(status),
        priority: Some(priority),
        ..TaskDraft::default()
    }
}

fn move_request(task: &Task, status: TaskStatus, destination_index: usize) -> MoveRequest {
    MoveRequest {
        id: task.id,
        status,
        destination_index,
        source_index: None,
        source_column: None,
        destination_column: None,
    }
}

/// Creates a task and returns the canonical record from the broadcast,
/// draining the paired activity event.
async fn create_task(ws: &mut WsClient, task_draft: TaskDraft) -> Task {
    send(ws, &ClientEvent::CreateTask(task_draft)).await;
    let task = match recv(ws).await {
        ServerEvent::TaskCreated(task) => task,
        other => panic!("expected task-created, got {other:?}"),
    };
    match recv(ws).await {
        ServerEvent::ActivityAdded(record) => assert_eq!(record.kind, ActivityKind::Create),
        other => panic!("expected activity-added, got {other:?}"),
    }
    task
}

#[tokio::test]
async fn end_to_end_create_move_delete() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    // Create: the server assigns id and timestamps.
    send(
        &mut ws,
        &ClientEvent::CreateTask(draft("Fix bug", TaskStatus::ToDo, Priority::High)),
    )
    .await;
    let task = match recv(&mut ws).await {
        ServerEvent::TaskCreated(task) => {
            assert_eq!(task.title, "Fix bug");
            assert_eq!(task.status, TaskStatus::ToDo);
            assert_eq!(task.priority, Priority::High);
            assert!(task.comments.is_empty());
            task
        }
        other => panic!("expected task-created, got {other:?}"),
    };
    match recv(&mut ws).await {
        ServerEvent::ActivityAdded(record) => {
            assert_eq!(record.kind, ActivityKind::Create);
            assert_eq!(record.task_id, task.id);
            assert_eq!(record.task_title, "Fix bug");
        }
        other => panic!("expected activity-added, got {other:?}"),
    }

    // Move to "Done": the broadcast carries the full reordered collection.
    send(
        &mut ws,
        &ClientEvent::MoveTask(move_request(&task, TaskStatus::Done, 0)),
    )
    .await;
    match recv(&mut ws).await {
        ServerEvent::TasksSynced(tasks) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].status, TaskStatus::Done);
        }
        other => panic!("expected tasks-synced, got {other:?}"),
    }
    match recv(&mut ws).await {
        ServerEvent::ActivityAdded(record) => {
            assert_eq!(record.kind, ActivityKind::Move);
            assert_eq!(record.old_status, Some(TaskStatus::ToDo));
            assert_eq!(record.new_status, Some(TaskStatus::Done));
        }
        other => panic!("expected activity-added, got {other:?}"),
    }

    // Delete.
    send(&mut ws, &ClientEvent::DeleteTask(task.id)).await;
    match recv(&mut ws).await {
        ServerEvent::TaskDeleted(id) => assert_eq!(id, task.id),
        other => panic!("expected task-deleted, got {other:?}"),
    }
    match recv(&mut ws).await {
        ServerEvent::ActivityAdded(record) => assert_eq!(record.kind, ActivityKind::Delete),
        other => panic!("expected activity-added, got {other:?}"),
    }

    // The log kept all three mutations, newest first.
    send(&mut ws, &ClientEvent::RequestSync).await;
    match recv(&mut ws).await {
        ServerEvent::TasksSynced(tasks) => assert!(tasks.is_empty()),
        other => panic!("expected tasks-synced, got {other:?}"),
    }
    match recv(&mut ws).await {
        ServerEvent::ActivitySynced(log) => {
            assert_eq!(log.len(), 3);
            assert_eq!(log[0].kind, ActivityKind::Delete);
            assert_eq!(log[1].kind, ActivityKind::Move);
            assert_eq!(log[2].kind, ActivityKind::Create);
        }
        other => panic!("expected activity-synced, got {other:?}"),
    }
}

#[tokio::test]
async fn move_broadcast_converges_across_viewers() {
    let addr = start_test_server().await;
    let mut ws_a = connect(addr).await;

    let task_a = create_task(&mut ws_a, draft("A", TaskStatus::ToDo, Priority::Medium)).await;
    create_task(&mut ws_a, draft("B", TaskStatus::ToDo, Priority::Medium)).await;
    create_task(&mut ws_a, draft("C", TaskStatus::Done, Priority::Medium)).await;

    // Second viewer connects after the fact; drain A's count broadcast.
    let mut ws_b = connect(addr).await;
    recv(&mut ws_a).await; // viewers-count = 2

    send(
        &mut ws_a,
        &ClientEvent::MoveTask(move_request(&task_a, TaskStatus::Done, 0)),
    )
    .await;

    let order_a = match recv(&mut ws_a).await {
        ServerEvent::TasksSynced(tasks) => tasks,
        other => panic!("expected tasks-synced, got {other:?}"),
    };
    let order_b = match recv(&mut ws_b).await {
        ServerEvent::TasksSynced(tasks) => tasks,
        other => panic!("expected tasks-synced, got {other:?}"),
    };

    // Every viewer converges on the identical collection order.
    assert_eq!(order_a, order_b);

    let done: Vec<&str> = order_a
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(done, vec!["A", "C"]);
    let todo: Vec<&str> = order_a
        .iter()
        .filter(|t| t.status == TaskStatus::ToDo)
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(todo, vec!["B"]);
}

#[tokio::test]
async fn update_merges_and_broadcasts() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    let task = create_task(&mut ws, draft("Before", TaskStatus::ToDo, Priority::Low)).await;

    send(
        &mut ws,
        &ClientEvent::UpdateTask(TaskPatch {
            id: task.id,
            title: Some("After".to_string()),
            priority: Some(Priority::Critical),
            ..TaskPatch::default()
        }),
    )
    .await;

    match recv(&mut ws).await {
        ServerEvent::TaskUpdated(updated) => {
            assert_eq!(updated.id, task.id);
            assert_eq!(updated.title, "After");
            assert_eq!(updated.priority, Priority::Critical);
            // Untouched field survives the shallow merge.
            assert_eq!(updated.status, TaskStatus::ToDo);
        }
        other => panic!("expected task-updated, got {other:?}"),
    }
    match recv(&mut ws).await {
        ServerEvent::ActivityAdded(record) => {
            assert_eq!(record.kind, ActivityKind::Update);
            assert_eq!(record.task_title, "After");
        }
        other => panic!("expected activity-added, got {other:?}"),
    }
}

#[tokio::test]
async fn comment_appends_and_broadcasts() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    let task = create_task(&mut ws, draft("T", TaskStatus::ToDo, Priority::Medium)).await;

    send(
        &mut ws,
        &ClientEvent::AddComment {
            task_id: task.id,
            text: "ship it".to_string(),
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerEvent::CommentAdded { task_id, comment } => {
            assert_eq!(task_id, task.id);
            assert_eq!(comment.text, "ship it");
        }
        other => panic!("expected comment-added, got {other:?}"),
    }
    match recv(&mut ws).await {
        ServerEvent::ActivityAdded(record) => assert_eq!(record.kind, ActivityKind::Comment),
        other => panic!("expected activity-added, got {other:?}"),
    }

    // The comment landed on the task; everything else is unchanged.
    send(&mut ws, &ClientEvent::RequestSync).await;
    match recv(&mut ws).await {
        ServerEvent::TasksSynced(tasks) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].comments.len(), 1);
            assert_eq!(tasks[0].status, task.status);
            assert_eq!(tasks[0].priority, task.priority);
        }
        other => panic!("expected tasks-synced, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_comment_is_rejected_privately() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    let task = create_task(&mut ws, draft("T", TaskStatus::ToDo, Priority::Medium)).await;

    send(
        &mut ws,
        &ClientEvent::AddComment {
            task_id: task.id,
            text: "   ".to_string(),
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerEvent::Error { reason } => assert!(reason.contains("comment"), "got: {reason}"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn bulk_update_replaces_matching_tasks_only() {
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    let task_a = create_task(&mut ws, draft("A", TaskStatus::ToDo, Priority::Medium)).await;
    create_task(&mut ws, draft("B", TaskStatus::ToDo, Priority::Medium)).await;

    let mut replacement = task_a.clone();
    replacement.title = "A rewritten".to_string();
    let mut ghost = task_a.clone();
    ghost.id = taskboard_proto::task::TaskId::new();
    ghost.title = "ghost".to_string();

    send(&mut ws, &ClientEvent::BulkUpdateTasks(vec![replacement, ghost])).await;

    match recv(&mut ws).await {
        ServerEvent::TasksSynced(tasks) => {
            // The unknown id was ignored, not created.
            assert_eq!(tasks.len(), 2);
            assert_eq!(tasks[0].title, "A rewritten");
            assert_eq!(tasks[1].title, "B");
        }
        other => panic!("expected tasks-synced, got {other:?}"),
    }
}
