//! Relay server core: shared state, WebSocket handler, viewer registry, and
//! mutation fan-out.
//!
//! The relay accepts WebSocket connections from board viewers, assigns each
//! a transient viewer id, and routes mutation intents into the board store.
//! Every successful mutation is recorded in the activity log and broadcast
//! to all connected viewers, including the originator. Fan-out is
//! fire-and-forget: a viewer that misses events reconnects and issues a
//! `request-sync`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use taskboard_proto::activity::{ActivityKind, ActivityRecord};
use taskboard_proto::codec;
use taskboard_proto::event::{ClientEvent, ServerEvent};
use taskboard_proto::task::Task;

use crate::activity::ActivityLog;
use crate::board::{BoardStore, StoreError};
use crate::persist::Persister;
use crate::roster::Roster;

/// Number of activity entries replayed to a viewer on connect and resync.
const ACTIVITY_SYNC_LIMIT: usize = 50;

/// The board document: task collection and activity log, guarded by one
/// lock. Move correctness requires the destination-column snapshot and the
/// log append to be observed atomically.
#[derive(Debug, Default)]
pub struct BoardState {
    /// The canonical ordered task collection.
    pub tasks: BoardStore,
    /// The bounded newest-first activity log.
    pub activity: ActivityLog,
}

/// Shared relay state holding the viewer registry and the board document.
pub struct RelayState {
    /// Maps viewer id to a channel sender for delivering WebSocket messages.
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<Message>>>,
    /// The board document behind a single lock.
    board: RwLock<BoardState>,
    /// Online roster of connected viewers.
    pub roster: Roster,
    /// Write-through persistence; absent in embedded/test use.
    persist: Option<Persister>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates relay state with an empty board and no persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            board: RwLock::new(BoardState::default()),
            roster: Roster::new(),
            persist: None,
        }
    }

    /// Creates relay state from a pre-loaded board document and a persister
    /// that will be written through on every mutation.
    #[must_use]
    pub fn with_config(board: BoardState, persist: Persister) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            board: RwLock::new(board),
            roster: Roster::new(),
            persist: Some(persist),
        }
    }

    /// Registers a viewer, storing the sender half of its message channel.
    pub async fn register(&self, viewer_id: Uuid, sender: mpsc::UnboundedSender<Message>) {
        let mut conns = self.connections.write().await;
        conns.insert(viewer_id, sender);
    }

    /// Removes a viewer from the registry, returning the sender if it existed.
    pub async fn unregister(&self, viewer_id: Uuid) -> Option<mpsc::UnboundedSender<Message>> {
        let mut conns = self.connections.write().await;
        conns.remove(&viewer_id)
    }

    /// Returns a clone of the sender for the given viewer, if registered.
    pub async fn get_sender(&self, viewer_id: Uuid) -> Option<mpsc::UnboundedSender<Message>> {
        let conns = self.connections.read().await;
        conns.get(&viewer_id).cloned()
    }

    /// Number of tasks currently on the board.
    pub async fn task_count(&self) -> usize {
        let board = self.board.read().await;
        board.tasks.len()
    }

    /// Encodes an event once and sends it to every connected viewer.
    ///
    /// Delivery is best-effort: a viewer whose channel is gone is skipped;
    /// its reader/writer tasks handle the cleanup.
    pub async fn broadcast(&self, event: &ServerEvent) {
        let text = match codec::encode_server(event) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode broadcast event");
                return;
            }
        };
        let conns = self.connections.read().await;
        for sender in conns.values() {
            let _ = sender.send(Message::Text(text.clone().into()));
        }
    }

    /// Sends an event to a single viewer via its channel.
    pub async fn send_to_viewer(&self, viewer_id: Uuid, event: &ServerEvent) {
        if let Some(sender) = self.get_sender(viewer_id).await
            && let Ok(text) = codec::encode_server(event)
        {
            let _ = sender.send(Message::Text(text.into()));
        }
    }

    /// Writes both state documents from a spawned task; persistence errors
    /// are logged inside the persister and never reach viewers.
    fn spawn_save(&self, tasks: Vec<Task>, activity: Vec<ActivityRecord>) {
        if let Some(persister) = &self.persist {
            let persister = persister.clone();
            tokio::spawn(async move {
                persister.save_tasks(&tasks).await;
                persister.save_activity(&activity).await;
            });
        }
    }

    /// Unregisters a viewer, drops it from the roster, and tells everyone
    /// the new count and roster.
    async fn disconnect(&self, viewer_id: Uuid) {
        self.unregister(viewer_id).await;
        self.roster.leave(viewer_id).await;
        self.broadcast(&ServerEvent::ViewersCount(self.roster.count().await))
            .await;
        self.broadcast(&ServerEvent::ViewersOnline(self.roster.snapshot().await))
            .await;
    }
}

/// Handles an upgraded WebSocket connection for a single viewer.
///
/// The connection lifecycle:
/// 1. Assign a transient viewer id and join the roster.
/// 2. Register the writer channel, then send the private initial sync
///    (full task collection, recent activity, online roster).
/// 3. Broadcast the updated viewer count to everyone.
/// 4. Enter the message loop, dispatching mutation intents.
/// 5. On disconnect, unregister and broadcast the updated count and roster.
pub async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let viewer_id = Uuid::now_v7();
    state.roster.join(viewer_id).await;

    // Register before the initial sync so no broadcast is missed; anything
    // broadcast meanwhile buffers in the channel until the writer task runs.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.register(viewer_id, tx).await;

    let (tasks, activity) = {
        let board = state.board.read().await;
        (
            board.tasks.snapshot(),
            board.activity.recent(ACTIVITY_SYNC_LIMIT),
        )
    };
    let initial = [
        ServerEvent::TasksSynced(tasks),
        ServerEvent::ActivitySynced(activity),
        ServerEvent::ViewersOnline(state.roster.snapshot().await),
    ];
    for event in &initial {
        if let Err(e) = send_event(&mut ws_sender, event).await {
            tracing::warn!(viewer = %viewer_id, error = %e, "failed to send initial sync");
            state.disconnect(viewer_id).await;
            return;
        }
    }

    state
        .broadcast(&ServerEvent::ViewersCount(state.roster.count().await))
        .await;

    tracing::info!(viewer = %viewer_id, "viewer connected");

    // Writer task: forwards channel messages to the WebSocket.
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: decode and dispatch incoming frames.
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_frame(viewer_id, text.as_str(), &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::debug!(viewer = %viewer_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore binary, ping, pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.disconnect(viewer_id).await;
    tracing::info!(viewer = %viewer_id, "viewer disconnected");
}

/// Decodes one text frame and dispatches it. A malformed frame gets a
/// private error reply; it never tears down the connection or affects
/// other viewers.
async fn handle_text_frame(viewer_id: Uuid, text: &str, state: &Arc<RelayState>) {
    let event = match codec::decode_client(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(viewer = %viewer_id, error = %e, "failed to decode event");
            state
                .send_to_viewer(
                    viewer_id,
                    &ServerEvent::Error {
                        reason: format!("malformed event: {e}"),
                    },
                )
                .await;
            return;
        }
    };

    if let Err(e) = dispatch(viewer_id, event, state).await {
        tracing::debug!(viewer = %viewer_id, error = %e, "mutation rejected");
        state
            .send_to_viewer(
                viewer_id,
                &ServerEvent::Error {
                    reason: e.to_string(),
                },
            )
            .await;
    }
}

/// Applies one client event against the board document.
///
/// Broadcasts happen while the board write lock is held, so every viewer
/// observes mutations in the same relative order. A failed mutation leaves
/// the store untouched and emits nothing.
async fn dispatch(
    viewer_id: Uuid,
    event: ClientEvent,
    state: &Arc<RelayState>,
) -> Result<(), StoreError> {
    match event {
        ClientEvent::CreateTask(draft) => {
            let mut board = state.board.write().await;
            let task = board.tasks.create(draft)?;
            let record = ActivityRecord::new(ActivityKind::Create, &task, viewer_id);
            board.activity.record(record.clone());
            tracing::info!(viewer = %viewer_id, task = %task.id, "task created");
            state.broadcast(&ServerEvent::TaskCreated(task)).await;
            state.broadcast(&ServerEvent::ActivityAdded(record)).await;
            let (tasks, activity) = (board.tasks.snapshot(), board.activity.snapshot());
            drop(board);
            state.spawn_save(tasks, activity);
        }
        ClientEvent::UpdateTask(patch) => {
            let mut board = state.board.write().await;
            let task = board.tasks.update(patch)?;
            let record = ActivityRecord::new(ActivityKind::Update, &task, viewer_id);
            board.activity.record(record.clone());
            state.broadcast(&ServerEvent::TaskUpdated(task)).await;
            state.broadcast(&ServerEvent::ActivityAdded(record)).await;
            let (tasks, activity) = (board.tasks.snapshot(), board.activity.snapshot());
            drop(board);
            state.spawn_save(tasks, activity);
        }
        ClientEvent::MoveTask(request) => {
            let mut board = state.board.write().await;
            let (task, old_status) =
                board
                    .tasks
                    .move_task(request.id, request.status, request.destination_index)?;
            let record = ActivityRecord::moved(&task, old_status, viewer_id);
            board.activity.record(record.clone());
            tracing::info!(
                viewer = %viewer_id,
                task = %task.id,
                from = %old_status,
                to = %task.status,
                "task moved"
            );
            // Column order is positional, so only the full collection lets
            // every viewer converge on the same ordering.
            let snapshot = board.tasks.snapshot();
            state
                .broadcast(&ServerEvent::TasksSynced(snapshot.clone()))
                .await;
            state.broadcast(&ServerEvent::ActivityAdded(record)).await;
            let activity = board.activity.snapshot();
            drop(board);
            state.spawn_save(snapshot, activity);
        }
        ClientEvent::DeleteTask(id) => {
            let mut board = state.board.write().await;
            let task = board.tasks.delete(id)?;
            let record = ActivityRecord::new(ActivityKind::Delete, &task, viewer_id);
            board.activity.record(record.clone());
            tracing::info!(viewer = %viewer_id, task = %id, "task deleted");
            state.broadcast(&ServerEvent::TaskDeleted(id)).await;
            state.broadcast(&ServerEvent::ActivityAdded(record)).await;
            let (tasks, activity) = (board.tasks.snapshot(), board.activity.snapshot());
            drop(board);
            state.spawn_save(tasks, activity);
        }
        ClientEvent::AddComment { task_id, text } => {
            let mut board = state.board.write().await;
            let comment = board.tasks.add_comment(task_id, &text, viewer_id)?;
            let record = {
                let task = board
                    .tasks
                    .get(task_id)
                    .ok_or(StoreError::NotFound(task_id))?;
                ActivityRecord::new(ActivityKind::Comment, task, viewer_id)
            };
            board.activity.record(record.clone());
            state
                .broadcast(&ServerEvent::CommentAdded { task_id, comment })
                .await;
            state.broadcast(&ServerEvent::ActivityAdded(record)).await;
            let (tasks, activity) = (board.tasks.snapshot(), board.activity.snapshot());
            drop(board);
            state.spawn_save(tasks, activity);
        }
        ClientEvent::BulkUpdateTasks(replacements) => {
            let mut board = state.board.write().await;
            let snapshot = board.tasks.bulk_replace(replacements);
            state
                .broadcast(&ServerEvent::TasksSynced(snapshot.clone()))
                .await;
            let activity = board.activity.snapshot();
            drop(board);
            state.spawn_save(snapshot, activity);
        }
        ClientEvent::RequestSync => {
            let board = state.board.read().await;
            let tasks = board.tasks.snapshot();
            let activity = board.activity.recent(ACTIVITY_SYNC_LIMIT);
            drop(board);
            state
                .send_to_viewer(viewer_id, &ServerEvent::TasksSynced(tasks))
                .await;
            state
                .send_to_viewer(viewer_id, &ServerEvent::ActivitySynced(activity))
                .await;
        }
    }
    Ok(())
}

/// Encodes and sends a server event directly on a WebSocket sender.
async fn send_event(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    event: &ServerEvent,
) -> Result<(), String> {
    let text = codec::encode_server(event).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

/// Starts the relay server on the given address and returns the bound
/// address and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(RelayState::new())).await
}

/// Starts the relay server with a pre-configured [`RelayState`].
///
/// Use [`RelayState::with_config`] to create a state seeded from persisted
/// board documents.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<RelayState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = crate::http::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    Ok((bound_addr, handle))
}
