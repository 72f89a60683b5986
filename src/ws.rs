use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::api::SharedState;
use crate::board::{Board, TaskDraft};
use crate::hub::{BoardHub, ConnectionId, Subscription};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── Wire protocol ────────────────────────────────────────────────────
//
// Every frame is `{"event": "<name>", "data": <payload>}`.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub droppable_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    pub source: DragLocation,
    /// `None` when the task was dropped outside any column.
    pub destination: Option<DragLocation>,
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub task_id: String,
    pub column_id: String,
}

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    TaskDragged(DragRequest),
    AddTask(TaskDraft),
    DeleteTask(DeleteRequest),
}

/// Events the server sends. Both carry the whole board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    InitialData(Board),
    DataUpdated(Board),
}

impl ServerEvent {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: BoardHub) {
    let Subscription {
        id,
        initial,
        updates,
    } = match hub.connect().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting connection");
            return;
        }
    };
    tracing::info!(connection = id, "client connected");

    let (mut sender, receiver) = socket.split();
    if send_initial(&mut sender, initial).await {
        run_socket_loop(id, sender, receiver, updates, &hub).await;
    }

    hub.disconnect(id).await;
    tracing::info!(connection = id, "client disconnected");
}

/// Send the connect-time snapshot. Returns `false` if the socket is gone.
async fn send_initial(sender: &mut SplitSink<WebSocket, Message>, board: Board) -> bool {
    match ServerEvent::InitialData(board).to_frame() {
        Ok(frame) => sender.send(Message::Text(frame.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize initial snapshot");
            false
        }
    }
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Forwards board updates from the hub, hands client requests to the hub,
/// and sends a Ping every [`PING_INTERVAL`]. If no Pong arrives within
/// [`PONG_TIMEOUT`] the connection is considered dead and the loop exits.
async fn run_socket_loop(
    id: ConnectionId,
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut updates: mpsc::UnboundedReceiver<Arc<str>>,
    hub: &BoardHub,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::debug!(connection = id, "pong timeout");
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            update = updates.recv() => {
                let Some(frame) = update else { break };
                if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_client_frame(id, text.as_str(), hub).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection = id, error = %e, "socket error");
                        break;
                    }
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

/// Parse and apply one client frame. Returns `false` once the hub is gone.
async fn handle_client_frame(id: ConnectionId, text: &str, hub: &BoardHub) -> bool {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(connection = id, error = %e, "ignoring malformed frame");
            return true;
        }
    };
    match hub.apply(event).await {
        Ok(outcome) => {
            tracing::debug!(connection = id, ?outcome, "request handled");
            true
        }
        Err(e) => {
            tracing::error!(connection = id, error = %e, "board hub unavailable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ColumnId;

    #[test]
    fn test_parse_task_dragged() {
        let frame = r#"{"event":"task-dragged","data":{
            "source":{"droppableId":"column-1","index":0},
            "destination":{"droppableId":"column-2","index":3},
            "taskId":"task-1"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(
            event,
            ClientEvent::TaskDragged(DragRequest {
                source: DragLocation {
                    droppable_id: "column-1".to_string(),
                    index: 0,
                },
                destination: Some(DragLocation {
                    droppable_id: "column-2".to_string(),
                    index: 3,
                }),
                task_id: "task-1".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_task_dragged_null_destination() {
        let frame = r#"{"event":"task-dragged","data":{
            "source":{"droppableId":"column-1","index":0},
            "destination":null,"taskId":"task-1"}}"#;
        match serde_json::from_str::<ClientEvent>(frame).unwrap() {
            ClientEvent::TaskDragged(drag) => assert!(drag.destination.is_none()),
            other => panic!("Expected TaskDragged, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_task_with_partial_fields() {
        let frame = r#"{"event":"add-task","data":{"content":"Write spec","priority":"high"}}"#;
        match serde_json::from_str::<ClientEvent>(frame).unwrap() {
            ClientEvent::AddTask(draft) => {
                assert_eq!(draft.content, "Write spec");
                assert_eq!(draft.priority.as_deref(), Some("high"));
                assert!(draft.assignee.is_none());
                assert!(draft.due_date.is_none());
                assert!(draft.created_at.is_none());
            }
            other => panic!("Expected AddTask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_task_as_sent_by_browser() {
        let frame = r#"{"event":"add-task","data":{"content":"x","assignee":"","dueDate":"",
            "createdAt":"2024-01-01T00:00:00.000Z","priority":"medium"}}"#;
        match serde_json::from_str::<ClientEvent>(frame).unwrap() {
            ClientEvent::AddTask(draft) => {
                assert_eq!(draft.assignee.as_deref(), Some(""));
                assert_eq!(draft.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
            }
            other => panic!("Expected AddTask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete_task() {
        let frame = r#"{"event":"delete-task","data":{"taskId":"task-9","columnId":"column-3"}}"#;
        assert_eq!(
            serde_json::from_str::<ClientEvent>(frame).unwrap(),
            ClientEvent::DeleteTask(DeleteRequest {
                task_id: "task-9".to_string(),
                column_id: "column-3".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let frame = r#"{"event":"rename-column","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_server_event_frames() {
        let frame = ServerEvent::InitialData(Board::default()).to_frame().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["event"], "initial-data");
        assert_eq!(parsed["data"]["column-2"]["title"], "Doing");

        let frame = ServerEvent::DataUpdated(Board::default()).to_frame().unwrap();
        let parsed: ServerEvent = serde_json::from_str(&frame).unwrap();
        match parsed {
            ServerEvent::DataUpdated(board) => {
                assert_eq!(board.column(ColumnId::Done).unwrap().tasks.len(), 0)
            }
            other => panic!("Expected DataUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_keepalive_constants() {
        assert!(PONG_TIMEOUT > PING_INTERVAL);
        assert_eq!(PING_INTERVAL, Duration::from_secs(30));
        assert_eq!(PONG_TIMEOUT, Duration::from_secs(60));
    }
}
