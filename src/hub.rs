//! Single-writer board actor.
//!
//! One task owns the [`Board`], the persistence handle and the subscriber
//! registry. Connections talk to it through a cloneable [`BoardHub`] handle
//! that sends commands over an mpsc queue, so requests are applied strictly
//! one at a time, each as mutate → persist → broadcast.
//!
//! ```text
//!  ws connection ─┐                 ┌──────────── BoardActor ────────────┐
//!  ws connection ─┼─ Command queue ─>  Board ── save ──> BoardPersistence  │
//!  /api/board ────┘                 │    └── broadcast ──> subscribers    │
//!                                   └────────────────────────────────────┘
//! ```
//!
//! A connect command is handled between two mutations, so the snapshot it
//! returns and the update stream it subscribes to line up exactly: the client
//! sees every later mutation once and no earlier one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

use crate::board::{Board, ColumnId, TaskIdGenerator};
use crate::errors::HubError;
use crate::persistence::BoardPersistence;
use crate::ws::{ClientEvent, DeleteRequest, DragRequest, ServerEvent};

pub type ConnectionId = u64;

const COMMAND_QUEUE_DEPTH: usize = 256;

/// Why a request left the board untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingDestination,
    UnchangedPosition,
    UnknownColumn,
    TaskNotFound,
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The board changed, was saved and broadcast.
    Applied,
    Ignored(IgnoreReason),
}

/// A registered connection: its initial snapshot and its update stream.
///
/// Frames on `updates` are serialized `data-updated` events.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub initial: Board,
    pub updates: mpsc::UnboundedReceiver<Arc<str>>,
}

enum Command {
    Connect {
        reply: oneshot::Sender<Subscription>,
    },
    Disconnect {
        id: ConnectionId,
    },
    Apply {
        event: ClientEvent,
        reply: oneshot::Sender<Outcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Board>,
    },
}

/// Handle to the board actor. The actor stops once every handle is dropped.
#[derive(Clone)]
pub struct BoardHub {
    commands: mpsc::Sender<Command>,
}

impl BoardHub {
    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(board: Board, persistence: Arc<dyn BoardPersistence>) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let actor = BoardActor {
            board,
            persistence,
            ids: TaskIdGenerator::default(),
            subscribers: HashMap::new(),
            next_connection: 1,
        };
        tokio::spawn(actor.run(rx));
        Self { commands }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn connect(&self) -> Result<Subscription, HubError> {
        self.request(|reply| Command::Connect { reply }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        let _ = self.commands.send(Command::Disconnect { id }).await;
    }

    /// Apply one client request. Resolves after the save and broadcast.
    pub async fn apply(&self, event: ClientEvent) -> Result<Outcome, HubError> {
        self.request(|reply| Command::Apply { event, reply }).await
    }

    pub async fn snapshot(&self) -> Result<Board, HubError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}

struct BoardActor {
    board: Board,
    persistence: Arc<dyn BoardPersistence>,
    ids: TaskIdGenerator,
    subscribers: HashMap<ConnectionId, mpsc::UnboundedSender<Arc<str>>>,
    next_connection: ConnectionId,
}

impl BoardActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Connect { reply } => {
                    let subscription = self.subscribe();
                    if let Err(subscription) = reply.send(subscription) {
                        self.subscribers.remove(&subscription.id);
                    }
                }
                Command::Disconnect { id } => {
                    if self.subscribers.remove(&id).is_some() {
                        tracing::debug!(connection = id, clients = self.subscribers.len(), "unsubscribed");
                    }
                }
                Command::Apply { event, reply } => {
                    let outcome = self.apply(event).await;
                    let _ = reply.send(outcome);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.board.snapshot());
                }
            }
        }
        tracing::debug!("board hub stopped");
    }

    fn subscribe(&mut self) -> Subscription {
        let id = self.next_connection;
        self.next_connection += 1;
        let (tx, updates) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        tracing::debug!(connection = id, clients = self.subscribers.len(), "subscribed");
        Subscription {
            id,
            initial: self.board.snapshot(),
            updates,
        }
    }

    async fn apply(&mut self, event: ClientEvent) -> Outcome {
        let outcome = match event {
            ClientEvent::TaskDragged(drag) => self.move_task(drag),
            ClientEvent::AddTask(draft) => match self.board.add_task(draft, &mut self.ids, Utc::now()) {
                Some(task) => {
                    tracing::info!(task_id = %task.id, priority = task.priority.as_str(), "task added");
                    Outcome::Applied
                }
                None => Outcome::Ignored(IgnoreReason::EmptyContent),
            },
            ClientEvent::DeleteTask(delete) => self.delete_task(delete),
        };

        match outcome {
            Outcome::Applied => {
                self.persist().await;
                self.broadcast();
            }
            Outcome::Ignored(reason) => tracing::debug!(?reason, "request ignored"),
        }
        outcome
    }

    fn move_task(&mut self, drag: DragRequest) -> Outcome {
        let Some(destination) = drag.destination else {
            return Outcome::Ignored(IgnoreReason::MissingDestination);
        };
        let (Ok(source), Ok(dest)) = (
            drag.source.droppable_id.parse::<ColumnId>(),
            destination.droppable_id.parse::<ColumnId>(),
        ) else {
            return Outcome::Ignored(IgnoreReason::UnknownColumn);
        };
        let Some(current) = self.board.position(source, &drag.task_id) else {
            return Outcome::Ignored(IgnoreReason::TaskNotFound);
        };
        if source == dest {
            // A past-the-end index lands the task in the last slot.
            let len = self.board.column(source).map_or(0, |c| c.tasks.len());
            if current == destination.index.min(len.saturating_sub(1)) {
                return Outcome::Ignored(IgnoreReason::UnchangedPosition);
            }
        }
        if !self
            .board
            .move_task(source, dest, destination.index, &drag.task_id)
        {
            return Outcome::Ignored(IgnoreReason::TaskNotFound);
        }
        tracing::info!(
            task_id = %drag.task_id,
            from = %source,
            to = %dest,
            index = destination.index,
            "task moved"
        );
        Outcome::Applied
    }

    fn delete_task(&mut self, delete: DeleteRequest) -> Outcome {
        let Ok(column) = delete.column_id.parse::<ColumnId>() else {
            return Outcome::Ignored(IgnoreReason::UnknownColumn);
        };
        if !self.board.delete_task(column, &delete.task_id) {
            return Outcome::Ignored(IgnoreReason::TaskNotFound);
        }
        tracing::info!(task_id = %delete.task_id, column = %column, "task deleted");
        Outcome::Applied
    }

    async fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.board).await {
            tracing::error!(error = %e, "failed to save board; keeping in-memory state");
        }
    }

    /// Send the current board to every subscriber, pruning closed ones.
    fn broadcast(&mut self) {
        let frame: Arc<str> = match ServerEvent::DataUpdated(self.board.snapshot()).to_frame() {
            Ok(frame) => frame.into(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize board update");
                return;
            }
        };
        self.subscribers.retain(|id, tx| {
            let alive = tx.send(Arc::clone(&frame)).is_ok();
            if !alive {
                tracing::debug!(connection = *id, "dropping closed subscriber");
            }
            alive
        });
        tracing::debug!(clients = self.subscribers.len(), "board update broadcast");
    }
}
