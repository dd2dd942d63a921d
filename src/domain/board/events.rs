//! The board event vocabulary.
//!
//! Every live update that reaches a client is one of the variants below.
//! The vocabulary is a closed, adjacently-tagged enum so the gateway and
//! any Rust client dispatch exhaustively; adding an event type is a
//! compile-checked change, not a new string key.
//!
//! Wire form (also the form published on the bus):
//!
//! ```json
//! { "type": "task:moved", "data": { ... }, "timestamp": "2024-01-15T10:30:00.000Z" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ColumnId, CommentId, ConnectionId, TaskId, Timestamp, UserId,
};

// ============================================
// Event Enum
// ============================================

/// A board-scoped live update.
///
/// Serialized with `type` + `data` keys matching the event names clients
/// subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    #[serde(rename = "task:moved")]
    TaskMoved(TaskMoved),

    #[serde(rename = "task:created")]
    TaskCreated(TaskCreated),

    #[serde(rename = "task:updated")]
    TaskUpdated(TaskUpdated),

    #[serde(rename = "task:deleted")]
    TaskDeleted(TaskDeleted),

    #[serde(rename = "comment:added")]
    CommentAdded(CommentAdded),

    #[serde(rename = "comment:updated")]
    CommentUpdated(CommentUpdated),

    #[serde(rename = "comment:deleted")]
    CommentDeleted(CommentDeleted),

    #[serde(rename = "user:joined")]
    UserJoined(UserPresence),

    #[serde(rename = "user:left")]
    UserLeft(UserPresence),
}

impl BoardEvent {
    /// Returns the wire name of this event, for logging and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::TaskMoved(_) => "task:moved",
            BoardEvent::TaskCreated(_) => "task:created",
            BoardEvent::TaskUpdated(_) => "task:updated",
            BoardEvent::TaskDeleted(_) => "task:deleted",
            BoardEvent::CommentAdded(_) => "comment:added",
            BoardEvent::CommentUpdated(_) => "comment:updated",
            BoardEvent::CommentDeleted(_) => "comment:deleted",
            BoardEvent::UserJoined(_) => "user:joined",
            BoardEvent::UserLeft(_) => "user:left",
        }
    }

    /// Returns true for events that change board structure.
    ///
    /// Clients re-fetch full board state on these rather than patching
    /// local caches.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BoardEvent::TaskMoved(_) | BoardEvent::TaskCreated(_) | BoardEvent::TaskDeleted(_)
        )
    }
}

// ============================================
// Payloads
// ============================================

/// Priority level carried on task snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Snapshot of a task as clients render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assignee_id: Option<UserId>,
    pub column_id: ColumnId,
    pub position: i32,
}

/// Snapshot of a comment as clients render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnapshot {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMoved {
    pub task: TaskSnapshot,
    pub old_column_id: ColumnId,
    pub new_column_id: ColumnId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub task: TaskSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdated {
    pub task: TaskSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeleted {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAdded {
    pub comment: CommentSnapshot,
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdated {
    pub comment: CommentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDeleted {
    pub comment_id: CommentId,
}

/// Payload shared by `user:joined` and `user:left`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

// ============================================
// Envelope
// ============================================

/// Transport wrapper for a board event.
///
/// This is the exact JSON published on the bus. `origin` identifies the
/// connection whose action produced a presence event; the gateway uses it
/// to suppress the echo back to that connection and strips it before the
/// frame reaches any client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: BoardEvent,

    /// When the event occurred, RFC-3339.
    pub timestamp: Timestamp,

    /// Originating connection, for presence echo suppression.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub origin: Option<ConnectionId>,
}

impl EventEnvelope {
    /// Wraps an event, stamped with the current time.
    pub fn new(event: BoardEvent) -> Self {
        Self {
            event,
            timestamp: Timestamp::now(),
            origin: None,
        }
    }

    /// Marks the envelope as originating from a specific connection.
    pub fn with_origin(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }
}
