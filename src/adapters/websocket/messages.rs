//! WebSocket message protocol.
//!
//! Every frame in both directions is JSON with a `type` field.
//!
//! Client → Server: `join:board`, `leave:board`, `ping`.
//! Server → Client: `connected`, `pong`, `error`, plus the board event
//! vocabulary (`task:moved`, `user:joined`, ...) rendered by
//! [`EventFrame`].

use serde::{Deserialize, Serialize};

use crate::domain::board::{BoardEvent, EventEnvelope};
use crate::domain::foundation::{BoardId, ConnectionId, UserId};

// ============================================
// Client → Server
// ============================================

/// Commands a connected client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a board's room, implicitly leaving any previous one.
    #[serde(rename = "join:board")]
    JoinBoard {
        #[serde(rename = "boardId")]
        board_id: BoardId,
    },

    /// Leave a board's room.
    #[serde(rename = "leave:board")]
    LeaveBoard {
        #[serde(rename = "boardId")]
        board_id: BoardId,
    },

    /// Application-level heartbeat; answered with `pong`.
    #[serde(rename = "ping")]
    Ping,
}

// ============================================
// Server → Client
// ============================================

/// Control frames the server sends outside the event vocabulary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Connected(ConnectedFrame),
    Pong(PongFrame),
    Error(ErrorFrame),
}

/// Sent once, immediately after a successful handshake.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedFrame {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongFrame {
    pub timestamp: String,
}

/// Reported when a client command cannot be processed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// A board event as delivered to a client.
///
/// Serializes to `{"type": "<event name>", "data": {...}, "timestamp":
/// "..."}`. The envelope's internal `origin` marker is dropped here; it
/// never reaches clients.
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame {
    #[serde(flatten)]
    pub event: BoardEvent,
    pub timestamp: String,
}

impl EventFrame {
    /// Builds the client-facing frame from a bus envelope.
    pub fn from_envelope(envelope: EventEnvelope) -> Self {
        Self {
            timestamp: envelope.timestamp.to_rfc3339(),
            event: envelope.event,
        }
    }
}
