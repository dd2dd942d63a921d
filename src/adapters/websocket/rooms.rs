//! Room registry for board-scoped message routing.
//!
//! Rooms are organized by board id, so a broadcast reaches exactly the
//! connections viewing that board on this process:
//!
//! ```text
//! Room: board-123      Room: board-456
//! ├── conn-a           ├── conn-d
//! ├── conn-b           └── conn-e
//! └── conn-c
//! ```
//!
//! The registry is process-local and ephemeral; it is rebuilt as
//! connections join after a restart. A connection belongs to at most one
//! room: joining a new board atomically removes it from the previous one
//! and hands back a fresh [`RoomMembership`], so a stale room can never
//! receive traffic for a connection that moved on.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use crate::domain::board::EventEnvelope;
use crate::domain::foundation::{BoardId, ConnectionId, UserId};

/// A connection's live membership in one board room.
///
/// Returned by [`RoomRegistry::join`]; the previous membership's receiver
/// goes dead when the connection joins elsewhere, so holders should drop
/// the old handle on replacement.
pub struct RoomMembership {
    pub board_id: BoardId,
    pub receiver: broadcast::Receiver<EventEnvelope>,
}

/// Result of joining a room.
pub struct JoinOutcome {
    pub membership: RoomMembership,

    /// Other local members at join time, for presence bookkeeping.
    pub others: Vec<(ConnectionId, UserId)>,

    /// Board implicitly left because the connection was in another room.
    pub left: Option<BoardId>,
}

struct Room {
    sender: broadcast::Sender<EventEnvelope>,
    members: HashMap<ConnectionId, UserId>,
}

#[derive(Default)]
struct Registry {
    rooms: HashMap<BoardId, Room>,
    connections: HashMap<ConnectionId, BoardId>,
}

impl Registry {
    /// Removes a connection from its current room, dropping the room if
    /// it becomes empty. Returns what was left behind.
    fn detach(&mut self, connection_id: &ConnectionId) -> Option<(BoardId, UserId)> {
        let board_id = self.connections.remove(connection_id)?;
        let room = self.rooms.get_mut(&board_id)?;
        let user_id = room.members.remove(connection_id)?;
        if room.members.is_empty() {
            self.rooms.remove(&board_id);
        }
        Some((board_id, user_id))
    }
}

/// Process-local map of board rooms and their connections.
///
/// Guarded by a single `RwLock`: joins and leaves are writes, broadcasts
/// and lookups are reads, so concurrent fan-out to different rooms never
/// contends.
pub struct RoomRegistry {
    inner: RwLock<Registry>,
    channel_capacity: usize,
}

impl RoomRegistry {
    /// Creates a registry with the given per-room broadcast capacity.
    ///
    /// A slow connection that falls more than `channel_capacity` events
    /// behind starts losing the oldest ones; it reconciles on its next
    /// full fetch.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            channel_capacity,
        }
    }

    /// Creates a registry with the default capacity (128 events).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Joins a connection to a board room, leaving any previous room.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        board_id: BoardId,
    ) -> JoinOutcome {
        let mut inner = self.inner.write().await;

        let left = inner
            .detach(&connection_id)
            .map(|(previous_board, _)| previous_board)
            .filter(|previous_board| *previous_board != board_id);

        let capacity = self.channel_capacity;
        let room = inner.rooms.entry(board_id).or_insert_with(|| {
            let (sender, _) = broadcast::channel(capacity);
            Room {
                sender,
                members: HashMap::new(),
            }
        });

        let others: Vec<(ConnectionId, UserId)> = room
            .members
            .iter()
            .map(|(id, user)| (*id, user.clone()))
            .collect();

        room.members.insert(connection_id, user_id);
        let receiver = room.sender.subscribe();
        inner.connections.insert(connection_id, board_id);

        JoinOutcome {
            membership: RoomMembership { board_id, receiver },
            others,
            left,
        }
    }

    /// Removes a connection from a specific room.
    ///
    /// No-op returning `None` if the connection is not a member of that
    /// board's room.
    pub async fn leave(
        &self,
        connection_id: &ConnectionId,
        board_id: &BoardId,
    ) -> Option<UserId> {
        let mut inner = self.inner.write().await;
        if inner.connections.get(connection_id) != Some(board_id) {
            return None;
        }
        inner.detach(connection_id).map(|(_, user_id)| user_id)
    }

    /// Removes a connection from whatever room it is in (disconnect
    /// cleanup). Returns the vacated room, if any.
    pub async fn leave_all(&self, connection_id: &ConnectionId) -> Option<(BoardId, UserId)> {
        self.inner.write().await.detach(connection_id)
    }

    /// Returns the local members of a board's room.
    pub async fn members_of(&self, board_id: &BoardId) -> Vec<(ConnectionId, UserId)> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(board_id)
            .map(|room| {
                room.members
                    .iter()
                    .map(|(id, user)| (*id, user.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Broadcasts an envelope to every local member of a board's room.
    ///
    /// No-op if the room does not exist on this process.
    pub async fn broadcast(&self, board_id: &BoardId, envelope: EventEnvelope) {
        let inner = self.inner.read().await;
        if let Some(room) = inner.rooms.get(board_id) {
            // A send error just means no live receivers.
            let _ = room.sender.send(envelope);
        }
    }

    /// Count of local members in a board's room.
    pub async fn member_count(&self, board_id: &BoardId) -> usize {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(board_id)
            .map(|room| room.members.len())
            .unwrap_or(0)
    }

    /// Boards with at least one local member.
    pub async fn active_rooms(&self) -> Vec<BoardId> {
        self.inner.read().await.rooms.keys().copied().collect()
    }

    /// Total connections currently in any room.
    pub async fn total_connections(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
