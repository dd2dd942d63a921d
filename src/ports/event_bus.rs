//! Event bus ports - cross-process fan-out of board events.
//!
//! Any server process can publish an event for a board; every process that
//! subscribed receives it and forwards it to its locally-connected
//! clients. Channels are keyed by board id so delivery is scoped to one
//! board.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::board::EventEnvelope;
use crate::domain::foundation::BoardId;

/// Errors from the bus transport.
///
/// These never roll back a committed mutation; callers log and move on.
#[derive(Debug, Error)]
pub enum BusError {
    /// The underlying transport is unreachable.
    #[error("Bus connection error: {0}")]
    Connection(String),

    /// The envelope could not be encoded or decoded.
    #[error("Event encoding error: {0}")]
    Encoding(String),

    /// The bus has been shut down and no longer accepts work.
    #[error("Bus is shut down")]
    ShutDown,
}

/// Receives every event delivered to this process.
///
/// Registered once per process via [`EventSubscriber::subscribe`]; the
/// gateway's bridge implements this to route envelopes into local rooms.
#[async_trait]
pub trait BoardEventHandler: Send + Sync {
    /// Processes one delivered envelope. Must not block the bus reader
    /// for long; delivery to slow clients is the room layer's problem.
    async fn handle(&self, board_id: BoardId, envelope: EventEnvelope);

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for publishing board events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an envelope to the board's channel.
    ///
    /// Best-effort: returns once the envelope is handed to the transport,
    /// not once any subscriber has seen it.
    async fn publish(&self, board_id: &BoardId, envelope: EventEnvelope) -> Result<(), BusError>;
}

/// Port for receiving board events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Registers the process-wide handler.
    ///
    /// A process subscribes once, to all board channels; the adapter
    /// extracts the board id from the channel name on receipt.
    async fn subscribe(&self, handler: Arc<dyn BoardEventHandler>) -> Result<(), BusError>;
}

/// Combined trait for full bus implementations.
pub trait EventBus: EventPublisher + EventSubscriber {}

impl<T: EventPublisher + EventSubscriber> EventBus for T {}

/// Channel name for a board's events.
pub fn board_channel(board_id: &BoardId) -> String {
    format!("board:{}", board_id)
}

/// Pattern matching every board channel.
pub const BOARD_CHANNEL_PATTERN: &str = "board:*";

/// Extracts the board id from a channel name, if it is a board channel.
pub fn parse_board_channel(channel: &str) -> Option<BoardId> {
    channel.strip_prefix("board:")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_channel_round_trips() {
        let board_id = BoardId::new();
        let channel = board_channel(&board_id);
        assert_eq!(parse_board_channel(&channel), Some(board_id));
    }

    #[test]
    fn parse_rejects_foreign_channels() {
        assert!(parse_board_channel("session:abc").is_none());
        assert!(parse_board_channel("board:not-a-uuid").is_none());
        assert!(parse_board_channel("board:").is_none());
    }

    #[test]
    fn bus_traits_are_object_safe_and_send_sync() {
        fn _assert_publisher(_: &dyn EventPublisher) {}
        fn _assert_subscriber(_: &dyn EventSubscriber) {}
        fn _assert_handler(_: &dyn BoardEventHandler) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<Arc<dyn EventPublisher>>();
        _assert_arc_send_sync::<Arc<dyn BoardEventHandler>>();
    }
}
