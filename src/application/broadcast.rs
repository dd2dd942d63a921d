//! Broadcaster - the publish surface mutation handlers call.
//!
//! After a handler commits a change it hands the resulting event here.
//! The broadcaster stamps the envelope and publishes it; a bus failure is
//! logged and swallowed, never propagated, because the committed store
//! row is the source of truth and clients reconcile on their next full
//! fetch.

use std::sync::Arc;

use crate::domain::board::{BoardEvent, EventEnvelope};
use crate::domain::foundation::{BoardId, ConnectionId};
use crate::ports::EventPublisher;

/// Publishes board events without surfacing transport failures.
#[derive(Clone)]
pub struct Broadcaster {
    bus: Arc<dyn EventPublisher>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given bus.
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self { bus }
    }

    /// Publishes an event for a board, stamped with the current time.
    pub async fn publish(&self, board_id: &BoardId, event: BoardEvent) {
        self.send(board_id, EventEnvelope::new(event)).await;
    }

    /// Publishes an event that originated from a specific connection.
    ///
    /// The gateway uses this for presence so the originating connection
    /// never receives its own join/leave echo.
    pub async fn publish_from(
        &self,
        board_id: &BoardId,
        event: BoardEvent,
        origin: ConnectionId,
    ) {
        self.send(board_id, EventEnvelope::new(event).with_origin(origin))
            .await;
    }

    async fn send(&self, board_id: &BoardId, envelope: EventEnvelope) {
        let event_name = envelope.event.name();
        if let Err(err) = self.bus.publish(board_id, envelope).await {
            tracing::warn!(
                board_id = %board_id,
                event = event_name,
                "Dropping event after publish failure: {}",
                err
            );
        }
    }
}
