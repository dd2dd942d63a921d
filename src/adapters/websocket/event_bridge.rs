//! Event bridge connecting the bus to WebSocket clients.
//!
//! One bridge per process, registered with the event bus at startup.
//! Every envelope the bus delivers - whether published locally or by
//! another server process - is forwarded to the room registry, which
//! fans it out to this process's connections in the board's room.
//!
//! ```text
//! publish on any process
//!          │
//!          ▼
//!     Event Bus (board:{id} channel)
//!          │ delivered on every process
//!          ▼
//!   RoomEventBridge ── RoomRegistry.broadcast ──▶ local connections
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::board::EventEnvelope;
use crate::domain::foundation::BoardId;
use crate::ports::{BoardEventHandler, BusError, EventSubscriber};

use super::rooms::RoomRegistry;

/// Routes bus envelopes into local board rooms.
pub struct RoomEventBridge {
    rooms: Arc<RoomRegistry>,
}

impl RoomEventBridge {
    /// Creates a bridge over the given registry.
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self { rooms }
    }

    /// Creates the bridge as an `Arc`, ready to register with a bus.
    pub fn new_shared(rooms: Arc<RoomRegistry>) -> Arc<Self> {
        Arc::new(Self::new(rooms))
    }

    /// Registers this bridge as the process-wide bus handler.
    pub async fn register(self: &Arc<Self>, bus: &dyn EventSubscriber) -> Result<(), BusError> {
        bus.subscribe(self.clone()).await
    }
}

#[async_trait]
impl BoardEventHandler for RoomEventBridge {
    async fn handle(&self, board_id: BoardId, envelope: EventEnvelope) {
        self.rooms.broadcast(&board_id, envelope).await;
    }

    fn name(&self) -> &'static str {
        "RoomEventBridge"
    }
}
