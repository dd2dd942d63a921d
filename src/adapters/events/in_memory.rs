//! In-memory event bus implementation.
//!
//! Delivers envelopes synchronously to every registered handler in the
//! same process. Used for unit tests (deterministic, capturable) and for
//! single-process deployments where cross-process fan-out is not needed.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned; acceptable here because
//! nothing holds a lock across a panic-prone operation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::board::EventEnvelope;
use crate::domain::foundation::BoardId;
use crate::ports::{BoardEventHandler, BusError, EventPublisher, EventSubscriber};

/// In-memory event bus: every published envelope reaches every handler.
pub struct InMemoryEventBus {
    handlers: RwLock<Vec<Arc<dyn BoardEventHandler>>>,
    published: RwLock<Vec<(BoardId, EventEnvelope)>>,
}

impl InMemoryEventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    // === Test helpers ===

    /// Returns every published `(board, envelope)` pair, in publish order.
    pub fn published_events(&self) -> Vec<(BoardId, EventEnvelope)> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Returns the envelopes published for one board.
    pub fn events_for_board(&self, board_id: &BoardId) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|(board, _)| board == board_id)
            .map(|(_, envelope)| envelope)
            .collect()
    }

    /// Returns count of published envelopes.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    /// Checks whether an event with the given wire name was published.
    pub fn has_event(&self, name: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|(_, envelope)| envelope.event.name() == name)
    }

    /// Clears captured events (for test isolation).
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, board_id: &BoardId, envelope: EventEnvelope) -> Result<(), BusError> {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .push((*board_id, envelope.clone()));

        // Clone handlers so the lock is released before any await point.
        let handlers: Vec<Arc<dyn BoardEventHandler>> = self
            .handlers
            .read()
            .expect("InMemoryEventBus: handlers lock poisoned")
            .clone();

        for handler in handlers {
            handler.handle(*board_id, envelope.clone()).await;
        }

        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventBus {
    async fn subscribe(&self, handler: Arc<dyn BoardEventHandler>) -> Result<(), BusError> {
        self.handlers
            .write()
            .expect("InMemoryEventBus: handlers write lock poisoned")
            .push(handler);
        Ok(())
    }
}
