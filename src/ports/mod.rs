//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the collaboration core and the outside world. Adapters implement them
//! for concrete infrastructure (Postgres, Redis, JWT) or for tests
//! (in-memory).

mod board_store;
mod event_bus;
mod token_verifier;

pub use board_store::{BoardStore, BoardTx, StoreError, TaskPlacement};
pub use event_bus::{
    board_channel, parse_board_channel, BoardEventHandler, BusError, EventBus, EventPublisher,
    EventSubscriber, BOARD_CHANNEL_PATTERN,
};
pub use token_verifier::TokenVerifier;
