//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the collaboration core to external systems:
//! - `auth` - token verification (JWT, mock)
//! - `events` - event bus (in-memory, Redis pub/sub)
//! - `postgres` - transactional board store over sqlx
//! - `storage` - in-memory board store for tests
//! - `websocket` - connection gateway, rooms, and the wire protocol

pub mod auth;
pub mod events;
pub mod postgres;
pub mod storage;
pub mod websocket;
