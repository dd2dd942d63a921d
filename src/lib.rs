//! Taskboard - real-time collaboration engine for multi-user Kanban boards.
//!
//! The crate combines a WebSocket connection gateway, board-scoped rooms
//! with presence, a cross-process event bus, and a transactional ordering
//! engine that keeps column/task positions dense under concurrent edits.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
