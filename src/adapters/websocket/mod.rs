//! WebSocket adapters for real-time board collaboration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Event Bus                             │
//! │    InMemoryEventBus (tests) │ RedisEventBus (production)    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ delivers on every process
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RoomEventBridge                          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ broadcasts
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RoomRegistry                            │
//! │    Room: board-123      Room: board-456                      │
//! │    ├── conn-a           ├── conn-d                           │
//! │    └── conn-b           └── conn-e                           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ per-connection forward
//!                               ▼
//!                     connected WebSocket clients
//! ```
//!
//! # Components
//!
//! - [`messages`] - the JSON frame protocol in both directions
//! - [`rooms`] - board-scoped membership and local fan-out
//! - [`handler`] - upgrade handling and the per-connection loop
//! - [`event_bridge`] - bus-to-room forwarding

pub mod event_bridge;
pub mod handler;
pub mod messages;
pub mod rooms;

pub use event_bridge::RoomEventBridge;
pub use handler::{gateway_router, ws_handler, GatewayState};
pub use messages::{
    ClientMessage, ConnectedFrame, ControlFrame, ErrorFrame, EventFrame, PongFrame,
};
pub use rooms::{JoinOutcome, RoomMembership, RoomRegistry};
