//! Application layer - services orchestrating domain logic over ports.
//!
//! - `ordering` - transactional position maintenance for columns and tasks
//! - `broadcast` - the event publish surface used by mutation handlers

mod broadcast;
mod ordering;

pub use broadcast::Broadcaster;
pub use ordering::{OrderingEngine, OrderingError, RemovedTask, TaskMove};
