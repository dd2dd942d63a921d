//! Board domain - event vocabulary, roles, and position arithmetic.

pub mod events;
pub mod positions;
mod role;

pub use events::{
    BoardEvent, CommentAdded, CommentDeleted, CommentSnapshot, CommentUpdated, EventEnvelope,
    Priority, TaskCreated, TaskDeleted, TaskMoved, TaskSnapshot, TaskUpdated, UserPresence,
};
pub use role::{Permission, Role};
