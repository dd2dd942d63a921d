//! PostgreSQL adapters.
//!
//! - `PgBoardStore` - transactional board structure access over sqlx

mod board_store;

pub use board_store::PgBoardStore;
