//! BoardStore port - transactional access to board structure rows.
//!
//! The ordering engine never touches task titles, descriptions, or any
//! other content column; it reads and writes identity, containment and
//! position only. Every engine operation runs inside one store
//! transaction so a reader can never observe a partially-shifted state.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::board::positions::Shift;
use crate::domain::foundation::{BoardId, ColumnId, TaskId};

/// Errors from the transactional store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The transaction lost a serialization conflict with a concurrent
    /// one. The caller should retry with fresh state.
    #[error("Transaction conflict")]
    Conflict,

    /// Any other backend failure.
    #[error("Store error: {0}")]
    Backend(String),
}

/// Where a task currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPlacement {
    pub column_id: ColumnId,
    pub board_id: BoardId,
    pub position: i32,
}

/// Port for opening a transaction over board structure.
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Begins a transaction with at least serializable isolation for the
    /// position columns it touches.
    async fn begin(&self) -> Result<Box<dyn BoardTx>, StoreError>;
}

/// One open transaction.
///
/// Dropping a transaction without calling [`BoardTx::commit`] rolls it
/// back; nothing staged becomes visible.
#[async_trait]
pub trait BoardTx: Send {
    /// Looks up a task's column, board and position.
    async fn task_placement(&mut self, task: &TaskId) -> Result<Option<TaskPlacement>, StoreError>;

    /// Looks up the board a column belongs to.
    async fn column_board(&mut self, column: &ColumnId) -> Result<Option<BoardId>, StoreError>;

    /// Counts the tasks currently in a column.
    async fn task_count(&mut self, column: &ColumnId) -> Result<usize, StoreError>;

    /// Adds `shift.delta` to every task in the column whose position lies
    /// in `[shift.lo, shift.hi]`.
    async fn shift_tasks(&mut self, column: &ColumnId, shift: Shift) -> Result<(), StoreError>;

    /// Assigns a task to a column at a position.
    async fn place_task(
        &mut self,
        task: &TaskId,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError>;

    /// Deletes a task row.
    async fn delete_task(&mut self, task: &TaskId) -> Result<(), StoreError>;

    /// Returns a column's tasks ordered by position.
    async fn tasks_by_position(
        &mut self,
        column: &ColumnId,
    ) -> Result<Vec<(TaskId, i32)>, StoreError>;

    /// Sets one task's position.
    async fn set_task_position(&mut self, task: &TaskId, position: i32) -> Result<(), StoreError>;

    /// Returns a board's columns ordered by position.
    async fn columns_by_position(
        &mut self,
        board: &BoardId,
    ) -> Result<Vec<(ColumnId, i32)>, StoreError>;

    /// Sets one column's position.
    async fn set_column_position(
        &mut self,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError>;

    /// Deletes a column row; its tasks go with it.
    async fn delete_column(&mut self, column: &ColumnId) -> Result<(), StoreError>;

    /// Commits everything staged in this transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_store_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn BoardStore) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn BoardStore>>();
    }
}
