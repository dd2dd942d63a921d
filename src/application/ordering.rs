//! Ordering engine - transactional maintenance of dense positions.
//!
//! Columns within a board and tasks within a column carry integer
//! positions forming an unbroken `0..N-1` sequence. Every operation here
//! runs inside a single store transaction: the moved row and all shifted
//! siblings become visible together or not at all. Two concurrent moves
//! in the same column are serialized by the store's transaction
//! isolation, not by application locks.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::board::positions::{
    clamp_insert, clamp_move, close_gap, compaction_changes, is_contiguous_permutation,
    open_slot, same_column_shift,
};
use crate::domain::foundation::{BoardId, ColumnId, TaskId};
use crate::ports::{BoardStore, StoreError};

/// Errors from ordering operations.
///
/// All of them abort the transaction; no partial shift is ever committed.
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Column not found: {0}")]
    ColumnNotFound(ColumnId),

    #[error("Column {column} belongs to board {actual}, expected {expected}")]
    BoardMismatch {
        column: ColumnId,
        expected: BoardId,
        actual: BoardId,
    },

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    /// A concurrent structural change won the transaction race; retry
    /// with fresh state.
    #[error("Conflicting concurrent update")]
    Conflict,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OrderingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => OrderingError::Conflict,
            other => OrderingError::Store(other),
        }
    }
}

/// Result of a committed task move, for event payload construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMove {
    pub task_id: TaskId,
    pub board_id: BoardId,
    pub from_column: ColumnId,
    pub to_column: ColumnId,
    pub from_position: i32,
    pub to_position: i32,
}

/// Result of a committed task removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedTask {
    pub task_id: TaskId,
    pub column_id: ColumnId,
    pub board_id: BoardId,
}

/// Computes and applies position changes for board mutations.
#[derive(Clone)]
pub struct OrderingEngine {
    store: Arc<dyn BoardStore>,
}

impl OrderingEngine {
    /// Creates an engine over the given transactional store.
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }

    /// Moves a task to `dest_column` at `position`.
    ///
    /// The requested position is clamped: within the current column the
    /// highest reachable slot is `count - 1`; into another column it is
    /// `count` (append). Siblings shift by one to close the vacated gap
    /// and open the target slot.
    pub async fn move_task(
        &self,
        task_id: &TaskId,
        dest_column: &ColumnId,
        position: i32,
    ) -> Result<TaskMove, OrderingError> {
        let mut tx = self.store.begin().await?;

        let placement = tx
            .task_placement(task_id)
            .await?
            .ok_or(OrderingError::TaskNotFound(*task_id))?;

        let dest_board = tx
            .column_board(dest_column)
            .await?
            .ok_or(OrderingError::ColumnNotFound(*dest_column))?;

        if dest_board != placement.board_id {
            return Err(OrderingError::BoardMismatch {
                column: *dest_column,
                expected: placement.board_id,
                actual: dest_board,
            });
        }

        let to_position = if placement.column_id == *dest_column {
            let len = tx.task_count(dest_column).await?;
            let to = clamp_move(position, len);
            if let Some(shift) = same_column_shift(placement.position, to) {
                tx.shift_tasks(dest_column, shift).await?;
                tx.set_task_position(task_id, to).await?;
            }
            to
        } else {
            let dest_len = tx.task_count(dest_column).await?;
            let to = clamp_insert(position, dest_len);
            tx.shift_tasks(&placement.column_id, close_gap(placement.position))
                .await?;
            tx.shift_tasks(dest_column, open_slot(to)).await?;
            tx.place_task(task_id, dest_column, to).await?;
            to
        };

        tx.commit().await?;

        Ok(TaskMove {
            task_id: *task_id,
            board_id: placement.board_id,
            from_column: placement.column_id,
            to_column: *dest_column,
            from_position: placement.position,
            to_position,
        })
    }

    /// Deletes a task and compacts its column back to `0..N-1`.
    pub async fn remove_task(&self, task_id: &TaskId) -> Result<RemovedTask, OrderingError> {
        let mut tx = self.store.begin().await?;

        let placement = tx
            .task_placement(task_id)
            .await?
            .ok_or(OrderingError::TaskNotFound(*task_id))?;

        tx.delete_task(task_id).await?;

        let siblings = tx.tasks_by_position(&placement.column_id).await?;
        for (id, new_position) in compaction_changes(&siblings) {
            tx.set_task_position(&id, new_position).await?;
        }

        tx.commit().await?;

        Ok(RemovedTask {
            task_id: *task_id,
            column_id: placement.column_id,
            board_id: placement.board_id,
        })
    }

    /// Deletes a column (its tasks cascade) and compacts the board's
    /// remaining columns.
    pub async fn remove_column(&self, column_id: &ColumnId) -> Result<BoardId, OrderingError> {
        let mut tx = self.store.begin().await?;

        let board_id = tx
            .column_board(column_id)
            .await?
            .ok_or(OrderingError::ColumnNotFound(*column_id))?;

        tx.delete_column(column_id).await?;

        let columns = tx.columns_by_position(&board_id).await?;
        for (id, new_position) in compaction_changes(&columns) {
            tx.set_column_position(&id, new_position).await?;
        }

        tx.commit().await?;

        Ok(board_id)
    }

    /// Applies a full-board column reorder from explicit `(id, position)`
    /// pairs.
    ///
    /// Rejected wholesale, with no partial application, if any id does
    /// not belong to the board, if the pairs do not cover the board's
    /// columns exactly, or if the positions are not a permutation of
    /// `0..N-1`.
    pub async fn reorder_columns(
        &self,
        board_id: &BoardId,
        pairs: &[(ColumnId, i32)],
    ) -> Result<(), OrderingError> {
        let mut tx = self.store.begin().await?;

        let existing = tx.columns_by_position(board_id).await?;
        let existing_ids: HashSet<ColumnId> = existing.iter().map(|(id, _)| *id).collect();

        for (id, _) in pairs {
            if !existing_ids.contains(id) {
                return Err(OrderingError::InvalidReorder(format!(
                    "column {} does not belong to board {}",
                    id, board_id
                )));
            }
        }

        let submitted_ids: HashSet<ColumnId> = pairs.iter().map(|(id, _)| *id).collect();
        if submitted_ids.len() != pairs.len() || pairs.len() != existing.len() {
            return Err(OrderingError::InvalidReorder(format!(
                "reorder must list each of the board's {} columns exactly once",
                existing.len()
            )));
        }

        let positions: Vec<i32> = pairs.iter().map(|(_, position)| *position).collect();
        if !is_contiguous_permutation(&positions) {
            return Err(OrderingError::InvalidReorder(
                "positions must form a contiguous 0..N-1 sequence".to_string(),
            ));
        }

        for (id, position) in pairs {
            tx.set_column_position(id, *position).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Position a newly-created task should take in `column` (append).
    pub async fn next_task_position(&self, column: &ColumnId) -> Result<i32, OrderingError> {
        let mut tx = self.store.begin().await?;
        tx.column_board(column)
            .await?
            .ok_or(OrderingError::ColumnNotFound(*column))?;
        let count = tx.task_count(column).await?;
        tx.commit().await?;
        Ok(count as i32)
    }

    /// Position a newly-created column should take on `board` (append).
    pub async fn next_column_position(&self, board: &BoardId) -> Result<i32, OrderingError> {
        let mut tx = self.store.begin().await?;
        let count = tx.columns_by_position(board).await?.len();
        tx.commit().await?;
        Ok(count as i32)
    }

    /// Renumbers a column's tasks to `0..N-1`, preserving relative order.
    ///
    /// Idempotent; a second pass over a compact column writes nothing.
    pub async fn compact_column(&self, column: &ColumnId) -> Result<(), OrderingError> {
        let mut tx = self.store.begin().await?;
        tx.column_board(column)
            .await?
            .ok_or(OrderingError::ColumnNotFound(*column))?;
        let siblings = tx.tasks_by_position(column).await?;
        for (id, new_position) in compaction_changes(&siblings) {
            tx.set_task_position(&id, new_position).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Renumbers a board's columns to `0..N-1`, preserving relative order.
    pub async fn compact_board(&self, board: &BoardId) -> Result<(), OrderingError> {
        let mut tx = self.store.begin().await?;
        let columns = tx.columns_by_position(board).await?;
        for (id, new_position) in compaction_changes(&columns) {
            tx.set_column_position(&id, new_position).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryBoardStore;

    async fn seeded_column(
        store: &Arc<InMemoryBoardStore>,
        board: &BoardId,
        tasks: usize,
    ) -> (ColumnId, Vec<TaskId>) {
        let column = store.seed_column(board).await;
        let mut ids = Vec::new();
        for _ in 0..tasks {
            ids.push(store.seed_task(&column).await);
        }
        (column, ids)
    }

    fn engine(store: &Arc<InMemoryBoardStore>) -> OrderingEngine {
        OrderingEngine::new(store.clone() as Arc<dyn BoardStore>)
    }

    #[tokio::test]
    async fn move_within_column_to_front() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;
        let (a, b, c) = (tasks[0], tasks[1], tasks[2]);

        let result = engine(&store).move_task(&c, &column, 0).await.unwrap();

        assert_eq!(result.from_position, 2);
        assert_eq!(result.to_position, 0);
        assert_eq!(store.column_tasks(&column).await, vec![c, a, b]);
    }

    #[tokio::test]
    async fn move_within_column_downward() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;
        let (a, b, c) = (tasks[0], tasks[1], tasks[2]);

        engine(&store).move_task(&a, &column, 2).await.unwrap();

        assert_eq!(store.column_tasks(&column).await, vec![b, c, a]);
    }

    #[tokio::test]
    async fn move_to_same_position_changes_nothing() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;

        let result = engine(&store).move_task(&tasks[1], &column, 1).await.unwrap();

        assert_eq!(result.from_position, result.to_position);
        assert_eq!(store.column_tasks(&column).await, tasks);
    }

    #[tokio::test]
    async fn move_across_columns_closes_and_opens() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (source, source_tasks) = seeded_column(&store, &board, 2).await;
        let (dest, dest_tasks) = seeded_column(&store, &board, 1).await;
        let (a, b) = (source_tasks[0], source_tasks[1]);
        let x = dest_tasks[0];

        let result = engine(&store).move_task(&b, &dest, 1).await.unwrap();

        assert_eq!(result.from_column, source);
        assert_eq!(result.to_column, dest);
        assert_eq!(store.column_tasks(&source).await, vec![a]);
        assert_eq!(store.column_tasks(&dest).await, vec![x, b]);
    }

    #[tokio::test]
    async fn move_across_columns_into_middle_shifts_dest() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (source, source_tasks) = seeded_column(&store, &board, 1).await;
        let (dest, dest_tasks) = seeded_column(&store, &board, 2).await;

        engine(&store)
            .move_task(&source_tasks[0], &dest, 0)
            .await
            .unwrap();

        assert!(store.column_tasks(&source).await.is_empty());
        assert_eq!(
            store.column_tasks(&dest).await,
            vec![source_tasks[0], dest_tasks[0], dest_tasks[1]]
        );
    }

    #[tokio::test]
    async fn move_position_is_clamped() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;

        // Far past the end clamps to the last slot.
        let result = engine(&store).move_task(&tasks[0], &column, 99).await.unwrap();
        assert_eq!(result.to_position, 2);

        // Negative clamps to the front.
        let result = engine(&store).move_task(&tasks[0], &column, -5).await.unwrap();
        assert_eq!(result.to_position, 0);
    }

    #[tokio::test]
    async fn move_unknown_task_is_not_found() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, _) = seeded_column(&store, &board, 1).await;

        let err = engine(&store)
            .move_task(&TaskId::new(), &column, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn move_to_unknown_column_is_not_found() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (_, tasks) = seeded_column(&store, &board, 1).await;

        let err = engine(&store)
            .move_task(&tasks[0], &ColumnId::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::ColumnNotFound(_)));
    }

    #[tokio::test]
    async fn move_to_column_on_other_board_is_rejected_without_effect() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let other_board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 2).await;
        let (foreign, _) = seeded_column(&store, &other_board, 1).await;

        let err = engine(&store)
            .move_task(&tasks[0], &foreign, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::BoardMismatch { .. }));
        assert_eq!(store.column_tasks(&column).await, tasks);
    }

    #[tokio::test]
    async fn remove_task_compacts_column() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;

        let removed = engine(&store).remove_task(&tasks[1]).await.unwrap();

        assert_eq!(removed.column_id, column);
        assert_eq!(removed.board_id, board);
        assert_eq!(store.column_tasks(&column).await, vec![tasks[0], tasks[2]]);
        assert!(store.positions_contiguous(&column).await);
    }

    #[tokio::test]
    async fn remove_column_compacts_board() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let first = store.seed_column(&board).await;
        let second = store.seed_column(&board).await;
        let third = store.seed_column(&board).await;

        let returned_board = engine(&store).remove_column(&second).await.unwrap();

        assert_eq!(returned_board, board);
        assert_eq!(store.board_columns(&board).await, vec![first, third]);
    }

    #[tokio::test]
    async fn remove_column_deletes_its_tasks() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 2).await;

        engine(&store).remove_column(&column).await.unwrap();

        assert!(store.task_placement(&tasks[0]).await.is_none());
        assert!(store.task_placement(&tasks[1]).await.is_none());
    }

    #[tokio::test]
    async fn reorder_columns_applies_permutation() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let a = store.seed_column(&board).await;
        let b = store.seed_column(&board).await;
        let c = store.seed_column(&board).await;

        engine(&store)
            .reorder_columns(&board, &[(c, 0), (a, 1), (b, 2)])
            .await
            .unwrap();

        assert_eq!(store.board_columns(&board).await, vec![c, a, b]);
    }

    #[tokio::test]
    async fn reorder_with_foreign_column_is_rejected_wholesale() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let other_board = BoardId::new();
        let a = store.seed_column(&board).await;
        let b = store.seed_column(&board).await;
        let foreign = store.seed_column(&other_board).await;

        let err = engine(&store)
            .reorder_columns(&board, &[(b, 0), (foreign, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::InvalidReorder(_)));
        // No partial application of the valid id.
        assert_eq!(store.board_columns(&board).await, vec![a, b]);
    }

    #[tokio::test]
    async fn reorder_must_cover_every_column() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let a = store.seed_column(&board).await;
        let _b = store.seed_column(&board).await;

        let err = engine(&store)
            .reorder_columns(&board, &[(a, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::InvalidReorder(_)));
    }

    #[tokio::test]
    async fn reorder_rejects_non_contiguous_positions() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let a = store.seed_column(&board).await;
        let b = store.seed_column(&board).await;

        let err = engine(&store)
            .reorder_columns(&board, &[(a, 0), (b, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::InvalidReorder(_)));
    }

    #[tokio::test]
    async fn next_positions_append() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, _) = seeded_column(&store, &board, 2).await;
        store.seed_column(&board).await;

        let engine = engine(&store);
        assert_eq!(engine.next_task_position(&column).await.unwrap(), 2);
        assert_eq!(engine.next_column_position(&board).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn compact_column_twice_is_noop() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (column, tasks) = seeded_column(&store, &board, 3).await;

        // Punch a hole, then compact twice.
        store.force_task_position(&tasks[2], 7).await;

        let engine = engine(&store);
        engine.compact_column(&column).await.unwrap();
        let after_first = store.column_tasks(&column).await;
        engine.compact_column(&column).await.unwrap();

        assert_eq!(store.column_tasks(&column).await, after_first);
        assert!(store.positions_contiguous(&column).await);
    }

    #[tokio::test]
    async fn contiguity_holds_after_many_moves() {
        let store = Arc::new(InMemoryBoardStore::new());
        let board = BoardId::new();
        let (left, left_tasks) = seeded_column(&store, &board, 4).await;
        let (right, _) = seeded_column(&store, &board, 2).await;

        let engine = engine(&store);
        engine.move_task(&left_tasks[3], &right, 0).await.unwrap();
        engine.move_task(&left_tasks[0], &left, 2).await.unwrap();
        engine.move_task(&left_tasks[1], &right, 3).await.unwrap();
        engine.remove_task(&left_tasks[2]).await.unwrap();

        assert!(store.positions_contiguous(&left).await);
        assert!(store.positions_contiguous(&right).await);
    }
}
