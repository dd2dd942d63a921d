//! In-memory board store for tests and examples.
//!
//! Holds board structure in process memory behind a single mutex. A
//! transaction takes the mutex for its whole lifetime and works on a
//! staged copy: commit swaps the copy in, drop discards it. That gives
//! the same observable guarantees the Postgres adapter gets from
//! SERIALIZABLE transactions - no partially-shifted state is ever
//! visible, and transactions are totally ordered.
//!
//! Not intended for production use; a process restart loses everything.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::board::positions::Shift;
use crate::domain::foundation::{BoardId, ColumnId, TaskId};
use crate::ports::{BoardStore, BoardTx, StoreError, TaskPlacement};

#[derive(Debug, Clone, Copy)]
struct ColumnRow {
    board_id: BoardId,
    position: i32,
}

#[derive(Debug, Clone, Copy)]
struct TaskRow {
    column_id: ColumnId,
    position: i32,
}

#[derive(Debug, Default, Clone)]
struct World {
    columns: HashMap<ColumnId, ColumnRow>,
    tasks: HashMap<TaskId, TaskRow>,
}

impl World {
    fn column_tasks(&self, column: &ColumnId) -> Vec<(TaskId, i32)> {
        let mut tasks: Vec<(TaskId, i32)> = self
            .tasks
            .iter()
            .filter(|(_, row)| row.column_id == *column)
            .map(|(id, row)| (*id, row.position))
            .collect();
        tasks.sort_by_key(|(_, position)| *position);
        tasks
    }

    fn board_columns(&self, board: &BoardId) -> Vec<(ColumnId, i32)> {
        let mut columns: Vec<(ColumnId, i32)> = self
            .columns
            .iter()
            .filter(|(_, row)| row.board_id == *board)
            .map(|(id, row)| (*id, row.position))
            .collect();
        columns.sort_by_key(|(_, position)| *position);
        columns
    }
}

/// In-memory implementation of [`BoardStore`].
pub struct InMemoryBoardStore {
    world: Arc<Mutex<World>>,
}

impl InMemoryBoardStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World::default())),
        }
    }

    // === Seeding and inspection helpers ===

    /// Adds a column at the end of a board, returning its id.
    pub async fn seed_column(&self, board: &BoardId) -> ColumnId {
        let mut world = self.world.lock().await;
        let position = world.board_columns(board).len() as i32;
        let id = ColumnId::new();
        world.columns.insert(
            id,
            ColumnRow {
                board_id: *board,
                position,
            },
        );
        id
    }

    /// Adds a task at the end of a column, returning its id.
    pub async fn seed_task(&self, column: &ColumnId) -> TaskId {
        let mut world = self.world.lock().await;
        let position = world.column_tasks(column).len() as i32;
        let id = TaskId::new();
        world.tasks.insert(
            id,
            TaskRow {
                column_id: *column,
                position,
            },
        );
        id
    }

    /// Returns a column's task ids in position order.
    pub async fn column_tasks(&self, column: &ColumnId) -> Vec<TaskId> {
        self.world
            .lock()
            .await
            .column_tasks(column)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns a board's column ids in position order.
    pub async fn board_columns(&self, board: &BoardId) -> Vec<ColumnId> {
        self.world
            .lock()
            .await
            .board_columns(board)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Looks up where a task currently lives.
    pub async fn task_placement(&self, task: &TaskId) -> Option<TaskPlacement> {
        let world = self.world.lock().await;
        let row = world.tasks.get(task)?;
        let column = world.columns.get(&row.column_id)?;
        Some(TaskPlacement {
            column_id: row.column_id,
            board_id: column.board_id,
            position: row.position,
        })
    }

    /// Returns true if the column's positions are exactly `0..N-1`.
    pub async fn positions_contiguous(&self, column: &ColumnId) -> bool {
        let world = self.world.lock().await;
        world
            .column_tasks(column)
            .iter()
            .enumerate()
            .all(|(index, (_, position))| *position == index as i32)
    }

    /// Overwrites a task's position directly, bypassing the engine.
    ///
    /// Test-only hook for constructing gapped states.
    pub async fn force_task_position(&self, task: &TaskId, position: i32) {
        let mut world = self.world.lock().await;
        if let Some(row) = world.tasks.get_mut(task) {
            row.position = position;
        }
    }
}

impl Default for InMemoryBoardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn begin(&self) -> Result<Box<dyn BoardTx>, StoreError> {
        let guard = self.world.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTx { guard, staged }))
    }
}

/// One open transaction: the world lock plus a staged copy.
struct InMemoryTx {
    guard: OwnedMutexGuard<World>,
    staged: World,
}

#[async_trait]
impl BoardTx for InMemoryTx {
    async fn task_placement(&mut self, task: &TaskId) -> Result<Option<TaskPlacement>, StoreError> {
        let Some(row) = self.staged.tasks.get(task) else {
            return Ok(None);
        };
        let Some(column) = self.staged.columns.get(&row.column_id) else {
            return Ok(None);
        };
        Ok(Some(TaskPlacement {
            column_id: row.column_id,
            board_id: column.board_id,
            position: row.position,
        }))
    }

    async fn column_board(&mut self, column: &ColumnId) -> Result<Option<BoardId>, StoreError> {
        Ok(self.staged.columns.get(column).map(|row| row.board_id))
    }

    async fn task_count(&mut self, column: &ColumnId) -> Result<usize, StoreError> {
        Ok(self.staged.column_tasks(column).len())
    }

    async fn shift_tasks(&mut self, column: &ColumnId, shift: Shift) -> Result<(), StoreError> {
        for row in self.staged.tasks.values_mut() {
            if row.column_id == *column && row.position >= shift.lo && row.position <= shift.hi {
                row.position += shift.delta;
            }
        }
        Ok(())
    }

    async fn place_task(
        &mut self,
        task: &TaskId,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError> {
        let row = self
            .staged
            .tasks
            .get_mut(task)
            .ok_or_else(|| StoreError::Backend(format!("unknown task {}", task)))?;
        row.column_id = *column;
        row.position = position;
        Ok(())
    }

    async fn delete_task(&mut self, task: &TaskId) -> Result<(), StoreError> {
        self.staged.tasks.remove(task);
        Ok(())
    }

    async fn tasks_by_position(
        &mut self,
        column: &ColumnId,
    ) -> Result<Vec<(TaskId, i32)>, StoreError> {
        Ok(self.staged.column_tasks(column))
    }

    async fn set_task_position(&mut self, task: &TaskId, position: i32) -> Result<(), StoreError> {
        let row = self
            .staged
            .tasks
            .get_mut(task)
            .ok_or_else(|| StoreError::Backend(format!("unknown task {}", task)))?;
        row.position = position;
        Ok(())
    }

    async fn columns_by_position(
        &mut self,
        board: &BoardId,
    ) -> Result<Vec<(ColumnId, i32)>, StoreError> {
        Ok(self.staged.board_columns(board))
    }

    async fn set_column_position(
        &mut self,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError> {
        let row = self
            .staged
            .columns
            .get_mut(column)
            .ok_or_else(|| StoreError::Backend(format!("unknown column {}", column)))?;
        row.position = position;
        Ok(())
    }

    async fn delete_column(&mut self, column: &ColumnId) -> Result<(), StoreError> {
        self.staged.columns.remove(column);
        self.staged.tasks.retain(|_, row| row.column_id != *column);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_changes_vanish_without_commit() {
        let store = InMemoryBoardStore::new();
        let board = BoardId::new();
        let column = store.seed_column(&board).await;
        let task = store.seed_task(&column).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.delete_task(&task).await.unwrap();
            // Dropped without commit.
        }

        assert!(store.task_placement(&task).await.is_some());
    }

    #[tokio::test]
    async fn committed_changes_become_visible() {
        let store = InMemoryBoardStore::new();
        let board = BoardId::new();
        let column = store.seed_column(&board).await;
        let task = store.seed_task(&column).await;

        let mut tx = store.begin().await.unwrap();
        tx.delete_task(&task).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.task_placement(&task).await.is_none());
    }

    #[tokio::test]
    async fn shift_moves_only_the_range() {
        let store = InMemoryBoardStore::new();
        let board = BoardId::new();
        let column = store.seed_column(&board).await;
        let first = store.seed_task(&column).await;
        let second = store.seed_task(&column).await;
        let third = store.seed_task(&column).await;

        let mut tx = store.begin().await.unwrap();
        tx.shift_tasks(
            &column,
            Shift {
                lo: 1,
                hi: i32::MAX,
                delta: 1,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.task_placement(&first).await.unwrap().position, 0);
        assert_eq!(store.task_placement(&second).await.unwrap().position, 2);
        assert_eq!(store.task_placement(&third).await.unwrap().position, 3);
    }

    #[tokio::test]
    async fn delete_column_removes_its_tasks() {
        let store = InMemoryBoardStore::new();
        let board = BoardId::new();
        let column = store.seed_column(&board).await;
        let task = store.seed_task(&column).await;

        let mut tx = store.begin().await.unwrap();
        tx.delete_column(&column).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.board_columns(&board).await.is_empty());
        assert!(store.task_placement(&task).await.is_none());
    }
}
