//! PostgreSQL implementation of the board store.
//!
//! Each transaction runs SERIALIZABLE so concurrent moves in the same
//! column cannot both read stale positions; a serialization failure
//! surfaces as `StoreError::Conflict` for the caller to retry.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::board::positions::Shift;
use crate::domain::foundation::{BoardId, ColumnId, TaskId};
use crate::ports::{BoardStore, BoardTx, StoreError, TaskPlacement};

/// PostgreSQL implementation of [`BoardStore`].
#[derive(Clone)]
pub struct PgBoardStore {
    pool: PgPool,
}

impl PgBoardStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            // 40001 serialization_failure, 40P01 deadlock_detected
            match db.code().as_deref() {
                Some("40001") | Some("40P01") => StoreError::Conflict,
                _ => StoreError::Backend(err.to_string()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn begin(&self) -> Result<Box<dyn BoardTx>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(Box::new(PgBoardTx { tx }))
    }
}

struct PgBoardTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BoardTx for PgBoardTx {
    async fn task_placement(&mut self, task: &TaskId) -> Result<Option<TaskPlacement>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT t.column_id, c.board_id, t.position
            FROM tasks t
            JOIN columns c ON c.id = t.column_id
            WHERE t.id = $1
            "#,
        )
        .bind(task.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        row.map(|row| {
            Ok(TaskPlacement {
                column_id: ColumnId::from_uuid(row.try_get("column_id").map_err(map_sqlx_err)?),
                board_id: BoardId::from_uuid(row.try_get("board_id").map_err(map_sqlx_err)?),
                position: row.try_get("position").map_err(map_sqlx_err)?,
            })
        })
        .transpose()
    }

    async fn column_board(&mut self, column: &ColumnId) -> Result<Option<BoardId>, StoreError> {
        let row = sqlx::query("SELECT board_id FROM columns WHERE id = $1")
            .bind(column.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        row.map(|row| {
            Ok(BoardId::from_uuid(
                row.try_get("board_id").map_err(map_sqlx_err)?,
            ))
        })
        .transpose()
    }

    async fn task_count(&mut self, column: &ColumnId) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE column_id = $1")
            .bind(column.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(count as usize)
    }

    async fn shift_tasks(&mut self, column: &ColumnId, shift: Shift) -> Result<(), StoreError> {
        if shift.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE tasks SET position = position + $2
            WHERE column_id = $1 AND position >= $3 AND position <= $4
            "#,
        )
        .bind(column.as_uuid())
        .bind(shift.delta)
        .bind(shift.lo)
        .bind(shift.hi)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn place_task(
        &mut self,
        task: &TaskId,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET column_id = $2, position = $3 WHERE id = $1")
            .bind(task.as_uuid())
            .bind(column.as_uuid())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn delete_task(&mut self, task: &TaskId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn tasks_by_position(
        &mut self,
        column: &ColumnId,
    ) -> Result<Vec<(TaskId, i32)>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, position FROM tasks WHERE column_id = $1 ORDER BY position",
        )
        .bind(column.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    TaskId::from_uuid(row.try_get("id").map_err(map_sqlx_err)?),
                    row.try_get("position").map_err(map_sqlx_err)?,
                ))
            })
            .collect()
    }

    async fn set_task_position(&mut self, task: &TaskId, position: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET position = $2 WHERE id = $1")
            .bind(task.as_uuid())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn columns_by_position(
        &mut self,
        board: &BoardId,
    ) -> Result<Vec<(ColumnId, i32)>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, position FROM columns WHERE board_id = $1 ORDER BY position",
        )
        .bind(board.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    ColumnId::from_uuid(row.try_get("id").map_err(map_sqlx_err)?),
                    row.try_get("position").map_err(map_sqlx_err)?,
                ))
            })
            .collect()
    }

    async fn set_column_position(
        &mut self,
        column: &ColumnId,
        position: i32,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE columns SET position = $2 WHERE id = $1")
            .bind(column.as_uuid())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn delete_column(&mut self, column: &ColumnId) -> Result<(), StoreError> {
        // Tasks go with the column via ON DELETE CASCADE.
        sqlx::query("DELETE FROM columns WHERE id = $1")
            .bind(column.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_err)
    }
}
