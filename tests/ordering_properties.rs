//! Property tests for the contiguity invariant.
//!
//! Random sequences of moves and deletions over a small board must leave
//! every column's positions as an unbroken 0..N-1 run, with no task lost
//! or duplicated except by explicit deletion.

use std::sync::Arc;

use proptest::prelude::*;

use taskboard::adapters::storage::InMemoryBoardStore;
use taskboard::application::OrderingEngine;
use taskboard::domain::foundation::BoardId;
use taskboard::ports::BoardStore;

#[derive(Debug, Clone, Copy)]
enum Op {
    Move {
        task_index: usize,
        column_index: usize,
        position: i32,
    },
    Delete {
        task_index: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..16, 0usize..3, -3i32..12).prop_map(|(task_index, column_index, position)| {
            Op::Move { task_index, column_index, position }
        }),
        1 => (0usize..16).prop_map(|task_index| Op::Delete { task_index }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_edits_preserve_contiguity(ops in proptest::collection::vec(op_strategy(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let store = Arc::new(InMemoryBoardStore::new());
            let board = BoardId::new();

            let mut columns = Vec::new();
            let mut live = Vec::new();
            for _ in 0..3 {
                let column = store.seed_column(&board).await;
                for _ in 0..4 {
                    live.push(store.seed_task(&column).await);
                }
                columns.push(column);
            }

            let engine = OrderingEngine::new(store.clone() as Arc<dyn BoardStore>);

            for op in ops {
                match op {
                    Op::Move { task_index, column_index, position } => {
                        if live.is_empty() {
                            continue;
                        }
                        let task = live[task_index % live.len()];
                        let column = columns[column_index % columns.len()];
                        engine.move_task(&task, &column, position).await.unwrap();
                    }
                    Op::Delete { task_index } => {
                        if live.is_empty() {
                            continue;
                        }
                        let task = live.remove(task_index % live.len());
                        engine.remove_task(&task).await.unwrap();
                    }
                }

                // Invariant: after every committed mutation, each
                // column's positions are exactly {0..N-1}.
                for column in &columns {
                    prop_assert!(store.positions_contiguous(column).await);
                }
            }

            // Nothing vanished or appeared: surviving tasks are exactly
            // the ones never deleted.
            let mut surviving = Vec::new();
            for column in &columns {
                surviving.extend(store.column_tasks(column).await);
            }
            surviving.sort_by_key(|id| id.to_string());
            let mut expected = live.clone();
            expected.sort_by_key(|id| id.to_string());
            prop_assert_eq!(surviving, expected);

            Ok(())
        })?;
    }
}
