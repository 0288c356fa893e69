//! Sequential task orchestration with failure isolation.

use crate::dispatcher::Dispatcher;
use crate::task::{Task, TaskResult};
use std::sync::Arc;

/// Runs task sequences through a shared [`Dispatcher`].
///
/// Execution is strictly one task after another — no parallelism, no
/// retries, no rollback. A failed task is logged and does not abort the
/// rest of the sequence; the caller inspects each result independently.
pub struct Orchestrator {
    dispatcher: Arc<Dispatcher>,
}

impl Orchestrator {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Executes the tasks in order and returns one result per task, in
    /// the same order.
    pub async fn execute_sequence(&self, tasks: Vec<Task>) -> Vec<TaskResult> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = self.dispatcher.dispatch(task).await;
            if !result.success {
                tracing::warn!(
                    kind = ?result.task.kind,
                    action = result.task.action(),
                    "task in sequence failed, continuing"
                );
            }
            results.push(result);
        }
        results
    }
}
