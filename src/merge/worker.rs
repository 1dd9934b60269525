//! Background merge worker.

use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::error::{PilumError, Result};
use crate::merge::{MergeEngine, MergeStats, MergeTask};
use crate::storage::Storage;

/// A merge running on its own thread.
///
/// The owner must call [`MergeWorker::join`] before starting the next merge;
/// merges never overlap. When the merge succeeds the worker deletes both
/// input files before finishing. A failed merge leaves its inputs in place.
#[derive(Debug)]
pub struct MergeWorker {
    task: MergeTask,
    handle: thread::JoinHandle<Result<MergeStats>>,
}

impl MergeWorker {
    /// Spawn a thread running `task`.
    pub fn spawn(storage: Arc<dyn Storage>, task: MergeTask) -> Result<Self> {
        let thread_task = task.clone();

        let handle = thread::Builder::new()
            .name(format!("pilum-merge-{}", task.output))
            .spawn(move || -> Result<MergeStats> {
                let engine = MergeEngine::new(Arc::clone(&storage));
                let stats = engine.merge(&thread_task)?;

                storage.delete_file(&thread_task.older)?;
                storage.delete_file(&thread_task.newer)?;
                debug!(
                    older = %thread_task.older,
                    newer = %thread_task.newer,
                    "deleted merge inputs"
                );

                Ok(stats)
            })?;

        debug!(output = %task.output, "merge worker spawned");

        Ok(MergeWorker { task, handle })
    }

    pub fn task(&self) -> &MergeTask {
        &self.task
    }

    /// Whether the merge thread has finished running.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the merge to finish and return its result.
    pub fn join(self) -> Result<MergeStats> {
        let output = self.task.output;
        let result = self.handle.join().map_err(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            PilumError::ThreadJoinError(format!("merge into {output} panicked: {reason}"))
        })?;

        debug!(output = %output, ok = result.is_ok(), "merge worker joined");
        result
    }
}
