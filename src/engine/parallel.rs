//! Fixed-size worker pool for one directory batch at a time.

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use log::{debug, error};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::convert::process_file;
use crate::{FileTask, TaskResult};

/// Per-task callback run on a worker thread.
pub type Processor = Arc<dyn Fn(&FileTask) -> TaskResult + Send + Sync>;

/// N worker threads, reused across batches. Each task's encoder runs as its own child process,
/// so a crashing encoder only fails its own task.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    num_workers: usize,
    processor: Processor,
    cancel: Arc<AtomicBool>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `processor` on `task`, turning a panic into a failed result and honoring cancellation.
fn run_one(processor: &Processor, task: &FileTask, cancel: &AtomicBool) -> TaskResult {
    if cancel.load(Ordering::Relaxed) {
        return TaskResult::cancelled(task.input_path.clone());
    }
    catch_unwind(AssertUnwindSafe(|| processor(task))).unwrap_or_else(|payload| {
        let msg = panic_message(payload.as_ref());
        error!("Worker panicked on {}: {}", task.input_path.display(), msg);
        TaskResult::failed(
            task.input_path.clone(),
            format!("{} (error: worker panicked: {})", task.input_path.display(), msg),
        )
    })
}

impl WorkerPool {
    /// Pool running the standard conversion protocol ([`process_file`]).
    pub fn new(num_workers: usize, cancel: Arc<AtomicBool>) -> Result<Self> {
        Self::with_processor(num_workers, cancel, Arc::new(process_file))
    }

    /// Pool running a custom per-task callback.
    pub fn with_processor(
        num_workers: usize,
        cancel: Arc<AtomicBool>,
        processor: Processor,
    ) -> Result<Self> {
        let num_workers = num_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("{}-worker-{i}", env!("CARGO_PKG_NAME")))
            .panic_handler(|_| error!("Worker thread panicked outside a task"))
            .build()
            .context("build worker pool")?;
        debug!("Worker pool ready with {} workers", num_workers);
        Ok(Self {
            pool,
            num_workers,
            processor,
            cancel,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run every task and hand each result to `on_result` on the calling thread, in completion order.
    /// Returns once the batch is fully drained; the return value is the number of results delivered,
    /// which always equals `tasks.len()`.
    pub fn run<F>(&self, tasks: Vec<FileTask>, mut on_result: F) -> usize
    where
        F: FnMut(TaskResult),
    {
        let expected = tasks.len();
        let (result_tx, result_rx) = unbounded::<TaskResult>();
        for task in tasks {
            let result_tx = result_tx.clone();
            let processor = Arc::clone(&self.processor);
            let cancel = Arc::clone(&self.cancel);
            self.pool.spawn(move || {
                let result = run_one(&processor, &task, &cancel);
                let _ = result_tx.send(result);
            });
        }
        // Dropping the last sender here means the loop below ends when every job has finished.
        drop(result_tx);

        let mut delivered = 0;
        for result in result_rx.iter() {
            on_result(result);
            delivered += 1;
        }
        if delivered != expected {
            error!(
                "Worker pool delivered {} results for {} tasks",
                delivered, expected
            );
        }
        delivered
    }
}
