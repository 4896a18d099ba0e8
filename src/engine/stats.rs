//! Run-wide size totals.

use std::sync::Mutex;

use crate::{RunStats, TaskResult, TaskStatus};

/// Lock-guarded [`RunStats`]. Every update and read takes the lock, so a snapshot never mixes
/// values from before and after one `record`.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    stats: Mutex<RunStats>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one result in. Successful results with both sizes add to the totals; failures only count.
    pub fn record(&self, result: &TaskResult) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        match (result.is_success(), result.original_size, result.processed_size) {
            (true, Some(original), Some(processed)) => {
                stats.processed_files += 1;
                stats.original_size_total += original;
                stats.processed_size_total += processed;
                match result.status {
                    TaskStatus::AlreadyExists | TaskStatus::FinishedElsewhere => {
                        stats.existing_files += 1
                    }
                    _ => stats.converted_files += 1,
                }
            }
            (true, _, _) => {}
            (false, _, _) => stats.failed_files += 1,
        }
    }

    pub fn snapshot(&self) -> RunStats {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
