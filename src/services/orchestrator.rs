use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::domain::{InputRow, OutputRow, ResearchError, RowStatus};
use crate::services::data_persistance::write_output_rows;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Rows per batch; the next batch only starts when this one is done.
    pub batch_size: usize,
    /// Bounded worker pool width, independent of batch size.
    pub worker_count: usize,
    /// Hard wall-clock budget for one row's whole pipeline.
    pub row_timeout: Duration,
    /// Write an intermediate snapshot every N batches.
    pub snapshot_every: Option<usize>,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            batch_size: 10,
            worker_count: 4,
            row_timeout: Duration::from_secs(300),
            snapshot_every: None,
            snapshot_path: None,
        }
    }
}

/// Cooperative cancellation, polled between batches only. Work already
/// dispatched in the current batch runs to completion or individual
/// timeout, so finished batches are never corrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Process rows in fixed-size batches over a bounded worker pool.
///
/// Guarantees: one output row per input row; output order matches input
/// order regardless of completion order (results land in slots indexed by
/// original position); a row's failure, timeout, or even panic never
/// affects another row or aborts the batch. After a cancellation the rows
/// from never-started batches come back as `skipped`.
pub async fn run_batches<F, Fut>(
    rows: Vec<InputRow>,
    options: &BatchOptions,
    cancel: &CancelFlag,
    process: F,
) -> Vec<OutputRow>
where
    F: Fn(InputRow) -> Fut,
    Fut: Future<Output = OutputRow> + Send + 'static,
{
    let total = rows.len();
    let mut slots: Vec<Option<OutputRow>> = vec![None; total];
    let semaphore = Arc::new(Semaphore::new(options.worker_count.max(1)));
    let batch_size = options.batch_size.max(1);

    let indexed: Vec<(usize, InputRow)> = rows.into_iter().enumerate().collect();
    let mut done = 0;
    let mut batches_done = 0;

    for batch in indexed.chunks(batch_size) {
        if cancel.is_cancelled() {
            for (index, row) in batch {
                slots[*index] = Some(OutputRow::failed(
                    row.clone(),
                    RowStatus::Skipped,
                    "run cancelled",
                ));
            }
            continue;
        }

        let mut handles = vec![];
        for (index, row) in batch {
            let permits = semaphore.clone();
            let row_timeout = options.row_timeout;
            let fallback_row = row.clone();
            let fut = process(row.clone());

            let handle = tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return OutputRow::failed(
                            fallback_row,
                            RowStatus::Error,
                            "worker pool shut down",
                        )
                    }
                };
                match timeout(row_timeout, fut).await {
                    Ok(output) => output,
                    Err(_) => OutputRow::failed(
                        fallback_row,
                        RowStatus::Error,
                        ResearchError::Timeout(row_timeout).to_string(),
                    ),
                }
            });
            handles.push((*index, row.clone(), handle));
        }

        for (index, row, handle) in handles {
            let output = match handle.await {
                Ok(output) => output,
                Err(e) => {
                    log::error!("row task for {:?} panicked: {}", row.domain, e);
                    OutputRow::failed(row, RowStatus::Error, format!("row task panicked: {}", e))
                }
            };
            slots[index] = Some(output);
        }

        done += batch.len();
        batches_done += 1;
        log::info!("processed {}/{} rows", done, total);

        if let (Some(every), Some(path)) = (options.snapshot_every, &options.snapshot_path) {
            if every > 0 && batches_done % every == 0 {
                let so_far: Vec<OutputRow> =
                    slots.iter().flatten().cloned().collect();
                if let Err(e) = write_output_rows(path, &so_far) {
                    log::warn!("failed to write snapshot to {}: {}", path.display(), e);
                }
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.expect("every row slot is filled by its batch"))
        .collect()
}
