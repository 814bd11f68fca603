//! Partition scheduler
//!
//! Runs partition readers either one after another or on a fixed pool of
//! worker tasks pulling from a shared newest-first queue. Workers report
//! each finished partition on a channel; the scheduler waits on that
//! channel with a timeout so it can log progress at a fixed interval.

use super::types::{PartitionHandle, PartitionReport, TaskState};
use crate::error::{Error, Result};
use crate::pagination::WalkSummary;
use crate::reader::{MetricsSnapshot, TableReader};
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info};

/// A partition reader plus the sender half of its state handle
struct PartitionTask {
    reader: TableReader,
    state: watch::Sender<TaskState>,
}

/// Result of one finished task
struct TaskOutcome {
    index: usize,
    name: String,
    metrics: MetricsSnapshot,
    result: Result<WalkSummary>,
}

impl TaskOutcome {
    fn report(&self) -> PartitionReport {
        PartitionReport {
            name: self.name.clone(),
            state: if self.result.is_ok() {
                TaskState::Done
            } else {
                TaskState::Failed
            },
            metrics: self.metrics,
            fallback_used: self
                .result
                .as_ref()
                .is_ok_and(|summary| summary.fallback_used),
        }
    }
}

impl PartitionTask {
    /// Initialize and run the reader, wrapping any error with the
    /// partition name and row counts so far
    async fn execute(mut self, index: usize) -> TaskOutcome {
        self.state.send_replace(TaskState::Running);
        let result = self.reader.read().await;
        let name = self.reader.name().to_string();
        let metrics = self.reader.metrics().snapshot();

        let result = match result {
            Ok(summary) => {
                self.state.send_replace(TaskState::Done);
                Ok(summary)
            }
            Err(e) => {
                self.state.send_replace(TaskState::Failed);
                if !e.is_cancelled() {
                    error!("{name}: {e}");
                }
                Err(Error::partition(
                    &name,
                    metrics.processed,
                    metrics.expected,
                    e,
                ))
            }
        };
        TaskOutcome {
            index,
            name,
            metrics,
            result,
        }
    }
}

impl Drop for PartitionTask {
    // A reader that panicked mid-read never reached a terminal state
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == TaskState::Running {
                *state = TaskState::Failed;
                true
            } else {
                false
            }
        });
    }
}

/// Runs partition readers under a bounded worker pool
pub struct PartitionScheduler {
    threads: usize,
    poll_interval: Duration,
    tasks: Vec<PartitionTask>,
    handles: Vec<PartitionHandle>,
}

impl PartitionScheduler {
    /// Create a scheduler; `threads <= 1` runs sequentially
    pub fn new(threads: usize, poll_interval: Duration) -> Self {
        Self {
            threads,
            poll_interval,
            tasks: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Queue a reader. Readers run in submission order.
    pub fn submit(&mut self, reader: TableReader) -> PartitionHandle {
        let (tx, rx) = watch::channel(TaskState::Pending);
        let handle = PartitionHandle::new(reader.name(), rx, Arc::clone(reader.metrics()));
        self.tasks.push(PartitionTask { reader, state: tx });
        self.handles.push(handle.clone());
        handle
    }

    /// Handles for every submitted reader, in submission order
    pub fn handles(&self) -> &[PartitionHandle] {
        &self.handles
    }

    /// Number of submitted readers
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every submitted reader.
    ///
    /// Returns one report per partition in submission order, or the first
    /// fatal partition error once all work has stopped.
    pub async fn run(self) -> Result<Vec<PartitionReport>> {
        if self.threads <= 1 {
            self.run_sequential().await
        } else {
            self.run_parallel().await
        }
    }

    /// Newest first, one at a time, stopping at the first failure
    async fn run_sequential(self) -> Result<Vec<PartitionReport>> {
        let total = self.tasks.len();
        let mut reports = Vec::with_capacity(total);

        for (index, task) in self.tasks.into_iter().enumerate() {
            let outcome = task.execute(index).await;
            let report = outcome.report();
            outcome.result?;
            debug!("{}: done ({}/{})", report.name, index + 1, total);
            reports.push(report);
        }
        Ok(reports)
    }

    async fn run_parallel(self) -> Result<Vec<PartitionReport>> {
        let total = self.tasks.len();
        let workers = self.threads.min(total);
        let poll_interval = self.poll_interval;
        let names: Vec<String> = self.handles.iter().map(|h| h.name().to_string()).collect();

        let queue: VecDeque<(usize, PartitionTask)> = self.tasks.into_iter().enumerate().collect();
        let queue = Arc::new(Mutex::new(queue));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskOutcome>();

        info!("Reading {total} partitions on {workers} workers");
        let mut joins = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            joins.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, task)) = next else {
                        break;
                    };
                    if tx.send(task.execute(index).await).is_err() {
                        break;
                    }
                }
                debug!("Worker {worker} finished");
            }));
        }
        drop(tx);

        let mut reports: Vec<Option<PartitionReport>> = vec![None; total];
        let mut failure: Option<Error> = None;
        let mut finished = 0;
        while finished < total {
            match tokio::time::timeout(poll_interval, rx.recv()).await {
                Ok(Some(outcome)) => {
                    finished += 1;
                    debug!(
                        "{}: finished, {}/{} partitions remaining",
                        outcome.name,
                        total - finished,
                        total
                    );
                    reports[outcome.index] = Some(outcome.report());
                    if let Err(e) = outcome.result {
                        keep_first(&mut failure, e);
                    }
                }
                // Every worker has exited
                Ok(None) => break,
                Err(_) => info!("{}/{} partitions remaining", total - finished, total),
            }
        }

        for joined in join_all(joins).await {
            if let Err(e) = joined {
                keep_first(&mut failure, Error::Other(format!("Partition worker failed: {e}")));
            }
        }

        let mut complete = Vec::with_capacity(total);
        for (report, name) in reports.into_iter().zip(names) {
            match report {
                Some(report) => complete.push(report),
                None => keep_first(
                    &mut failure,
                    Error::Other(format!("Partition '{name}' never reported")),
                ),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(complete),
        }
    }
}

/// Keep the first fatal error; a cancellation only stands in until one arrives
fn keep_first(slot: &mut Option<Error>, error: Error) {
    match slot {
        None => *slot = Some(error),
        Some(current) if current.is_cancelled() && !error.is_cancelled() => *slot = Some(error),
        Some(_) => {}
    }
}

impl std::fmt::Debug for PartitionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionScheduler")
            .field("threads", &self.threads)
            .field("poll_interval", &self.poll_interval)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
