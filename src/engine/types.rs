//! Engine types
//!
//! Task state, progress snapshots and the report returned by a read.

use crate::reader::{MetricsSnapshot, ReaderMetrics};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Completion state of one scheduled partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Queued, not yet picked up by a worker
    #[default]
    Pending,
    /// Being read
    Running,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl TaskState {
    /// Check if the task has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Read-only view of one scheduled partition
#[derive(Debug, Clone)]
pub struct PartitionHandle {
    name: String,
    state: watch::Receiver<TaskState>,
    metrics: Arc<ReaderMetrics>,
}

impl PartitionHandle {
    pub(crate) fn new(
        name: impl Into<String>,
        state: watch::Receiver<TaskState>,
        metrics: Arc<ReaderMetrics>,
    ) -> Self {
        Self {
            name: name.into(),
            state,
            metrics,
        }
    }

    /// Partition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Current counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Point-in-time progress of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Partitions scheduled
    pub total: usize,
    /// Partitions finished successfully
    pub done: usize,
    /// Partitions finished with an error
    pub failed: usize,
    /// Partitions currently being read
    pub running: usize,
    /// Summed counters across partitions
    pub metrics: MetricsSnapshot,
}

impl Progress {
    /// Partitions not yet finished
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.done + self.failed)
    }

    /// Check if every partition has finished
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} partitions remaining, {} of {} rows",
            self.remaining(),
            self.total,
            self.metrics.processed,
            self.metrics.expected
        )
    }
}

/// Final state of one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    /// Partition name
    pub name: String,
    /// Terminal state
    pub state: TaskState,
    /// Counters at completion
    pub metrics: MetricsSnapshot,
    /// Whether the key list came from the alternate protocol
    pub fallback_used: bool,
}

/// Outcome of a successful read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractReport {
    /// Table read
    pub table: String,
    /// Per-partition results, newest first
    pub partitions: Vec<PartitionReport>,
    /// Counters summed across partitions
    pub metrics: MetricsSnapshot,
    /// Whether any key list came from the alternate protocol
    pub fallback_used: bool,
    /// Wall-clock time of the read
    pub duration: Duration,
}

impl ExtractReport {
    /// Rows delivered to the sink
    pub fn records(&self) -> u64 {
        self.metrics.processed
    }
}
