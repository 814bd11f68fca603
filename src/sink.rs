//! Reference record sink
//!
//! `MemorySink` collects every delivered batch in memory. It is safe to
//! share between concurrently running partitions.

use crate::api::{ReadContext, RecordSink};
use crate::error::Result;
use crate::types::{Record, RecordBatch};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A delivered batch tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Table name
    pub table: String,
    /// Partition name, if partitioned
    pub partition: Option<String>,
    /// The batch
    pub batch: RecordBatch,
}

/// Sink that keeps every batch in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery, in arrival order
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Every record, in arrival order
    pub async fn records(&self) -> Vec<Record> {
        self.deliveries
            .lock()
            .await
            .iter()
            .flat_map(|d| d.batch.records().iter().cloned())
            .collect()
    }

    /// Total records received
    pub async fn record_count(&self) -> usize {
        self.deliveries
            .lock()
            .await
            .iter()
            .map(|d| d.batch.len())
            .sum()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn accept(&self, ctx: &ReadContext, batch: RecordBatch) -> Result<()> {
        self.deliveries.lock().await.push(Delivery {
            table: ctx.table().to_string(),
            partition: ctx.partition().map(String::from),
            batch,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn batch(n: usize) -> RecordBatch {
        (0..n)
            .map(|i| {
                json!({ "n": i })
                    .as_object()
                    .cloned()
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[tokio::test]
    async fn test_memory_sink_tags_deliveries() {
        let sink = MemorySink::new();
        let ctx = ReadContext::new("incident");
        sink.accept(&ctx, batch(2)).await.unwrap();
        sink.accept(&ctx.for_partition("M2019-12"), batch(1))
            .await
            .unwrap();

        let deliveries = sink.deliveries().await;
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].partition, None);
        assert_eq!(deliveries[1].partition.as_deref(), Some("M2019-12"));
        assert_eq!(sink.record_count().await, 3);
        assert_eq!(sink.records().await[1]["n"], json!(1));
    }

    #[tokio::test]
    async fn test_memory_sink_concurrent_accept() {
        let sink = Arc::new(MemorySink::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                let ctx = ReadContext::new("t").for_partition(format!("p{i}"));
                sink.accept(&ctx, batch(10)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(sink.record_count().await, 80);
    }
}
