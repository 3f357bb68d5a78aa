use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::processor::EventProcessor;
use crate::error::{IngestFailure, TelemetryError};
use crate::store::TelemetryStores;
use crate::types::{BatchResult, TelemetryEvent};

/// Classifies and persists batches of telemetry envelopes.
///
/// Every item is handled independently: a failure is logged, counted and
/// otherwise ignored, so one bad envelope never costs the rest of the batch.
pub struct IngestionService {
    processor: EventProcessor,
    concurrency: usize,
}

impl IngestionService {
    /// Sequential ingestion, one item at a time
    pub fn new(stores: TelemetryStores) -> Self {
        Self::with_concurrency(stores, 1)
    }

    /// Up to `concurrency` items in flight per batch; 0 is treated as 1
    pub fn with_concurrency(stores: TelemetryStores, concurrency: usize) -> Self {
        Self {
            processor: EventProcessor::new(stores),
            concurrency: concurrency.max(1),
        }
    }

    pub async fn ingest(&self, batch: Vec<Value>) -> Result<BatchResult, TelemetryError> {
        if batch.is_empty() {
            return Err(TelemetryError::EmptyBatch);
        }

        let outcomes: Vec<Result<(), IngestFailure>> = stream::iter(batch.into_iter().enumerate())
            .map(|(index, item)| self.ingest_one(index, item))
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = BatchResult::tally(&outcomes);
        info!(
            processed = result.processed,
            failed = result.failed,
            total = result.total,
            "Ingested telemetry batch"
        );

        Ok(result)
    }

    async fn ingest_one(&self, index: usize, item: Value) -> Result<(), IngestFailure> {
        let outcome = match TelemetryEvent::classify(item) {
            Ok(event) => {
                debug!(index, event_type = event.type_tag(), "Processing event");
                self.processor.process(event).await
            }
            Err(failure) => Err(failure),
        };

        if let Err(failure) = &outcome {
            warn!(index, kind = failure.kind(), "Skipping telemetry event: {}", failure);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    include!("ingestion_tests.rs");
}
