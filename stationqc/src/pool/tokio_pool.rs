//! Worker pool backed by tokio's blocking thread pool.

use super::{report_unit, StageBatch, WorkerPool, CANCELLED_BEFORE_DISPATCH};
use crate::checks::{apply_check, StationCheck};
use crate::core::{CheckOutcome, StationId};
use crate::errors::QcError;
use crate::events::{EventSink, NoOpEventSink};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, info};

/// Runs each unit on tokio's blocking threads, keeping at most
/// `batch.concurrency` units in flight.
///
/// Units are dispatched progressively: a new station starts only when a
/// running one completes.
pub struct TokioWorkerPool {
    events: Arc<dyn EventSink>,
}

impl TokioWorkerPool {
    /// Creates a pool that emits no events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink receiving `unit.completed` events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    fn finish(
        &self,
        stage: &str,
        station_id: StationId,
        joined: Result<CheckOutcome, JoinError>,
    ) -> CheckOutcome {
        let outcome = joined.unwrap_or_else(|e| {
            CheckOutcome::failed(station_id, format!("worker task failed: {e}"))
        });
        report_unit(self.events.as_ref(), stage, &outcome);
        outcome
    }
}

impl Default for TokioWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokioWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioWorkerPool").finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkerPool for TokioWorkerPool {
    fn name(&self) -> &str {
        "tokio"
    }

    async fn run(
        &self,
        check: Arc<dyn StationCheck>,
        batch: StageBatch,
    ) -> Result<Vec<CheckOutcome>, QcError> {
        let runtime = Handle::try_current()
            .map_err(|e| QcError::pool_unavailable(self.name(), e.to_string()))?;

        let workers = batch.concurrency.resolve();
        let total = batch.len();
        info!(
            stage = %batch.stage,
            check = check.name(),
            workers,
            stations = total,
            "Using {} workers to handle {} stations", workers, total
        );

        let batch = Arc::new(batch);
        let mut outcomes = Vec::with_capacity(total);
        let mut active = FuturesUnordered::new();

        for (idx, station_id) in batch.station_ids.iter().enumerate() {
            while active.len() >= workers {
                if let Some((id, joined)) = active.next().await {
                    outcomes.push(self.finish(&batch.stage, id, joined));
                }
            }

            if batch.is_cancelled() {
                debug!(stage = %batch.stage, remaining = total - idx, "Dispatch stopped by cancellation");
                for skipped in &batch.station_ids[idx..] {
                    let outcome = CheckOutcome::skipped(skipped.clone(), CANCELLED_BEFORE_DISPATCH);
                    report_unit(self.events.as_ref(), &batch.stage, &outcome);
                    outcomes.push(outcome);
                }
                break;
            }

            let unit_check = Arc::clone(&check);
            let unit_batch = Arc::clone(&batch);
            let unit_id = station_id.clone();
            let handle = runtime.spawn_blocking(move || {
                apply_check(
                    unit_check.as_ref(),
                    &unit_id,
                    &unit_batch.input,
                    &unit_batch.output,
                    unit_batch.catalog.as_deref(),
                )
            });

            let id = station_id.clone();
            active.push(async move { (id, handle.await) });
        }

        while let Some((id, joined)) = active.next().await {
            outcomes.push(self.finish(&batch.stage, id, joined));
        }

        Ok(outcomes)
    }
}
