//! Worker pool that runs units one after another on the calling task.

use super::{report_unit, StageBatch, WorkerPool, CANCELLED_BEFORE_DISPATCH};
use crate::checks::{apply_check, StationCheck};
use crate::core::CheckOutcome;
use crate::errors::QcError;
use crate::events::{EventSink, NoOpEventSink};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Runs units in submission order without spawning anything.
///
/// Ignores the batch's concurrency. Useful for debugging a single station
/// and in environments without a multi-threaded runtime; it blocks the
/// calling task for the whole batch.
pub struct SequentialPool {
    events: Arc<dyn EventSink>,
}

impl SequentialPool {
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
}

impl Default for SequentialPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialPool").finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkerPool for SequentialPool {
    fn name(&self) -> &str {
        "sequential"
    }

    async fn run(
        &self,
        check: Arc<dyn StationCheck>,
        batch: StageBatch,
    ) -> Result<Vec<CheckOutcome>, QcError> {
        info!(stage = %batch.stage, check = check.name(), stations = batch.len(), "Handling stations sequentially");

        let mut outcomes = Vec::with_capacity(batch.len());
        for station_id in &batch.station_ids {
            let outcome = if batch.is_cancelled() {
                CheckOutcome::skipped(station_id.clone(), CANCELLED_BEFORE_DISPATCH)
            } else {
                apply_check(
                    check.as_ref(),
                    station_id,
                    &batch.input,
                    &batch.output,
                    batch.catalog.as_deref(),
                )
            };
            report_unit(self.events.as_ref(), &batch.stage, &outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::dataset::DatasetDir;
    use crate::testing::{assert_one_outcome_per_station, ScriptedCheck, StationFixture};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_runs_in_submission_order_without_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let input = DatasetDir::csv(tmp.path().join("in"));
        let output = DatasetDir::csv(tmp.path().join("out"));
        let ids = StationFixture::new(&input).numbered("S", 5).write().unwrap();
        output.ensure_exists().unwrap();

        let batch = StageBatch::new("seq", ids.clone(), input, output);
        let check = Arc::new(ScriptedCheck::passing("p").failing_for(["S0001"]));
        let outcomes = futures::executor::block_on(SequentialPool::new().run(check, batch)).unwrap();

        assert_one_outcome_per_station(&outcomes, &ids);
        let order: Vec<_> = outcomes.iter().map(|o| o.station_id.clone()).collect();
        assert_eq!(order, ids);
        assert!(outcomes[1].is_failure());
    }

    #[test]
    fn test_cancellation_mid_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let input = DatasetDir::csv(tmp.path().join("in"));
        let output = DatasetDir::csv(tmp.path().join("out"));
        let ids = StationFixture::new(&input).numbered("S", 4).write().unwrap();
        output.ensure_exists().unwrap();

        let token = CancellationToken::new();
        let check = Arc::new(ScriptedCheck::passing("p").cancelling_after(2, token.clone()));
        let batch = StageBatch::new("seq", ids.clone(), input, output).with_cancellation(token);

        let outcomes = futures::executor::block_on(SequentialPool::new().run(check.clone(), batch)).unwrap();

        assert_one_outcome_per_station(&outcomes, &ids);
        assert_eq!(check.call_count(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.skipped).count(), 2);
    }
}
