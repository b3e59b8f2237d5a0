//! Runs one stage end to end.

use super::StageSpec;
use crate::cancellation::CancellationToken;
use crate::core::{StageReport, StationId};
use crate::errors::QcError;
use crate::events::{EventSink, NoOpEventSink, STAGE_COMPLETED, STAGE_STARTED};
use crate::pool::{Concurrency, StageBatch, WorkerPool};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Drives a stage: prepares its output directory, hands the batch to the
/// worker pool and folds the outcomes into a [`StageReport`].
///
/// Units are never retried.
#[derive(Clone)]
pub struct StageRunner {
    pool: Arc<dyn WorkerPool>,
    events: Arc<dyn EventSink>,
    concurrency: Concurrency,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("pool", &self.pool)
            .field("concurrency", &self.concurrency)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl StageRunner {
    /// Creates a runner over `pool`.
    #[must_use]
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            pool,
            events: Arc::new(NoOpEventSink),
            concurrency: Concurrency::Auto,
            cancel: None,
        }
    }

    /// Sets the event sink receiving stage events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the concurrency of stages that do not specify one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the token that stops dispatch.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<dyn WorkerPool> {
        &self.pool
    }

    /// Runs `stage` over `station_ids` and waits for every unit.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::StageSetup`] if the output directory cannot be
    /// created, or the pool's error if it cannot start. In both cases no
    /// unit has run.
    pub async fn run(
        &self,
        stage: &StageSpec,
        station_ids: &[StationId],
    ) -> Result<StageReport, QcError> {
        let start = Instant::now();

        stage
            .output
            .ensure_exists()
            .map_err(|e| QcError::stage_setup(&stage.name, stage.output.root(), e))?;

        let concurrency = stage.concurrency.unwrap_or(self.concurrency);
        info!(
            stage = %stage.name,
            check = stage.check.name(),
            pool = self.pool.name(),
            stations = station_ids.len(),
            %concurrency,
            "Starting stage"
        );
        self.events
            .emit(
                STAGE_STARTED,
                Some(serde_json::json!({
                    "stage": stage.name,
                    "stations": station_ids.len(),
                    "workers": concurrency.resolve(),
                })),
            )
            .await;

        let mut batch = StageBatch::new(
            stage.name.clone(),
            station_ids.to_vec(),
            stage.input.clone(),
            stage.output.clone(),
        )
        .with_catalog(stage.catalog.clone())
        .with_concurrency(concurrency);
        if let Some(token) = &self.cancel {
            batch = batch.with_cancellation(token.clone());
        }

        let outcomes = self
            .pool
            .run(Arc::clone(&stage.check), batch)
            .instrument(info_span!("stage", name = %stage.name))
            .await?;

        let cancelled = outcomes.iter().any(|o| o.skipped);
        let report = StageReport::from_outcomes(stage.name.clone(), &outcomes)
            .with_duration_ms(start.elapsed().as_secs_f64() * 1000.0)
            .with_cancelled(cancelled);

        info!(
            stage = %report.stage,
            submitted = report.submitted,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Stage completed"
        );
        self.events
            .emit(
                STAGE_COMPLETED,
                Some(serde_json::json!({
                    "stage": report.stage,
                    "submitted": report.submitted,
                    "succeeded": report.succeeded,
                    "failed": report.failed,
                    "cancelled": report.cancelled,
                })),
            )
            .await;

        Ok(report)
    }
}
