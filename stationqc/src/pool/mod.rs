//! Bounded-concurrency execution of one check over many stations.
//!
//! This module provides:
//! - The [`WorkerPool`] contract the stage runner depends on
//! - [`TokioWorkerPool`], backed by tokio's blocking thread pool
//! - [`SequentialPool`], which runs units one by one on the caller
//!
//! Every pool returns exactly one [`CheckOutcome`] per submitted station, in
//! completion order.

mod concurrency;
mod sequential;
mod tokio_pool;

pub use concurrency::{Concurrency, ParseConcurrencyError};
pub use sequential::SequentialPool;
pub use tokio_pool::TokioWorkerPool;

use crate::cancellation::CancellationToken;
use crate::catalog::StationCatalog;
use crate::checks::StationCheck;
use crate::core::{CheckOutcome, StationId};
use crate::dataset::DatasetDir;
use crate::errors::QcError;
use crate::events::{EventSink, UNIT_COMPLETED};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// Message carried by outcomes of stations never dispatched because the
/// batch was cancelled.
pub const CANCELLED_BEFORE_DISPATCH: &str = "cancelled before dispatch";

/// One stage's worth of work for a pool.
#[derive(Debug, Clone)]
pub struct StageBatch {
    /// The stage name, used for events and logs.
    pub stage: String,
    /// Stations to check.
    pub station_ids: Vec<StationId>,
    /// Dataset the stations are read from.
    pub input: DatasetDir,
    /// Dataset successful stations are written to.
    pub output: DatasetDir,
    /// Catalog handed to the check, if the stage uses one.
    pub catalog: Option<Arc<StationCatalog>>,
    /// Maximum units in flight.
    pub concurrency: Concurrency,
    /// Stops dispatch of further units when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl StageBatch {
    /// Creates a batch.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        station_ids: Vec<StationId>,
        input: DatasetDir,
        output: DatasetDir,
    ) -> Self {
        Self {
            stage: stage.into(),
            station_ids,
            input,
            output,
            catalog: None,
            concurrency: Concurrency::Auto,
            cancel: None,
        }
    }

    /// Sets the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Option<Arc<StationCatalog>>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the number of stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.station_ids.len()
    }

    /// Returns true if the batch has no stations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.station_ids.is_empty()
    }

    /// Returns true if the batch's token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Trait for executors applying one check across a batch of stations.
///
/// A pool holds no state between batches. It fails only when it cannot start
/// at all, and then before any unit runs; a failing unit never stops the
/// others.
#[async_trait]
pub trait WorkerPool: Send + Sync + Debug {
    /// Returns the name of the pool implementation.
    fn name(&self) -> &str;

    /// Runs `check` for every station in the batch.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::PoolUnavailable`] if no worker can be obtained.
    async fn run(
        &self,
        check: Arc<dyn StationCheck>,
        batch: StageBatch,
    ) -> Result<Vec<CheckOutcome>, QcError>;
}

/// Logs a finished unit and forwards it to the event sink.
fn report_unit(events: &dyn EventSink, stage: &str, outcome: &CheckOutcome) {
    if outcome.is_failure() {
        warn!(stage = %stage, station = %outcome.station_id, "{}", outcome.message);
    }
    events.try_emit(
        UNIT_COMPLETED,
        Some(serde_json::json!({
            "stage": stage,
            "station_id": outcome.station_id,
            "status": outcome.status,
        })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let batch = StageBatch::new(
            "integrity",
            vec!["A001".into(), "A002".into()],
            DatasetDir::csv("in"),
            DatasetDir::csv("out"),
        )
        .with_concurrency(Concurrency::fixed(2));

        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(!batch.is_cancelled());
        assert!(batch.catalog.is_none());

        let token = CancellationToken::new();
        let batch = batch.with_cancellation(token.clone());
        token.cancel("stop");
        assert!(batch.is_cancelled());
    }
}
