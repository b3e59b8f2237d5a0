//! The pipeline: stages run in order over one station universe.

use super::{PipelineBuilder, StageRunner, StageSpec};
use crate::catalog::StationCatalog;
use crate::config::PipelineConfig;
use crate::core::{PipelineReport, StationId};
use crate::dataset::DatasetDir;
use crate::errors::QcError;
use crate::events::{EventSink, PIPELINE_COMPLETED, PIPELINE_STARTED};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// A validated chain of stages.
///
/// Every stage is a full barrier: stage `i + 1` starts only after every
/// unit of stage `i` has finished. Failed units never stop the pipeline;
/// a station that failed upstream simply has no input downstream and
/// fails there too.
pub struct Pipeline {
    name: String,
    source: DatasetDir,
    stages: Vec<StageSpec>,
    runner: StageRunner,
    events: Arc<dyn EventSink>,
}

impl Pipeline {
    pub(super) fn new(
        name: String,
        source: DatasetDir,
        stages: Vec<StageSpec>,
        runner: StageRunner,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name,
            source,
            stages,
            runner,
            events,
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Builds the standard three-stage pipeline with default pool and
    /// no event sink.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::Validation`] if the configured layout is invalid.
    pub fn standard(
        config: &PipelineConfig,
        catalog: Option<Arc<StationCatalog>>,
    ) -> Result<Self, QcError> {
        Ok(PipelineBuilder::standard(config, catalog).build()?)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dataset read by the first stage.
    #[must_use]
    pub fn source(&self) -> &DatasetDir {
        &self.source
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Resolves the station universe: the given ids, deduplicated and
    /// sorted, or every station in the source dataset.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::StageSetup`] if the source cannot be listed.
    pub fn universe(&self, station_ids: Option<Vec<StationId>>) -> Result<Vec<StationId>, QcError> {
        let ids: BTreeSet<StationId> = match station_ids {
            Some(ids) => ids.into_iter().collect(),
            None => {
                let first = self.stages.first().map_or(self.name.as_str(), |s| s.name.as_str());
                self.source
                    .station_ids()
                    .map_err(|e| QcError::stage_setup(first, self.source.root(), e))?
            }
        };
        Ok(ids.into_iter().collect())
    }

    /// Runs every stage over the same universe.
    ///
    /// # Errors
    ///
    /// Returns the first stage's setup error; stages after it do not run and
    /// outputs of earlier stages are left in place.
    pub async fn run(&self, station_ids: Option<Vec<StationId>>) -> Result<PipelineReport, QcError> {
        let start = Instant::now();
        let universe = self.universe(station_ids)?;
        let mut report = PipelineReport::new(self.name.clone(), universe.len());
        let span = info_span!("pipeline", name = %self.name, run_id = %report.run_id);

        async {
            info!(stations = universe.len(), stages = self.stages.len(), "Starting pipeline");
            self.events
                .emit(
                    PIPELINE_STARTED,
                    Some(serde_json::json!({
                        "pipeline": self.name,
                        "run_id": report.run_id,
                        "stations": universe.len(),
                        "stages": self.stage_names(),
                    })),
                )
                .await;

            for stage in &self.stages {
                let stage_report = self.runner.run(stage, &universe).await?;
                if stage_report.cancelled {
                    warn!(stage = %stage.name, "Stage cancelled before all stations were dispatched");
                }
                report.stages.push(stage_report);
            }

            report.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            info!(
                failed = report.total_failed(),
                duration_ms = report.duration_ms,
                "Pipeline completed"
            );
            self.events
                .emit(
                    PIPELINE_COMPLETED,
                    Some(serde_json::json!({
                        "pipeline": self.name,
                        "run_id": report.run_id,
                        "failed": report.total_failed(),
                    })),
                )
                .await;

            Ok::<_, QcError>(report)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("stages", &self.stage_names())
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}
