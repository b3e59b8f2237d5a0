//! Pipeline builder with validation.

use super::{Pipeline, StageRunner, StageSpec};
use crate::cancellation::CancellationToken;
use crate::catalog::StationCatalog;
use crate::checks::{IntegrityCheck, OutlierCheck, PersistenceCheck, StationCheck};
use crate::config::{PipelineConfig, INTEGRITY_STAGE, OUTLIER_STAGE, PERSISTENCE_STAGE};
use crate::dataset::DatasetDir;
use crate::errors::PipelineValidationError;
use crate::events::{EventSink, NoOpEventSink};
use crate::pool::{Concurrency, TokioWorkerPool, WorkerPool};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Builder for creating validated pipelines.
///
/// Each stage reads the previous stage's output; the first reads the
/// source. `build()` rejects any layout where a stage would overwrite a
/// dataset another stage still reads.
pub struct PipelineBuilder {
    name: String,
    source: Option<DatasetDir>,
    stages: Vec<StageSpec>,
    catalog: Option<Arc<StationCatalog>>,
    concurrency: Concurrency,
    pool: Option<Arc<dyn WorkerPool>>,
    events: Arc<dyn EventSink>,
    cancel: Option<CancellationToken>,
    deferred: Option<PipelineValidationError>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            stages: Vec::new(),
            catalog: None,
            concurrency: Concurrency::Auto,
            pool: None,
            events: Arc::new(NoOpEventSink),
            cancel: None,
            deferred: None,
        }
    }

    /// Builds the integrity, outlier and persistence chain described by
    /// `config`.
    #[must_use]
    pub fn standard(config: &PipelineConfig, catalog: Option<Arc<StationCatalog>>) -> Self {
        let source = config.source();
        let integrity = config.stage_output(INTEGRITY_STAGE);
        let outlier = config.stage_output(OUTLIER_STAGE);
        let persistence = config.stage_output(PERSISTENCE_STAGE);

        let mut builder = Self::new(&config.name)
            .source(source.clone())
            .concurrency(config.concurrency)
            .stage(
                StageSpec::new(
                    INTEGRITY_STAGE,
                    Arc::new(IntegrityCheck::new(config.integrity.params.clone())),
                    source,
                    integrity.clone(),
                )
                .with_concurrency(config.stage_concurrency(INTEGRITY_STAGE)),
            )
            .stage(
                StageSpec::new(
                    OUTLIER_STAGE,
                    Arc::new(OutlierCheck::new(config.outlier.params.clone())),
                    integrity,
                    outlier.clone(),
                )
                .with_concurrency(config.stage_concurrency(OUTLIER_STAGE)),
            )
            .stage(
                StageSpec::new(
                    PERSISTENCE_STAGE,
                    Arc::new(PersistenceCheck::new(config.persistence.params.clone())),
                    outlier,
                    persistence,
                )
                .with_concurrency(config.stage_concurrency(PERSISTENCE_STAGE)),
            );

        if let Some(catalog) = catalog {
            builder = builder.catalog(catalog);
        }
        builder
    }

    /// Sets the dataset the first stage reads.
    #[must_use]
    pub fn source(mut self, source: DatasetDir) -> Self {
        self.source = Some(source);
        self
    }

    /// Appends a fully specified stage.
    #[must_use]
    pub fn stage(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    /// Appends a stage reading the previous stage's output (or the source)
    /// and writing to `output`.
    #[must_use]
    pub fn then(
        mut self,
        name: impl Into<String>,
        check: Arc<dyn StationCheck>,
        output: DatasetDir,
    ) -> Self {
        let name = name.into();
        let input = self
            .stages
            .last()
            .map(|s| s.output.clone())
            .or_else(|| self.source.clone());
        match input {
            Some(input) => self.stage(StageSpec::new(name, check, input, output)),
            None => {
                self.deferred.get_or_insert_with(|| {
                    PipelineValidationError::new(format!("Stage '{name}' has no input"))
                        .with_stages(vec![name])
                        .with_fix_hint("Set the source dataset before chaining stages.")
                });
                self
            }
        }
    }

    /// Sets the catalog handed to catalog-dependent stages that do not carry
    /// their own.
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<StationCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the concurrency for stages that do not carry their own.
    #[must_use]
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the worker pool. Defaults to a [`TokioWorkerPool`] reporting to
    /// the builder's event sink.
    #[must_use]
    pub fn pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the token that stops dispatch in every stage.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates the stage layout and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no stages, names repeat, a stage does
    /// not read its predecessor's output, a stage writes to a dataset that
    /// is already read or written, or a catalog-dependent check has no
    /// catalog.
    pub fn build(mut self) -> Result<Pipeline, PipelineValidationError> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let Some(first) = self.stages.first() else {
            return Err(PipelineValidationError::new("Pipeline has no stages")
                .with_fix_hint("Add at least one stage to the pipeline before building."));
        };
        let source = self.source.clone().unwrap_or_else(|| first.input.clone());

        let mut names = HashSet::new();
        let mut used: Vec<&Path> = vec![source.root()];
        let mut expected_input = &source;

        for stage in &mut self.stages {
            if !names.insert(stage.name.clone()) {
                return Err(PipelineValidationError::new(format!(
                    "Duplicate stage name '{}'",
                    stage.name
                ))
                .with_stages(vec![stage.name.clone()]));
            }

            if stage.input != *expected_input {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' reads {} but the preceding dataset is {}",
                    stage.name,
                    stage.input.root().display(),
                    expected_input.root().display()
                ))
                .with_stages(vec![stage.name.clone()])
                .with_fix_hint("Each stage must read the previous stage's output directory."));
            }

            if used.contains(&stage.output.root()) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' writes to {}, which is already an input or output of this pipeline",
                    stage.name,
                    stage.output.root().display()
                ))
                .with_stages(vec![stage.name.clone()])
                .with_fix_hint("Give every stage its own output directory."));
            }

            if stage.catalog.is_none() && stage.check.requires_catalog() {
                stage.catalog = self.catalog.clone();
            }
            if stage.check.requires_catalog() && stage.catalog.is_none() {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' runs check '{}' which requires a station catalog",
                    stage.name,
                    stage.check.name()
                ))
                .with_stages(vec![stage.name.clone()])
                .with_fix_hint("Provide a catalog to the builder or the stage."));
            }

            used.push(stage.output.root());
            expected_input = &stage.output;
        }

        let pool: Arc<dyn WorkerPool> = match self.pool {
            Some(pool) => pool,
            None => Arc::new(TokioWorkerPool::new().with_event_sink(Arc::clone(&self.events))),
        };
        let mut runner = StageRunner::new(pool)
            .with_event_sink(Arc::clone(&self.events))
            .with_concurrency(self.concurrency);
        if let Some(token) = self.cancel {
            runner = runner.with_cancellation(token);
        }

        Ok(Pipeline::new(self.name, source, self.stages, runner, self.events))
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("stages", &self.stages.iter().map(|s| &s.name).collect::<Vec<_>>())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
