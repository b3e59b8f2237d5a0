//! # Stationqc
//!
//! Staged, parallel quality control for daily climate-station records.
//!
//! A pipeline runs a fixed sequence of checks over a set of independent
//! station files:
//!
//! - **Stage chaining**: each stage reads the directory the previous one
//!   wrote; a station that fails a stage is simply absent downstream
//! - **Bounded parallelism**: within a stage every station is an
//!   independent unit, dispatched to a worker pool of configurable size
//! - **Outcome aggregation**: every unit yields exactly one outcome, folded
//!   into a per-stage report
//! - **Event-driven observability**: progress events for presentation layers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stationqc::prelude::*;
//!
//! let config = PipelineConfig::load("stationqc.toml")?;
//! let catalog = Arc::new(StationCatalog::load("stations.csv")?);
//!
//! let pipeline = Pipeline::standard(&config, Some(catalog))?;
//! let report = pipeline.run(None).await?;
//!
//! for stage in &report.stages {
//!     println!("{}: {} ok, {} failed", stage.stage, stage.succeeded, stage.failed);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod cancellation;
pub mod catalog;
pub mod checks;
pub mod config;
pub mod core;
pub mod dataset;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod pool;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::catalog::{StationCatalog, StationMeta};
    pub use crate::checks::{
        apply_check, CheckContext, IntegrityCheck, IntegrityParams, OutlierCheck, OutlierParams,
        PersistenceCheck, PersistenceParams, StationCheck,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        CheckOutcome, CheckStatus, PipelineReport, StageReport, StationFailure, StationId,
    };
    pub use crate::dataset::{DatasetDir, StationRecord};
    pub use crate::errors::{CheckError, PipelineValidationError, QcError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, StageRunner, StageSpec};
    pub use crate::pool::{Concurrency, SequentialPool, StageBatch, TokioWorkerPool, WorkerPool};
}
