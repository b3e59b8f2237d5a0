//! Core domain model types for stationqc.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Station identifiers
//! - Per-unit check status and outcome
//! - Per-stage and per-run reports

mod outcome;
mod report;
mod station;
mod status;

pub use outcome::CheckOutcome;
pub use report::{PipelineReport, StageReport, StationFailure};
pub use station::StationId;
pub use status::CheckStatus;
