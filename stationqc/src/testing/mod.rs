//! Testing utilities for stationqc pipelines.
//!
//! This module provides:
//! - Scripted checks with per-station failures, panics and delays
//! - Dataset fixtures that write station files to scratch directories
//! - Assertions over outcomes and stage reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_one_outcome_per_station, assert_report_counts, assert_stage_consistent};
pub use fixtures::{sample_record, StationFixture};
pub use mocks::ScriptedCheck;
