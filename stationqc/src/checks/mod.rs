//! Per-station quality-control checks.
//!
//! Every check implements [`StationCheck`]: a pure transform of one parsed
//! station record. The file-level contract is enforced once, in
//! [`apply_check`]:
//! - exactly one input file is read, named by the station id
//! - exactly one output file is written, atomically, and only on success
//! - every error or panic becomes a failed [`CheckOutcome`]

mod integrity;
mod outlier;
mod persistence;

pub use integrity::{IntegrityCheck, IntegrityParams};
pub use outlier::{OutlierCheck, OutlierParams};
pub use persistence::{PersistenceCheck, PersistenceParams};

use crate::catalog::StationCatalog;
use crate::core::{CheckOutcome, StationId};
use crate::dataset::{DatasetDir, StationRecord};
use crate::errors::CheckError;
use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// What a check may look at besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// The station being checked.
    pub station_id: &'a StationId,
    /// The station catalog, when the stage supplies one.
    pub catalog: Option<&'a StationCatalog>,
}

/// Trait for quality-control checks.
///
/// Implementations must be safe to call concurrently for different
/// stations and keep no mutable state between calls.
pub trait StationCheck: Send + Sync + Debug {
    /// Returns the name of the check.
    fn name(&self) -> &str;

    /// Returns true if the check cannot run without the station catalog.
    fn requires_catalog(&self) -> bool {
        false
    }

    /// Checks one record, returning the corrected record.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Rejected`] when the record is unrecoverable.
    fn check(
        &self,
        ctx: &CheckContext<'_>,
        record: StationRecord,
    ) -> Result<StationRecord, CheckError>;
}

/// Applies a check to one station, reading from `input` and writing to
/// `output`.
///
/// Never panics and never returns an error: the outcome carries the verdict.
/// On failure any file left in `output` for this station by an earlier run is
/// removed, so presence in `output` always means success.
pub fn apply_check(
    check: &dyn StationCheck,
    station_id: &StationId,
    input: &DatasetDir,
    output: &DatasetDir,
    catalog: Option<&StationCatalog>,
) -> CheckOutcome {
    let start = Instant::now();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        run_unit(check, station_id, input, output, catalog)
    }))
    .unwrap_or_else(|payload| Err(CheckError::Panicked(panic_message(payload.as_ref()))));

    let outcome = match result {
        Ok(()) => {
            debug!(check = check.name(), station = %station_id, "Station passed");
            CheckOutcome::success(station_id.clone())
        }
        Err(err) => {
            debug!(check = check.name(), station = %station_id, error = %err, "Station failed");
            if station_id.is_file_safe() {
                if let Err(e) = output.discard(station_id) {
                    warn!(station = %station_id, error = %e, "Could not remove stale output");
                }
            }
            CheckOutcome::failed(station_id.clone(), err)
        }
    };

    outcome.with_duration_ms(start.elapsed().as_secs_f64() * 1000.0)
}

fn run_unit(
    check: &dyn StationCheck,
    station_id: &StationId,
    input: &DatasetDir,
    output: &DatasetDir,
    catalog: Option<&StationCatalog>,
) -> Result<(), CheckError> {
    if !station_id.is_file_safe() {
        return Err(CheckError::rejected(
            check.name(),
            "station id cannot name a dataset file",
        ));
    }
    if check.requires_catalog() && catalog.is_none() {
        return Err(CheckError::MissingCatalog {
            check: check.name().to_string(),
        });
    }

    let content = input.read(station_id)?;
    let record = StationRecord::parse(&content)?;

    let ctx = CheckContext {
        station_id,
        catalog,
    };
    let checked = check.check(&ctx, record)?;

    output.write_atomic(station_id, &checked.to_csv()?)?;
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
