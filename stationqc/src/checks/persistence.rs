//! Third-stage check: stuck-sensor detection.

use super::{CheckContext, StationCheck};
use crate::dataset::StationRecord;
use crate::errors::CheckError;
use chrono::Days;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of [`PersistenceCheck`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceParams {
    /// Length at which a run of identical values is considered stuck.
    #[serde(default = "default_max_run")]
    pub max_run: usize,
}

fn default_max_run() -> usize {
    10
}

impl Default for PersistenceParams {
    fn default() -> Self {
        Self {
            max_run: default_max_run(),
        }
    }
}

/// Blanks runs of identical non-zero values on consecutive days.
///
/// Runs of zeros are kept: long dry spells are real.
#[derive(Debug, Clone, Default)]
pub struct PersistenceCheck {
    params: PersistenceParams,
}

impl PersistenceCheck {
    /// Creates the check.
    #[must_use]
    pub fn new(params: PersistenceParams) -> Self {
        Self { params }
    }

    /// Returns `(start, len)` of every stuck run in one column.
    fn stuck_runs(&self, record: &StationRecord, column: usize) -> Vec<(usize, usize)> {
        let rows = record.rows();
        let max_run = self.params.max_run.max(2);
        let mut runs = Vec::new();
        let mut start = 0;

        for idx in 1..=rows.len() {
            let continues = idx < rows.len() && {
                let prev = &rows[idx - 1];
                let curr = &rows[idx];
                let next_day = prev.date.checked_add_days(Days::new(1)) == Some(curr.date);
                let same = match (prev.values.get(column), curr.values.get(column)) {
                    (Some(Some(a)), Some(Some(b))) => a == b && *a != 0.0,
                    _ => false,
                };
                next_day && same
            };

            if !continues {
                let len = idx - start;
                let stuck = rows[start]
                    .values
                    .get(column)
                    .copied()
                    .flatten()
                    .is_some_and(|v| v != 0.0);
                if len >= max_run && stuck {
                    runs.push((start, len));
                }
                start = idx;
            }
        }

        runs
    }
}

impl StationCheck for PersistenceCheck {
    fn name(&self) -> &str {
        "persistence"
    }

    fn check(
        &self,
        ctx: &CheckContext<'_>,
        mut record: StationRecord,
    ) -> Result<StationRecord, CheckError> {
        let mut flagged = 0usize;

        for column in 0..record.columns().len() {
            for (start, len) in self.stuck_runs(&record, column) {
                for row in start..start + len {
                    if record.set_missing(row, column) {
                        flagged += 1;
                    }
                }
            }
        }

        if record.valid_count() == 0 {
            return Err(CheckError::rejected(self.name(), "no valid values"));
        }

        debug!(station = %ctx.station_id, flagged, "Persistence check done");
        Ok(record)
    }
}
