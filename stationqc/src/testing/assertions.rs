//! Assertions over outcomes and reports.

use std::collections::BTreeSet;

use crate::core::{CheckOutcome, StageReport, StationId};

/// Asserts that `outcomes` holds exactly one outcome per id in `ids`.
///
/// # Panics
///
/// Panics on a missing, duplicated or unexpected station.
pub fn assert_one_outcome_per_station(outcomes: &[CheckOutcome], ids: &[StationId]) {
    assert_eq!(
        outcomes.len(),
        ids.len(),
        "expected {} outcomes, got {}",
        ids.len(),
        outcomes.len()
    );
    let got: BTreeSet<&StationId> = outcomes.iter().map(|o| &o.station_id).collect();
    let expected: BTreeSet<&StationId> = ids.iter().collect();
    assert_eq!(got.len(), outcomes.len(), "duplicate outcomes");
    assert_eq!(got, expected, "outcome ids differ from submitted ids");
}

/// Asserts a report's counters.
///
/// # Panics
///
/// Panics if any counter differs.
pub fn assert_report_counts(report: &StageReport, submitted: usize, succeeded: usize, failed: usize) {
    assert_eq!(
        (report.submitted, report.succeeded, report.failed),
        (submitted, succeeded, failed),
        "stage '{}' counts (submitted, succeeded, failed)",
        report.stage
    );
    assert_stage_consistent(report);
}

/// Asserts that a report's counters add up and match its failure list.
///
/// # Panics
///
/// Panics if the report is inconsistent.
pub fn assert_stage_consistent(report: &StageReport) {
    assert_eq!(
        report.submitted,
        report.succeeded + report.failed,
        "stage '{}' submitted != succeeded + failed",
        report.stage
    );
    assert_eq!(report.failures.len(), report.failed, "stage '{}' failure list", report.stage);
}
