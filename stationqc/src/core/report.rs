//! Stage and pipeline reports.

use super::{CheckOutcome, StationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One failed station as recorded in a [`StageReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationFailure {
    /// The station that failed.
    pub station_id: StationId,
    /// The outcome's diagnostic message.
    pub message: String,
}

/// Aggregate over one stage's run.
///
/// Invariant: `submitted == succeeded + failed`. Failures are kept in
/// completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage name.
    pub stage: String,
    /// Number of stations submitted.
    pub submitted: usize,
    /// Number of successful outcomes.
    pub succeeded: usize,
    /// Number of failed outcomes.
    pub failed: usize,
    /// Failed stations in completion order.
    pub failures: Vec<StationFailure>,
    /// Stage wall time in milliseconds.
    pub duration_ms: f64,
    /// Whether the stage was cancelled before every unit was dispatched.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl StageReport {
    /// Creates an empty report for a stage.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            submitted: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            duration_ms: 0.0,
            cancelled: false,
        }
    }

    /// Folds a batch of outcomes into a report.
    #[must_use]
    pub fn from_outcomes<'a>(
        stage: impl Into<String>,
        outcomes: impl IntoIterator<Item = &'a CheckOutcome>,
    ) -> Self {
        let mut report = Self::new(stage);
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    /// Records one outcome.
    pub fn record(&mut self, outcome: &CheckOutcome) {
        self.submitted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push(StationFailure {
                station_id: outcome.station_id.clone(),
                message: outcome.message.clone(),
            });
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Marks the report as cancelled.
    #[must_use]
    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Returns true if any station failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Returns the failures sorted by station id.
    #[must_use]
    pub fn sorted_failures(&self) -> Vec<&StationFailure> {
        let mut failures: Vec<&StationFailure> = self.failures.iter().collect();
        failures.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        failures
    }

    /// Returns true if the station failed at this stage.
    #[must_use]
    pub fn has_failed(&self, station_id: &str) -> bool {
        self.failures.iter().any(|f| f.station_id.as_str() == station_id)
    }
}

/// The reports of one pipeline invocation, in stage execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Size of the station-id universe.
    pub universe: usize,
    /// One report per stage, in execution order.
    pub stages: Vec<StageReport>,
    /// Total wall time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineReport {
    /// Creates an empty report for a run over `universe` stations.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, universe: usize) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            pipeline: pipeline.into(),
            started_at: Utc::now(),
            universe,
            stages: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Returns true if any stage had failed units.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(StageReport::has_failures)
    }

    /// Returns the report of a named stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Returns the total number of failed units across stages.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.stages.iter().map(|s| s.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outcomes() -> Vec<CheckOutcome> {
        vec![
            CheckOutcome::failed("C3".into(), "bad"),
            CheckOutcome::success("A1".into()),
            CheckOutcome::failed("B2".into(), "missing"),
        ]
    }

    #[test]
    fn test_from_outcomes_counts() {
        let report = StageReport::from_outcomes("integrity", &outcomes());

        assert_eq!(report.submitted, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.submitted, report.succeeded + report.failed);
        assert!(report.has_failures());
        assert!(report.has_failed("B2"));
        assert!(!report.has_failed("A1"));
    }

    #[test]
    fn test_failures_keep_completion_order() {
        let report = StageReport::from_outcomes("integrity", &outcomes());
        let messages: Vec<&str> = report.failures.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["C3: bad", "B2: missing"]);
    }

    #[test]
    fn test_sorted_failures() {
        let report = StageReport::from_outcomes("integrity", &outcomes());
        let ids: Vec<&str> = report
            .sorted_failures()
            .iter()
            .map(|f| f.station_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B2", "C3"]);
    }

    #[test]
    fn test_empty_report() {
        let report = StageReport::from_outcomes("outlier", &[]);
        assert_eq!(report.submitted, 0);
        assert!(!report.has_failures());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_pipeline_report_failures() {
        let mut report = PipelineReport::new("qc", 3);
        report.stages.push(StageReport::from_outcomes("a", &[CheckOutcome::success("A1".into())]));
        assert!(!report.has_failures());

        report.stages.push(StageReport::from_outcomes("b", &outcomes()));
        assert!(report.has_failures());
        assert_eq!(report.total_failed(), 2);
        assert_eq!(report.stage("b").map(|s| s.submitted), Some(3));
    }
}
