//! Per-unit check outcome.

use super::{CheckStatus, StationId};
use serde::{Deserialize, Serialize};

/// The result of applying one check to one station.
///
/// Exactly one outcome exists for every station submitted to a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// The station the check ran for.
    pub station_id: StationId,
    /// Success or failure.
    pub status: CheckStatus,
    /// Diagnostic message, empty on success.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Wall time spent on the unit in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
    /// True if the unit was never dispatched because its batch was cancelled.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl CheckOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(station_id: StationId) -> Self {
        Self {
            station_id,
            status: CheckStatus::Success,
            message: String::new(),
            duration_ms: 0.0,
            skipped: false,
        }
    }

    /// Creates a failed outcome.
    ///
    /// The message is prefixed with the station id so it stays meaningful
    /// once detached from the outcome.
    #[must_use]
    pub fn failed(station_id: StationId, reason: impl std::fmt::Display) -> Self {
        let message = format!("{station_id}: {reason}");
        Self {
            station_id,
            status: CheckStatus::Failed,
            message,
            duration_ms: 0.0,
            skipped: false,
        }
    }

    /// Creates the failed outcome of a unit that was never dispatched.
    #[must_use]
    pub fn skipped(station_id: StationId, reason: impl std::fmt::Display) -> Self {
        Self {
            skipped: true,
            ..Self::failed(station_id, reason)
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the outcome is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the outcome is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_empty_message() {
        let outcome = CheckOutcome::success("A001".into());
        assert!(outcome.is_success());
        assert!(outcome.message.is_empty());
    }

    #[test]
    fn test_failed_message_names_station() {
        let outcome = CheckOutcome::failed("A002".into(), "input file not found");
        assert!(outcome.is_failure());
        assert_eq!(outcome.message, "A002: input file not found");
    }

    #[test]
    fn test_success_serialization_omits_message() {
        let outcome = CheckOutcome::success("A001".into()).with_duration_ms(1.5);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("message").is_none());
        assert_eq!(json["duration_ms"], 1.5);
        assert!(json.get("skipped").is_none());
    }

    #[test]
    fn test_skipped_is_a_flagged_failure() {
        let outcome = CheckOutcome::skipped("A003".into(), "cancelled before dispatch");
        assert!(outcome.is_failure());
        assert!(outcome.skipped);
        assert_eq!(outcome.message, "A003: cancelled before dispatch");
        assert!(!CheckOutcome::failed("A003".into(), "cancelled before dispatch").skipped);
    }
}
