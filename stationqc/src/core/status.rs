//! Per-unit check status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict of applying one check to one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// The station's output file was written.
    Success,
    /// The station produced no output at this stage.
    Failed,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl CheckStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_display() {
        assert_eq!(CheckStatus::Success.to_string(), "success");
        assert_eq!(CheckStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_check_status_predicates() {
        assert!(CheckStatus::Success.is_success());
        assert!(!CheckStatus::Success.is_failure());
        assert!(CheckStatus::Failed.is_failure());
    }

    #[test]
    fn test_check_status_serialize() {
        let json = serde_json::to_string(&CheckStatus::Failed).unwrap();
        assert_eq!(json, r#""failed""#);

        let deserialized: CheckStatus = serde_json::from_str(r#""success""#).unwrap();
        assert_eq!(deserialized, CheckStatus::Success);
    }
}
