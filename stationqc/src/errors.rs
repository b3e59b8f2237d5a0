//! Error types for the stationqc pipeline.
//!
//! Errors come in two tiers. [`CheckError`] describes why a single station
//! could not be checked; it never crosses a stage boundary and is folded into
//! a failed [`CheckOutcome`](crate::core::CheckOutcome). [`QcError`] covers
//! faults that stop a stage (or the whole pipeline invocation) before any
//! unit runs.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline-level operations.
#[derive(Debug, Error)]
pub enum QcError {
    /// A stage could not begin (output directory, input enumeration).
    #[error("Stage '{stage}' setup failed at {}: {source}", path.display())]
    StageSetup {
        /// The stage that failed to start.
        stage: String,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("Worker pool '{pool}' unavailable: {reason}")]
    PoolUnavailable {
        /// The pool implementation name.
        pool: String,
        /// Why no workers could be obtained.
        reason: String,
    },

    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// The station catalog could not be loaded.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QcError {
    /// Creates a stage setup error.
    #[must_use]
    pub fn stage_setup(
        stage: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::StageSetup {
            stage: stage.into(),
            path: path.into(),
            source,
        }
    }

    /// Creates a pool unavailable error.
    #[must_use]
    pub fn pool_unavailable(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PoolUnavailable {
            pool: pool.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error stopped a stage before it dispatched work.
    #[must_use]
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::StageSetup { .. } | Self::PoolUnavailable { .. })
    }
}

/// Why a single station's check could not complete.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The station's file is absent from the input dataset.
    #[error("input file not found: {}", path.display())]
    MissingInput {
        /// The expected input path.
        path: PathBuf,
    },

    /// The input file exists but could not be parsed.
    #[error("malformed record: {0}")]
    Malformed(#[from] RecordError),

    /// The check's validation judged the record unrecoverable.
    #[error("rejected by {check}: {reason}")]
    Rejected {
        /// The check that rejected the record.
        check: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The check needs the station catalog but none was supplied.
    #[error("{check} requires a station catalog")]
    MissingCatalog {
        /// The check that required the catalog.
        check: String,
    },

    /// The check panicked.
    #[error("check panicked: {0}")]
    Panicked(String),

    /// IO error while reading or writing the station's file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(check: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            check: check.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a station record cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The file has no header row.
    #[error("missing header row")]
    MissingHeader,

    /// The header has no date column.
    #[error("missing '{0}' column")]
    MissingDateColumn(String),

    /// A row could not be read as CSV.
    #[error("line {line}: {message}")]
    Csv {
        /// 1-based line number.
        line: u64,
        /// The CSV reader's message.
        message: String,
    },

    /// A row has a different number of fields than the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    Ragged {
        /// 1-based line number.
        line: u64,
        /// Field count in the header.
        expected: usize,
        /// Field count in the row.
        found: usize,
    },

    /// A date cell could not be parsed.
    #[error("line {line}: invalid date '{value}'")]
    InvalidDate {
        /// 1-based line number.
        line: u64,
        /// The offending cell.
        value: String,
    },

    /// A value cell could not be parsed as a number.
    #[error("line {line}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        /// 1-based line number.
        line: u64,
        /// The column name.
        column: String,
        /// The offending cell.
        value: String,
    },

    /// Dates are not strictly increasing.
    #[error("line {line}: date {date} does not follow {previous}")]
    OutOfOrder {
        /// 1-based line number.
        line: u64,
        /// The offending date.
        date: String,
        /// The date of the preceding row.
        previous: String,
    },
}

/// Error raised when the station catalog cannot be loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("cannot read station catalog {}: {source}", path.display())]
    Read {
        /// The catalog path.
        path: PathBuf,
        /// The CSV reader error.
        #[source]
        source: csv::Error,
    },

    /// The catalog has no station id column.
    #[error("station catalog has no station id column (expected one of: {})", expected.join(", "))]
    MissingIdColumn {
        /// Accepted column names.
        expected: Vec<String>,
    },

    /// A numeric catalog field could not be parsed.
    #[error("station '{station}': invalid {field} '{value}'")]
    InvalidField {
        /// The station id of the row.
        station: String,
        /// The field name.
        field: String,
        /// The offending value.
        value: String,
    },

    /// The same station appears twice.
    #[error("station '{0}' is listed more than once")]
    Duplicate(String),
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            fix_hint: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_setup_display() {
        let err = QcError::stage_setup(
            "integrity",
            "/data/out",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("integrity"));
        assert!(msg.contains("/data/out"));
        assert!(err.is_setup_failure());
    }

    #[test]
    fn test_pool_unavailable_is_setup_failure() {
        let err = QcError::pool_unavailable("tokio", "no runtime");
        assert!(err.is_setup_failure());
        assert_eq!(err.to_string(), "Worker pool 'tokio' unavailable: no runtime");
    }

    #[test]
    fn test_config_is_not_setup_failure() {
        assert!(!QcError::Config("bad".into()).is_setup_failure());
    }

    #[test]
    fn test_check_error_messages() {
        let err = CheckError::rejected("outlier", "no valid values");
        assert_eq!(err.to_string(), "rejected by outlier: no valid values");

        let err = CheckError::MissingInput {
            path: PathBuf::from("in/A001.csv"),
        };
        assert_eq!(err.to_string(), "input file not found: in/A001.csv");

        let err: CheckError = RecordError::MissingHeader.into();
        assert_eq!(err.to_string(), "malformed record: missing header row");
    }

    #[test]
    fn test_validation_error_keeps_context() {
        let err = PipelineValidationError::new("Pipeline has no stages")
            .with_stages(vec!["a".into()])
            .with_fix_hint("Add a stage");

        assert_eq!(err.stages, vec!["a".to_string()]);
        assert_eq!(err.fix_hint.as_deref(), Some("Add a stage"));
        let err: QcError = err.into();
        assert_eq!(err.to_string(), "Pipeline has no stages");
        assert!(!err.is_setup_failure());
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: QcError = CatalogError::Duplicate("A001".into()).into();
        assert!(matches!(err, QcError::Catalog(CatalogError::Duplicate(_))));
        assert_eq!(err.to_string(), "station 'A001' is listed more than once");
    }
}
