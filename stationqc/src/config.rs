//! Pipeline configuration loaded from TOML.
//!
//! ```toml
//! source_dir = "data/merged"
//! catalog = "data/stations.csv"
//! concurrency = "auto"
//!
//! [integrity]
//! output_dir = "data/integrity"
//! max_value = 1500.0
//!
//! [outlier]
//! concurrency = 4
//! threshold = 6.0
//!
//! [persistence]
//! max_run = 12
//! ```
//!
//! Every key is optional. Stage output directories default to siblings of
//! `source_dir` named after the stage.

use crate::catalog::StationCatalog;
use crate::checks::{IntegrityParams, OutlierParams, PersistenceParams};
use crate::core::StationId;
use crate::dataset::{DatasetDir, DEFAULT_EXTENSION};
use crate::errors::QcError;
use crate::pool::Concurrency;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the first stage.
pub const INTEGRITY_STAGE: &str = "integrity";
/// Name of the second stage.
pub const OUTLIER_STAGE: &str = "outlier";
/// Name of the third stage.
pub const PERSISTENCE_STAGE: &str = "persistence";

/// Settings of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig<P> {
    /// Where the stage writes; defaults to a sibling of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Overrides the pipeline-wide concurrency for this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    /// Check parameters.
    #[serde(flatten)]
    pub params: P,
}

/// Configuration of the standard three-stage pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name used in reports and logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory of merged station files read by the first stage.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Station catalog CSV.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Extension of station files.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Restricts the run to these stations instead of the whole source.
    #[serde(default)]
    pub stations: Option<Vec<StationId>>,
    /// Workers per stage unless a stage overrides it.
    #[serde(default)]
    pub concurrency: Concurrency,
    /// First stage.
    #[serde(default)]
    pub integrity: StageConfig<IntegrityParams>,
    /// Second stage.
    #[serde(default)]
    pub outlier: StageConfig<OutlierParams>,
    /// Third stage.
    #[serde(default)]
    pub persistence: StageConfig<PersistenceParams>,
}

fn default_name() -> String {
    "station-qc".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("data").join("merged")
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            source_dir: default_source_dir(),
            catalog: None,
            extension: default_extension(),
            stations: None,
            concurrency: Concurrency::Auto,
            integrity: StageConfig::default(),
            outlier: StageConfig::default(),
            persistence: StageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QcError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| QcError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| QcError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::Config`] if the text is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, QcError> {
        let config: Self = toml::from_str(content).map_err(|e| QcError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the source directory.
    #[must_use]
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Sets the catalog path.
    #[must_use]
    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog = Some(path.into());
        self
    }

    /// Sets the pipeline-wide concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Restricts the run to the given stations.
    #[must_use]
    pub fn with_stations(mut self, stations: Vec<StationId>) -> Self {
        self.stations = Some(stations);
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::Config`] naming the first bad value.
    pub fn validate(&self) -> Result<(), QcError> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(QcError::Config("extension must not be empty".to_string()));
        }
        let integrity = &self.integrity.params;
        if integrity.min_value >= integrity.max_value {
            return Err(QcError::Config(format!(
                "integrity.min_value ({}) must be below integrity.max_value ({})",
                integrity.min_value, integrity.max_value
            )));
        }
        let threshold = self.outlier.params.threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(QcError::Config(format!(
                "outlier.threshold must be positive, got {threshold}"
            )));
        }
        if self.persistence.params.max_run < 2 {
            return Err(QcError::Config(format!(
                "persistence.max_run must be at least 2, got {}",
                self.persistence.params.max_run
            )));
        }
        Ok(())
    }

    /// Loads the configured station catalog, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::Catalog`] if the file cannot be read or parsed.
    pub fn load_catalog(&self) -> Result<Option<Arc<StationCatalog>>, QcError> {
        let Some(path) = &self.catalog else {
            return Ok(None);
        };
        let catalog = StationCatalog::load(path)?;
        Ok(Some(Arc::new(catalog)))
    }

    /// Returns the dataset read by the first stage.
    #[must_use]
    pub fn source(&self) -> DatasetDir {
        DatasetDir::new(&self.source_dir, &self.extension)
    }

    /// Returns the dataset written by a stage.
    ///
    /// Unknown stage names resolve like a stage without an explicit
    /// `output_dir`.
    #[must_use]
    pub fn stage_output(&self, stage: &str) -> DatasetDir {
        let configured = match stage {
            INTEGRITY_STAGE => self.integrity.output_dir.as_ref(),
            OUTLIER_STAGE => self.outlier.output_dir.as_ref(),
            PERSISTENCE_STAGE => self.persistence.output_dir.as_ref(),
            _ => None,
        };
        let root = configured.cloned().unwrap_or_else(|| {
            self.source_dir
                .parent()
                .map_or_else(|| PathBuf::from(stage), |parent| parent.join(stage))
        });
        DatasetDir::new(root, &self.extension)
    }

    /// Returns a stage's concurrency, falling back to the pipeline-wide one.
    #[must_use]
    pub fn stage_concurrency(&self, stage: &str) -> Concurrency {
        let configured = match stage {
            INTEGRITY_STAGE => self.integrity.concurrency,
            OUTLIER_STAGE => self.outlier.concurrency,
            PERSISTENCE_STAGE => self.persistence.concurrency,
            _ => None,
        };
        configured.unwrap_or(self.concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.source().root(), Path::new("data/merged"));
        assert_eq!(config.stage_output(OUTLIER_STAGE).root(), Path::new("data/outlier"));
        assert_eq!(config.integrity.params, IntegrityParams::default());
        assert_eq!(config.stage_concurrency(PERSISTENCE_STAGE), Concurrency::Auto);
    }

    #[test]
    fn test_full_file() {
        let config = PipelineConfig::from_toml_str(
            r#"
            name = "tibet"
            source_dir = "/srv/qc/merged"
            catalog = "/srv/qc/stations.csv"
            extension = "txt"
            stations = ["A001", "A002"]
            concurrency = 8

            [integrity]
            output_dir = "/srv/qc/a"
            max_value = 1500.0

            [outlier]
            concurrency = "auto"
            threshold = 6

            [persistence]
            concurrency = 1
            max_run = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "tibet");
        assert_eq!(config.catalog, Some(PathBuf::from("/srv/qc/stations.csv")));
        assert_eq!(config.stations.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.stage_output(INTEGRITY_STAGE), DatasetDir::new("/srv/qc/a", "txt"));
        assert_eq!(config.stage_output(PERSISTENCE_STAGE).root(), Path::new("/srv/qc/persistence"));
        assert_eq!(config.integrity.params.max_value, 1500.0);
        assert_eq!(config.integrity.params.min_value, -90.0);
        assert_eq!(config.outlier.params.threshold, 6.0);
        assert_eq!(config.persistence.params.max_run, 12);
        assert_eq!(config.stage_concurrency(INTEGRITY_STAGE), Concurrency::fixed(8));
        assert_eq!(config.stage_concurrency(OUTLIER_STAGE), Concurrency::Auto);
        assert_eq!(config.stage_concurrency(PERSISTENCE_STAGE), Concurrency::fixed(1));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_toml_str("[outlier]\nthreshold = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("outlier.threshold"));

        let err = PipelineConfig::from_toml_str("[persistence]\nmax_run = 1\n").unwrap_err();
        assert!(err.to_string().contains("max_run"));

        let err = PipelineConfig::from_toml_str("concurrency = \"many\"\n").unwrap_err();
        assert!(matches!(err, QcError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/stationqc.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_load_catalog() {
        assert!(PipelineConfig::new().load_catalog().unwrap().is_none());

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stations.csv");
        std::fs::write(&path, "station_id,lat,lon\nA001,30,90\n").unwrap();
        let catalog = PipelineConfig::new().with_catalog(&path).load_catalog().unwrap().unwrap();
        assert!(catalog.contains("A001"));

        let err = PipelineConfig::new()
            .with_catalog(tmp.path().join("absent.csv"))
            .load_catalog()
            .unwrap_err();
        assert!(matches!(err, QcError::Catalog(_)));
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::new()
            .with_source_dir("in")
            .with_catalog("cat.csv")
            .with_concurrency(Concurrency::fixed(2))
            .with_stations(vec!["X".into()]);
        assert_eq!(config.source().root(), Path::new("in"));
        assert_eq!(config.stage_output(INTEGRITY_STAGE).root(), Path::new("integrity"));
        assert_eq!(config.stage_concurrency(OUTLIER_STAGE), Concurrency::fixed(2));
    }
}
