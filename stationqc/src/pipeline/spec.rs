//! Stage specifications.

use crate::catalog::StationCatalog;
use crate::checks::StationCheck;
use crate::dataset::DatasetDir;
use crate::pool::Concurrency;
use std::sync::Arc;

/// Specification for a single stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The check applied to every station.
    pub check: Arc<dyn StationCheck>,
    /// Dataset the stage reads.
    pub input: DatasetDir,
    /// Dataset the stage writes.
    pub output: DatasetDir,
    /// Overrides the runner's concurrency.
    pub concurrency: Option<Concurrency>,
    /// Catalog handed to the check.
    pub catalog: Option<Arc<StationCatalog>>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        check: Arc<dyn StationCheck>,
        input: DatasetDir,
        output: DatasetDir,
    ) -> Self {
        Self {
            name: name.into(),
            check,
            input,
            output,
            concurrency: None,
            catalog: None,
        }
    }

    /// Sets the concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Sets the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<StationCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}
