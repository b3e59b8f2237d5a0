//! First-stage check: catalog consistency and physical bounds.

use super::{CheckContext, StationCheck};
use crate::dataset::StationRecord;
use crate::errors::CheckError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of [`IntegrityCheck`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityParams {
    /// Smallest physically plausible value.
    #[serde(default = "default_min_value")]
    pub min_value: f64,
    /// Largest physically plausible value.
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    /// Fewest non-missing values a record may keep.
    #[serde(default = "default_min_valid_values")]
    pub min_valid_values: usize,
}

fn default_min_value() -> f64 {
    -90.0
}

fn default_max_value() -> f64 {
    2000.0
}

fn default_min_valid_values() -> usize {
    1
}

impl Default for IntegrityParams {
    fn default() -> Self {
        Self {
            min_value: default_min_value(),
            max_value: default_max_value(),
            min_valid_values: default_min_valid_values(),
        }
    }
}

/// Rejects stations unknown to the catalog or with impossible coordinates,
/// and blanks values outside the physical bounds.
#[derive(Debug, Clone, Default)]
pub struct IntegrityCheck {
    params: IntegrityParams,
}

impl IntegrityCheck {
    /// Creates the check.
    #[must_use]
    pub fn new(params: IntegrityParams) -> Self {
        Self { params }
    }

    fn reject(&self, reason: impl Into<String>) -> CheckError {
        CheckError::rejected(self.name(), reason)
    }
}

impl StationCheck for IntegrityCheck {
    fn name(&self) -> &str {
        "integrity"
    }

    fn requires_catalog(&self) -> bool {
        true
    }

    fn check(
        &self,
        ctx: &CheckContext<'_>,
        mut record: StationRecord,
    ) -> Result<StationRecord, CheckError> {
        let meta = ctx
            .catalog
            .and_then(|c| c.get(ctx.station_id.as_str()))
            .ok_or_else(|| self.reject("station not listed in catalog"))?;

        let (Some(lat), Some(lon)) = (meta.latitude, meta.longitude) else {
            return Err(self.reject("station has no coordinates in catalog"));
        };
        if !(-90.0..=90.0).contains(&lat) {
            return Err(self.reject(format!("latitude {lat} out of range")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(self.reject(format!("longitude {lon} out of range")));
        }

        if record.is_empty() {
            return Err(self.reject("record has no observations"));
        }

        let bounds = self.params.min_value..=self.params.max_value;
        let mut flagged = 0usize;
        for row in record.rows_mut() {
            for value in &mut row.values {
                if value.is_some_and(|v| !bounds.contains(&v)) {
                    *value = None;
                    flagged += 1;
                }
            }
        }

        let valid = record.valid_count();
        if valid < self.params.min_valid_values {
            return Err(self.reject(format!(
                "only {valid} valid values remain (minimum {})",
                self.params.min_valid_values
            )));
        }

        debug!(station = %ctx.station_id, flagged, "Integrity check done");
        Ok(record)
    }
}
