//! Second-stage check: robust outlier screening.

use super::{CheckContext, StationCheck};
use crate::dataset::StationRecord;
use crate::errors::CheckError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scale factor turning a median absolute deviation into a standard
/// deviation estimate for normally distributed data.
const MAD_SCALE: f64 = 1.4826;

/// Columns with fewer values than this are not screened.
const MIN_SAMPLE: usize = 3;

/// Parameters of [`OutlierCheck`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    /// Robust z-score above which a value is blanked.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    8.0
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Blanks values far from the column median, measured in scaled MADs.
///
/// Columns whose MAD is zero (e.g. mostly dry precipitation series) are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct OutlierCheck {
    params: OutlierParams,
}

impl OutlierCheck {
    /// Creates the check.
    #[must_use]
    pub fn new(params: OutlierParams) -> Self {
        Self { params }
    }
}

impl StationCheck for OutlierCheck {
    fn name(&self) -> &str {
        "outlier"
    }

    fn check(
        &self,
        ctx: &CheckContext<'_>,
        mut record: StationRecord,
    ) -> Result<StationRecord, CheckError> {
        let mut flagged = 0usize;

        for column in 0..record.columns().len() {
            let values = record.column_values(column);
            let mut present: Vec<f64> = values.iter().flatten().copied().collect();
            if present.len() < MIN_SAMPLE {
                continue;
            }

            let center = median(&mut present);
            let mut deviations: Vec<f64> = present.iter().map(|v| (v - center).abs()).collect();
            let mad = median(&mut deviations);
            if mad == 0.0 {
                continue;
            }

            let scale = MAD_SCALE * mad;
            for (row, value) in values.iter().enumerate() {
                if value.is_some_and(|v| (v - center).abs() / scale > self.params.threshold)
                    && record.set_missing(row, column)
                {
                    flagged += 1;
                }
            }
        }

        if record.valid_count() == 0 {
            return Err(CheckError::rejected(self.name(), "no valid values"));
        }

        debug!(station = %ctx.station_id, flagged, "Outlier check done");
        Ok(record)
    }
}

/// Median of a non-empty slice; reorders the slice.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StationId;
    use pretty_assertions::assert_eq;

    fn run(csv: &str) -> Result<StationRecord, CheckError> {
        let id = StationId::from("A001");
        let ctx = CheckContext {
            station_id: &id,
            catalog: None,
        };
        OutlierCheck::default().check(&ctx, StationRecord::parse(csv.as_bytes()).unwrap())
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_blanks_extreme_value() {
        let csv = "date,tmax\n2020-01-01,10\n2020-01-02,11\n2020-01-03,12\n2020-01-04,11\n2020-01-05,10\n2020-01-06,400\n";
        let record = run(csv).unwrap();
        assert_eq!(
            record.column_values(0),
            vec![Some(10.0), Some(11.0), Some(12.0), Some(11.0), Some(10.0), None]
        );
    }

    #[test]
    fn test_zero_mad_column_untouched() {
        let csv = "date,prcp\n2020-01-01,0\n2020-01-02,0\n2020-01-03,0\n2020-01-04,80\n";
        let record = run(csv).unwrap();
        assert_eq!(record.valid_count(), 4);
    }

    #[test]
    fn test_rejects_all_missing() {
        let err = run("date,prcp\n2020-01-01,\n").unwrap_err();
        assert_eq!(err.to_string(), "rejected by outlier: no valid values");
    }
}
