//! Dataset fixtures for testing.

use chrono::{Days, NaiveDate};
use std::io;

use crate::core::StationId;
use crate::dataset::{DailyRow, DatasetDir, StationRecord};

/// A record of 30 days of plausible precipitation and temperature that
/// passes the integrity, outlier and persistence checks unchanged.
#[must_use]
pub fn sample_record() -> StationRecord {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let rows = (0..30u32)
        .map(|day| {
            let prcp = if day % 4 == 0 { 0.0 } else { f64::from(day % 5) * 1.5 };
            let tmax = 10.0 + f64::from(day % 7) * 0.5;
            DailyRow {
                date: start + Days::new(u64::from(day)),
                values: vec![Some(prcp), Some(tmax)],
            }
        })
        .collect();
    StationRecord::new(vec!["prcp".to_string(), "tmax".to_string()], rows)
}

enum Content {
    Record(StationRecord),
    Raw(Vec<u8>),
}

/// Builds a dataset directory of station files.
///
/// Records are written through [`StationRecord::to_csv`], so a check that
/// passes a record through unchanged produces byte-identical output.
pub struct StationFixture {
    dir: DatasetDir,
    files: Vec<(StationId, Content)>,
}

impl StationFixture {
    /// Creates an empty fixture for `dir`.
    #[must_use]
    pub fn new(dir: &DatasetDir) -> Self {
        Self {
            dir: dir.clone(),
            files: Vec::new(),
        }
    }

    /// Adds a station holding [`sample_record`].
    #[must_use]
    pub fn station(self, id: impl Into<StationId>) -> Self {
        self.station_with(id, sample_record())
    }

    /// Adds a station holding `record`.
    #[must_use]
    pub fn station_with(mut self, id: impl Into<StationId>, record: StationRecord) -> Self {
        self.files.push((id.into(), Content::Record(record)));
        self
    }

    /// Adds a station whose file cannot be parsed.
    #[must_use]
    pub fn malformed(self, id: impl Into<StationId>) -> Self {
        self.raw(id, b"date,prcp\nnot-a-date,1.0\n".to_vec())
    }

    /// Adds a station with arbitrary file content.
    #[must_use]
    pub fn raw(mut self, id: impl Into<StationId>, content: Vec<u8>) -> Self {
        self.files.push((id.into(), Content::Raw(content)));
        self
    }

    /// Adds `count` sample stations named `<prefix>0000`, `<prefix>0001`, ...
    #[must_use]
    pub fn numbered(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            self = self.station(format!("{prefix}{i:04}"));
        }
        self
    }

    /// Creates the directory and writes every file.
    ///
    /// Returns the ids written, in insertion order.
    pub fn write(self) -> io::Result<Vec<StationId>> {
        self.dir.ensure_exists()?;
        let mut ids = Vec::with_capacity(self.files.len());
        for (id, content) in self.files {
            let bytes = match content {
                Content::Record(record) => record.to_csv()?,
                Content::Raw(bytes) => bytes,
            };
            self.dir.write_atomic(&id, &bytes)?;
            ids.push(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StationCatalog, StationMeta};
    use crate::checks::{
        CheckContext, IntegrityCheck, OutlierCheck, PersistenceCheck, StationCheck,
    };

    #[test]
    fn test_sample_record_passes_standard_checks() {
        let id = StationId::from("A001");
        let catalog =
            StationCatalog::from_entries([StationMeta::new("A001").with_coordinates(30.0, 90.0)])
                .unwrap();
        let ctx = CheckContext {
            station_id: &id,
            catalog: Some(&catalog),
        };

        let checks: [&dyn StationCheck; 3] = [
            &IntegrityCheck::default(),
            &OutlierCheck::default(),
            &PersistenceCheck::default(),
        ];
        for check in checks {
            let out = check.check(&ctx, sample_record()).unwrap();
            assert_eq!(out, sample_record(), "{} changed the sample", check.name());
        }
    }

    #[test]
    fn test_write_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DatasetDir::csv(tmp.path().join("nested").join("in"));
        let ids = StationFixture::new(&dir)
            .numbered("S", 3)
            .malformed("BAD")
            .write()
            .unwrap();

        assert_eq!(ids.len(), 4);
        assert_eq!(dir.station_ids().unwrap().len(), 4);
        assert_eq!(ids[0].as_str(), "S0000");
    }
}
