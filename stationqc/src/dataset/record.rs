//! Daily station record stored as CSV.
//!
//! A record is a `date` column (ISO `YYYY-MM-DD`, strictly increasing) plus
//! any number of numeric value columns. Empty cells, `NaN` and `NA` are
//! missing values.

use crate::errors::RecordError;
use chrono::NaiveDate;
use std::io;

/// Name of the mandatory date column.
pub const DATE_COLUMN: &str = "date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of observations.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    /// Observation date.
    pub date: NaiveDate,
    /// One value per value column, `None` when missing.
    pub values: Vec<Option<f64>>,
}

/// A parsed station time series.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    columns: Vec<String>,
    rows: Vec<DailyRow>,
}

impl StationRecord {
    /// Creates a record from value column names and rows.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<DailyRow>) -> Self {
        Self { columns, rows }
    }

    /// Parses a record from CSV bytes.
    pub fn parse(content: &[u8]) -> Result<Self, RecordError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content);

        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(RecordError::MissingHeader);
        }

        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(DATE_COLUMN))
            .ok_or_else(|| RecordError::MissingDateColumn(DATE_COLUMN.to_string()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut rows: Vec<DailyRow> = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map_or(0, csv::Position::line);

            if record.len() != headers.len() {
                return Err(RecordError::Ragged {
                    line,
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            let date_cell = &record[date_idx];
            let date = NaiveDate::parse_from_str(date_cell, DATE_FORMAT).map_err(|_| {
                RecordError::InvalidDate {
                    line,
                    value: date_cell.to_string(),
                }
            })?;

            if let Some(previous) = rows.last() {
                if date <= previous.date {
                    return Err(RecordError::OutOfOrder {
                        line,
                        date: date.to_string(),
                        previous: previous.date.to_string(),
                    });
                }
            }

            let mut values = Vec::with_capacity(columns.len());
            for (idx, cell) in record.iter().enumerate() {
                if idx == date_idx {
                    continue;
                }
                values.push(parse_value(cell).ok_or_else(|| RecordError::InvalidValue {
                    line,
                    column: headers[idx].to_string(),
                    value: cell.to_string(),
                })?);
            }

            rows.push(DailyRow { date, values });
        }

        Ok(Self { columns, rows })
    }

    /// Serializes the record back to CSV bytes.
    pub fn to_csv(&self) -> io::Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(DATE_COLUMN);
        header.extend(self.columns.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut fields = Vec::with_capacity(row.values.len() + 1);
            fields.push(row.date.format(DATE_FORMAT).to_string());
            fields.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
            );
            writer.write_record(&fields)?;
        }

        writer.into_inner().map_err(|e| e.into_error())
    }

    /// Returns the value column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[DailyRow] {
        &self.rows
    }

    /// Returns the rows mutably.
    pub fn rows_mut(&mut self) -> &mut [DailyRow] {
        &mut self.rows
    }

    /// Returns the number of days.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the record has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns one column's values in date order.
    #[must_use]
    pub fn column_values(&self, column: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.values.get(column).copied().flatten())
            .collect()
    }

    /// Marks one value as missing. Returns true if a value was present.
    pub fn set_missing(&mut self, row: usize, column: usize) -> bool {
        self.rows
            .get_mut(row)
            .and_then(|r| r.values.get_mut(column))
            .and_then(Option::take)
            .is_some()
    }

    /// Returns the number of non-missing values across all columns.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.values.iter().filter(|v| v.is_some()).count())
            .sum()
    }
}

fn parse_value(cell: &str) -> Option<Option<f64>> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("na") {
        return Some(None);
    }
    let value: f64 = cell.parse().ok()?;
    Some(value.is_finite().then_some(value))
}

fn csv_error(err: csv::Error) -> RecordError {
    RecordError::Csv {
        line: err.position().map_or(0, csv::Position::line),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "date,prcp,tmax\n2020-01-01,0.0,3.5\n2020-01-02,,4\n2020-01-03,12.5,NaN\n";

    #[test]
    fn test_parse_sample() {
        let record = StationRecord::parse(SAMPLE.as_bytes()).unwrap();

        assert_eq!(record.columns(), &["prcp".to_string(), "tmax".to_string()]);
        assert_eq!(record.len(), 3);
        assert_eq!(record.column_values(0), vec![Some(0.0), None, Some(12.5)]);
        assert_eq!(record.column_values(1), vec![Some(3.5), Some(4.0), None]);
        assert_eq!(record.valid_count(), 4);
    }

    #[test]
    fn test_date_column_may_be_anywhere() {
        let record = StationRecord::parse(b"prcp,DATE\n1.5,2020-01-01\n").unwrap();
        assert_eq!(record.columns(), &["prcp".to_string()]);
        assert_eq!(record.rows()[0].values, vec![Some(1.5)]);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let record = StationRecord::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = record.to_csv().unwrap();
        let reparsed = StationRecord::parse(&bytes).unwrap();

        assert_eq!(reparsed, record);
        assert_eq!(reparsed.to_csv().unwrap(), bytes);
    }

    #[test]
    fn test_rejects_empty_file() {
        assert_eq!(StationRecord::parse(b""), Err(RecordError::MissingHeader));
    }

    #[test]
    fn test_rejects_missing_date_column() {
        let err = StationRecord::parse(b"day,prcp\n1,2\n").unwrap_err();
        assert_eq!(err, RecordError::MissingDateColumn("date".to_string()));
    }

    #[test]
    fn test_rejects_bad_cells() {
        let err = StationRecord::parse(b"date,prcp\n2020-13-01,1\n").unwrap_err();
        assert!(matches!(err, RecordError::InvalidDate { line: 2, .. }));

        let err = StationRecord::parse(b"date,prcp\n2020-01-01,abc\n").unwrap_err();
        assert!(matches!(err, RecordError::InvalidValue { ref column, .. } if column == "prcp"));

        let err = StationRecord::parse(b"date,prcp\n2020-01-01,1,2\n").unwrap_err();
        assert!(matches!(err, RecordError::Ragged { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_rejects_duplicate_and_unordered_dates() {
        let err = StationRecord::parse(b"date,prcp\n2020-01-02,1\n2020-01-02,2\n").unwrap_err();
        assert!(matches!(err, RecordError::OutOfOrder { line: 3, .. }));

        let err = StationRecord::parse(b"date,prcp\n2020-01-02,1\n2020-01-01,2\n").unwrap_err();
        assert!(matches!(err, RecordError::OutOfOrder { .. }));
    }

    #[test]
    fn test_set_missing() {
        let mut record = StationRecord::parse(SAMPLE.as_bytes()).unwrap();
        assert!(record.set_missing(0, 1));
        assert!(!record.set_missing(0, 1));
        assert!(!record.set_missing(99, 0));
        assert_eq!(record.column_values(1)[0], None);
    }
}
