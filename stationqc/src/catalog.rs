//! Read-only station metadata catalog.
//!
//! The catalog is loaded once and handed to checks as an explicit
//! `Arc<StationCatalog>`, so tests can substitute a hand-built one.

use crate::core::StationId;
use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const ID_COLUMNS: &[&str] = &["station_id", "id", "station"];
const NAME_COLUMNS: &[&str] = &["name", "station_name"];
const LATITUDE_COLUMNS: &[&str] = &["latitude", "lat"];
const LONGITUDE_COLUMNS: &[&str] = &["longitude", "lon", "lng"];
const ELEVATION_COLUMNS: &[&str] = &["elevation", "elev", "altitude"];

/// Metadata for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMeta {
    /// The station id.
    pub station_id: StationId,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Elevation in metres.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Any other catalog columns, verbatim.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl StationMeta {
    /// Creates an entry with only an id.
    #[must_use]
    pub fn new(station_id: impl Into<StationId>) -> Self {
        Self {
            station_id: station_id.into(),
            name: None,
            latitude: None,
            longitude: None,
            elevation: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the coordinates.
    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Sets the elevation.
    #[must_use]
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Registry of station metadata keyed by station id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationCatalog {
    entries: BTreeMap<StationId, StationMeta>,
}

impl StationCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Duplicate`] if a station appears twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = StationMeta>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    /// Loads a catalog CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Self::from_csv(reader, path)?;
        info!(path = %path.display(), stations = catalog.len(), "Loaded station catalog");
        Ok(catalog)
    }

    /// Parses a catalog from any CSV source.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, CatalogError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv(reader, Path::new("<reader>"))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Self, CatalogError> {
        let read_error = |source| CatalogError::Read {
            path: PathBuf::from(path),
            source,
        };

        let headers = reader.headers().map_err(read_error)?.clone();
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };

        let id_idx = find(ID_COLUMNS).ok_or_else(|| CatalogError::MissingIdColumn {
            expected: ID_COLUMNS.iter().map(|s| (*s).to_string()).collect(),
        })?;
        let name_idx = find(NAME_COLUMNS);
        let lat_idx = find(LATITUDE_COLUMNS);
        let lon_idx = find(LONGITUDE_COLUMNS);
        let elev_idx = find(ELEVATION_COLUMNS);
        let known = [Some(id_idx), name_idx, lat_idx, lon_idx, elev_idx];

        let mut catalog = Self::new();
        for result in reader.records() {
            let record = result.map_err(read_error)?;
            let Some(id) = record.get(id_idx).filter(|s| !s.is_empty()) else {
                continue;
            };

            let mut meta = StationMeta::new(id);
            meta.name = name_idx
                .and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            meta.latitude = parse_field(&record, lat_idx, id, "latitude")?;
            meta.longitude = parse_field(&record, lon_idx, id, "longitude")?;
            meta.elevation = parse_field(&record, elev_idx, id, "elevation")?;

            for (idx, header) in headers.iter().enumerate() {
                if known.contains(&Some(idx)) {
                    continue;
                }
                if let Some(value) = record.get(idx) {
                    meta.attributes.insert(header.to_string(), value.to_string());
                }
            }

            catalog.insert(meta)?;
        }

        Ok(catalog)
    }

    fn insert(&mut self, meta: StationMeta) -> Result<(), CatalogError> {
        if self.entries.contains_key(&meta.station_id) {
            return Err(CatalogError::Duplicate(meta.station_id.to_string()));
        }
        self.entries.insert(meta.station_id.clone(), meta);
        Ok(())
    }

    /// Returns a station's metadata.
    #[must_use]
    pub fn get(&self, station_id: &str) -> Option<&StationMeta> {
        self.entries.get(station_id)
    }

    /// Returns true if the station is listed.
    #[must_use]
    pub fn contains(&self, station_id: &str) -> bool {
        self.entries.contains_key(station_id)
    }

    /// Returns the number of stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in station id order.
    pub fn iter(&self) -> impl Iterator<Item = &StationMeta> {
        self.entries.values()
    }
}

fn parse_field(
    record: &csv::StringRecord,
    idx: Option<usize>,
    station: &str,
    field: &str,
) -> Result<Option<f64>, CatalogError> {
    let Some(value) = idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| CatalogError::InvalidField {
            station: station.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = "\
station_id,name,lat,lon,elev,network
A001,Lhasa,29.65,91.13,3650,CMA
A002,,30.1,,,
";

    #[test]
    fn test_from_reader() {
        let catalog = StationCatalog::from_reader(CATALOG.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);

        let a1 = catalog.get("A001").unwrap();
        assert_eq!(a1.name.as_deref(), Some("Lhasa"));
        assert_eq!(a1.latitude, Some(29.65));
        assert_eq!(a1.longitude, Some(91.13));
        assert_eq!(a1.elevation, Some(3650.0));
        assert_eq!(a1.attributes.get("network").map(String::as_str), Some("CMA"));

        let a2 = catalog.get("A002").unwrap();
        assert_eq!(a2.name, None);
        assert_eq!(a2.longitude, None);
    }

    #[test]
    fn test_missing_id_column() {
        let err = StationCatalog::from_reader("name,lat\nx,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingIdColumn { .. }));
    }

    #[test]
    fn test_invalid_number() {
        let err = StationCatalog::from_reader("id,lat\nA001,north\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { ref field, .. } if field == "latitude"));
    }

    #[test]
    fn test_duplicate_station() {
        let err = StationCatalog::from_reader("id\nA001\nA001\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(ref id) if id == "A001"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stations.csv");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = StationCatalog::load(&path).unwrap();
        assert!(catalog.contains("A001"));
        assert!(!catalog.contains("A003"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = StationCatalog::load("/nonexistent/stations.csv").unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn test_from_entries() {
        let catalog = StationCatalog::from_entries([
            StationMeta::new("B1").with_coordinates(10.0, 20.0),
            StationMeta::new("A1").with_name("first").with_elevation(5.0),
        ])
        .unwrap();
        let ids: Vec<&str> = catalog.iter().map(|m| m.station_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B1"]);
    }
}
