//! On-disk station datasets.
//!
//! A dataset is a directory holding one file per station. It is both the
//! output of one stage and the input of the next:
//! - [`DatasetDir`] treats the directory as a materialized set of station
//!   ids with a content-addressed view of each stored record
//! - [`StationRecord`] is the parsed daily series inside one file

mod directory;
mod record;

pub use directory::{DatasetDir, StationListing, DEFAULT_EXTENSION};
pub use record::{DailyRow, StationRecord, DATE_COLUMN};
