//! Dataset directory: one file per station, keyed by station id.

use crate::core::StationId;
use crate::errors::CheckError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// File extension used when none is configured.
pub const DEFAULT_EXTENSION: &str = "csv";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A directory holding exactly one file per station.
///
/// Existence of `<root>/<id>.<extension>` means the producing stage
/// succeeded for that station; its content is the complete record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetDir {
    root: PathBuf,
    extension: String,
}

/// Result of scanning a dataset directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationListing {
    /// Stations found.
    pub ids: BTreeSet<StationId>,
    /// Files with the dataset extension whose names are not valid UTF-8.
    pub unreadable: Vec<PathBuf>,
}

impl DatasetDir {
    /// Creates a dataset rooted at `root` whose files use `extension`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Creates a dataset of `.csv` files.
    #[must_use]
    pub fn csv(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_EXTENSION)
    }

    /// Returns the directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file extension, without the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the path of a station's file.
    #[must_use]
    pub fn station_path(&self, id: &StationId) -> PathBuf {
        self.root.join(format!("{}.{}", id, self.extension))
    }

    /// Returns true if the station's file exists.
    #[must_use]
    pub fn contains(&self, id: &StationId) -> bool {
        self.station_path(id).is_file()
    }

    /// Lists the stations present in the directory.
    ///
    /// Every regular file carrying the dataset extension names a station.
    /// Entries that look like station files but cannot be named as one are
    /// logged and left out; [`DatasetDir::scan`] reports them.
    pub fn station_ids(&self) -> io::Result<BTreeSet<StationId>> {
        let listing = self.scan()?;
        for path in &listing.unreadable {
            warn!(path = %path.display(), "Skipping station file with a non UTF-8 name");
        }
        Ok(listing.ids)
    }

    /// Scans the directory, keeping the entries that could not become ids.
    pub fn scan(&self) -> io::Result<StationListing> {
        let suffix = format!(".{}", self.extension);
        let mut listing = StationListing::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                if path.extension().is_some_and(|ext| ext == self.extension.as_str()) {
                    listing.unreadable.push(path);
                }
                continue;
            };
            if let Some(stem) = name.strip_suffix(&suffix) {
                if !stem.is_empty() {
                    listing.ids.insert(StationId::new(stem));
                }
            }
        }

        listing.unreadable.sort();
        Ok(listing)
    }

    /// Creates the directory and any missing parents.
    ///
    /// Succeeds if the directory already exists.
    pub fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Reads a station's file.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::MissingInput`] if the file does not exist.
    pub fn read(&self, id: &StationId) -> Result<Vec<u8>, CheckError> {
        let path = self.station_path(id);
        fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CheckError::MissingInput { path }
            } else {
                CheckError::Io(e)
            }
        })
    }

    /// Replaces a station's file in one step.
    ///
    /// The content goes to a hidden temp file in the same directory which is
    /// then renamed over the target, so readers see either the previous file
    /// or the complete new one. The temp name never embeds the id, so any id
    /// whose target name fits the filesystem can be written.
    pub fn write_atomic(&self, id: &StationId, content: &[u8]) -> io::Result<()> {
        let target = self.station_path(id);
        let temp = self.root.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let result = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(content)?;
            file.sync_all()?;
            fs::rename(&temp, &target)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    /// Removes a station's file left by an earlier run, if any.
    pub fn discard(&self, id: &StationId) -> io::Result<()> {
        match fs::remove_file(self.station_path(id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Returns the SHA-256 digest of a station's stored content, hex encoded.
    pub fn digest(&self, id: &StationId) -> io::Result<String> {
        let content = fs::read(self.station_path(id))?;
        Ok(hex::encode(Sha256::digest(&content)))
    }

    /// Returns the digest of every station in the directory.
    pub fn digests(&self) -> io::Result<BTreeMap<StationId, String>> {
        self.station_ids()?
            .into_iter()
            .map(|id| {
                let digest = self.digest(&id)?;
                Ok((id, digest))
            })
            .collect()
    }
}
