//! Station identifier newtype.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier of one station, stable across every stage.
///
/// Derived from a dataset file name with its extension removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    /// Creates a station id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id can name a file inside a dataset directory.
    ///
    /// Rejects empty ids, path separators and relative path components.
    #[must_use]
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for StationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_display_and_conversions() {
        let id = StationId::from("A001");
        assert_eq!(id.to_string(), "A001");
        assert_eq!(id.as_str(), "A001");
        assert_eq!(StationId::from(String::from("A001")), id);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let ids: BTreeSet<StationId> = ["B2", "A10", "A2"].into_iter().map(StationId::from).collect();
        let ordered: Vec<&str> = ids.iter().map(StationId::as_str).collect();
        assert_eq!(ordered, vec!["A10", "A2", "B2"]);
    }

    #[test]
    fn test_file_safety() {
        assert!(StationId::from("USC00012345").is_file_safe());
        assert!(!StationId::from("").is_file_safe());
        assert!(!StationId::from("..").is_file_safe());
        assert!(!StationId::from("a/b").is_file_safe());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&StationId::from("A001")).unwrap();
        assert_eq!(json, r#""A001""#);
    }
}
