//! Worker-pool size setting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

/// How many stations a pool may check at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ConcurrencyRepr", into = "ConcurrencyRepr")]
pub enum Concurrency {
    /// One worker per available hardware thread.
    #[default]
    Auto,
    /// At most this many units in flight.
    Fixed(NonZeroUsize),
}

impl Concurrency {
    /// Creates a fixed setting; `0` means [`Concurrency::Auto`].
    #[must_use]
    pub fn fixed(workers: usize) -> Self {
        NonZeroUsize::new(workers).map_or(Self::Auto, Self::Fixed)
    }

    /// Returns the number of workers to use.
    #[must_use]
    pub fn resolve(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Self::Fixed(n) => n.get(),
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Error returned for an unrecognized concurrency setting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid concurrency '{0}': expected 'auto', 0, -1 or a positive integer")]
pub struct ParseConcurrencyError(String);

impl FromStr for Concurrency {
    type Err = ParseConcurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::Auto);
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ParseConcurrencyError(s.to_string()))?;
        Self::try_from(ConcurrencyRepr::Workers(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ConcurrencyRepr {
    Workers(i64),
    Named(String),
}

impl TryFrom<ConcurrencyRepr> for Concurrency {
    type Error = ParseConcurrencyError;

    fn try_from(repr: ConcurrencyRepr) -> Result<Self, Self::Error> {
        match repr {
            ConcurrencyRepr::Named(name) => name.parse(),
            ConcurrencyRepr::Workers(0 | -1) => Ok(Self::Auto),
            ConcurrencyRepr::Workers(n) => usize::try_from(n)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Self::Fixed)
                .ok_or_else(|| ParseConcurrencyError(n.to_string())),
        }
    }
}

impl From<Concurrency> for ConcurrencyRepr {
    fn from(value: Concurrency) -> Self {
        match value {
            Concurrency::Auto => Self::Named("auto".to_string()),
            Concurrency::Fixed(n) => Self::Workers(i64::try_from(n.get()).unwrap_or(i64::MAX)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        assert_eq!("auto".parse::<Concurrency>().unwrap(), Concurrency::Auto);
        assert_eq!("AUTO".parse::<Concurrency>().unwrap(), Concurrency::Auto);
        assert_eq!("0".parse::<Concurrency>().unwrap(), Concurrency::Auto);
        assert_eq!("-1".parse::<Concurrency>().unwrap(), Concurrency::Auto);
        assert_eq!("8".parse::<Concurrency>().unwrap(), Concurrency::fixed(8));
        assert!("-4".parse::<Concurrency>().is_err());
        assert!("many".parse::<Concurrency>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Concurrency::fixed(3).resolve(), 3);
        assert!(Concurrency::Auto.resolve() >= 1);
        assert_eq!(Concurrency::fixed(0), Concurrency::Auto);
    }

    #[test]
    fn test_display() {
        assert_eq!(Concurrency::Auto.to_string(), "auto");
        assert_eq!(Concurrency::fixed(4).to_string(), "4");
    }

    #[test]
    fn test_serde_accepts_string_or_integer() {
        #[derive(Deserialize, Serialize)]
        struct Wrapper {
            concurrency: Concurrency,
        }

        let w: Wrapper = serde_json::from_str(r#"{"concurrency": "auto"}"#).unwrap();
        assert_eq!(w.concurrency, Concurrency::Auto);
        let w: Wrapper = serde_json::from_str(r#"{"concurrency": 6}"#).unwrap();
        assert_eq!(w.concurrency, Concurrency::fixed(6));
        let w: Wrapper = serde_json::from_str(r#"{"concurrency": -1}"#).unwrap();
        assert_eq!(w.concurrency, Concurrency::Auto);
        assert!(serde_json::from_str::<Wrapper>(r#"{"concurrency": -3}"#).is_err());

        let json = serde_json::to_string(&Wrapper { concurrency: Concurrency::fixed(2) }).unwrap();
        assert_eq!(json, r#"{"concurrency":2}"#);
    }
}
