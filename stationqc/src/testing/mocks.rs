//! Mock checks for testing.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::cancellation::CancellationToken;
use crate::checks::{CheckContext, StationCheck};
use crate::core::StationId;
use crate::dataset::StationRecord;
use crate::errors::CheckError;

/// A check that passes records through unchanged unless scripted otherwise.
///
/// Tracks how often it was called and how many calls overlapped.
#[derive(Debug)]
pub struct ScriptedCheck {
    name: String,
    failing: BTreeSet<StationId>,
    failure_reason: String,
    panicking: BTreeSet<StationId>,
    delay: Option<Duration>,
    needs_catalog: bool,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<StationId>>,
}

impl ScriptedCheck {
    /// Creates a check that passes every station.
    #[must_use]
    pub fn passing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failing: BTreeSet::new(),
            failure_reason: "scripted failure".to_string(),
            panicking: BTreeSet::new(),
            delay: None,
            needs_catalog: false,
            cancel_after: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Rejects the given stations.
    #[must_use]
    pub fn failing_for<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StationId>,
    {
        self.failing.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Sets the reason given for rejected stations.
    #[must_use]
    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = reason.into();
        self
    }

    /// Panics on the given stations.
    #[must_use]
    pub fn panicking_for<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StationId>,
    {
        self.panicking.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Sleeps for `delay` in every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Declares that the check needs the station catalog.
    #[must_use]
    pub fn needing_catalog(mut self) -> Self {
        self.needs_catalog = true;
        self
    }

    /// Cancels `token` once `calls` calls have completed.
    #[must_use]
    pub fn cancelling_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    /// Returns the number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the highest number of calls that ran at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Returns the stations checked, in call order.
    #[must_use]
    pub fn seen(&self) -> Vec<StationId> {
        self.seen.lock().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StationCheck for ScriptedCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_catalog(&self) -> bool {
        self.needs_catalog
    }

    fn check(
        &self,
        ctx: &CheckContext<'_>,
        record: StationRecord,
    ) -> Result<StationRecord, CheckError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().push(ctx.station_id.clone());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if calls >= *after {
                token.cancel("scripted cancellation");
            }
        }

        if self.panicking.contains(ctx.station_id) {
            panic!("scripted panic for {}", ctx.station_id);
        }
        if self.failing.contains(ctx.station_id) {
            return Err(CheckError::rejected(&self.name, self.failure_reason.clone()));
        }
        Ok(record)
    }
}
