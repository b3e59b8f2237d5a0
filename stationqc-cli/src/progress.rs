//! Progress bar driven by pipeline events.

use indicatif::{ProgressBar, ProgressStyle};
use stationqc::events::{EventSink, STAGE_COMPLETED, STAGE_STARTED, UNIT_COMPLETED};

const TEMPLATE: &str = "{prefix:>12.bold} [{bar:40}] {pos}/{len} stations ({elapsed})";

/// Renders one progress bar per stage.
///
/// Stage headlines are printed above the bar so they survive its redraws.
pub struct ProgressSink {
    bar: ProgressBar,
    visible: bool,
}

impl ProgressSink {
    /// Creates a sink drawing to stderr.
    pub fn stderr() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar, visible: true }
    }

    /// A sink that still counts but draws nothing.
    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            visible: false,
        }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl EventSink for ProgressSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let data = data.unwrap_or_default();
        match event_type {
            STAGE_STARTED => {
                let stations = data["stations"].as_u64().unwrap_or(0);
                let workers = data["workers"].as_u64().unwrap_or(1);
                let stage = data["stage"].as_str().unwrap_or_default().to_string();
                if self.visible {
                    self.bar
                        .println(format!("Using {workers} workers to handle {stations} stations"));
                }
                self.bar.reset();
                self.bar.set_length(stations);
                self.bar.set_prefix(stage);
            }
            UNIT_COMPLETED => self.bar.inc(1),
            STAGE_COMPLETED => {
                if self.visible {
                    self.bar.println(format!(
                        "{}: Success: {}, Failed: {}",
                        data["stage"].as_str().unwrap_or_default(),
                        data["succeeded"],
                        data["failed"]
                    ));
                }
                self.bar.finish_and_clear();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_units_per_stage() {
        let sink = ProgressSink::hidden();
        sink.try_emit(STAGE_STARTED, Some(json!({"stage": "integrity", "stations": 3, "workers": 2})));
        sink.try_emit(UNIT_COMPLETED, None);
        sink.try_emit(UNIT_COMPLETED, None);
        assert_eq!(sink.position(), 2);

        sink.try_emit(STAGE_COMPLETED, Some(json!({"stage": "integrity", "succeeded": 2, "failed": 0})));
        sink.try_emit(STAGE_STARTED, Some(json!({"stage": "outlier", "stations": 3, "workers": 2})));
        assert_eq!(sink.position(), 0);
    }

    #[test]
    fn test_ignores_unknown_events() {
        let sink = ProgressSink::hidden();
        sink.try_emit("pipeline.started", None);
        sink.try_emit(STAGE_STARTED, None);
        assert_eq!(sink.position(), 0);
    }
}
