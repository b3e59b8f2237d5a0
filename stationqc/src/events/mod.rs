//! Event sink system for progress and observability.
//!
//! Stage runners and worker pools report through an [`EventSink`] handed to
//! them at construction. Presentation layers (progress bars, JSON logs)
//! implement the trait; the library never renders anything itself.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Emitted once per pipeline run before the first stage.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted once per pipeline run after the last stage.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Emitted when a stage begins dispatching.
pub const STAGE_STARTED: &str = "stage.started";
/// Emitted when a stage's batch has completed.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Emitted for every finished unit, in completion order.
pub const UNIT_COMPLETED: &str = "unit.completed";
