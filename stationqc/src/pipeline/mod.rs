//! Stage chaining and execution.
//!
//! This module provides:
//! - Stage specifications
//! - The stage runner that drives one stage through a worker pool
//! - A validating pipeline builder
//! - The pipeline that runs its stages in order over one station universe

mod builder;
mod runner;
mod sequence;
mod spec;


pub use builder::PipelineBuilder;
pub use runner::StageRunner;
pub use sequence::Pipeline;
pub use spec::StageSpec;
