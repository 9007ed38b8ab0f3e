//! Payroll ingestion and aggregation pipeline.

pub mod aggregator;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod reader;
pub mod report;
pub mod sink;

pub use errors::{PipelineError, PipelineHaltError};
pub use orchestrator::{Pipeline, PipelineSettings};
pub use report::{RunReport, RunTrigger};
