//! Ad assembly orchestrator.
//!
//! This crate provides:
//! - Segment planning over a text-analysis collaborator
//! - Tag and contextual clip matching onto a contiguous timeline
//! - Render job packaging with object-store spill for large specs
//! - Batch dispatch and progress polling
//! - The workflow state machine and the `AdOrchestrator` facade

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod packager;
pub mod planner;
pub mod retry;
pub mod service;
pub mod tag_matcher;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::OrchestratorConfig;
pub use dispatcher::{PollOutcome, DEFAULT_FAILURE_REASON};
pub use error::{OrchestratorError, OrchestratorResult};
pub use logging::ProjectLogger;
pub use matcher::{MatchResult, MatchStrategy};
pub use retry::RetryConfig;
pub use service::AdOrchestrator;
