//! Core domain models for apirun
//!
//! This crate contains:
//! - Domain models (Collection, RunSummary, StageOutcome, PipelineReport)
//! - The error taxonomy shared by every pipeline stage

pub mod collection;
pub mod error;
pub mod report;
pub mod stage;
pub mod summary;

pub use collection::Collection;
pub use error::{Error, Result};
pub use report::PipelineReport;
pub use stage::{Stage, StageOutcome, StageStatus};
pub use summary::{RunSummary, StatCounter};
