//! PlanQA core data models.
//!
//! This crate defines the result records produced by plan-quality checks and
//! the read-only view of planning items those checks inspect.

#![warn(missing_docs)]

// Core identities
mod id;

// Check outcomes
mod result;
mod report;

// Planning items
mod planning;
mod model;

// Re-exports
pub use id::*;

pub use result::{ConstraintResult, ResultType};
pub use report::{cumulative, EvaluationReport, ResultSummary};

pub use planning::{Beam, Image, MlcPlanType, Modality, PlanKind, PlanningItem, Structure};
pub use model::{ModelError, Plan, PlanSetup, PlanSum};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
