//! Schema module for model-sync
//!
//! SQL fragment generation, per-entity diff planning, and the phased
//! reconciliation engine.

pub mod generator;
pub mod planner;
pub mod reconciler;
pub mod types;

pub use planner::{ColumnPlan, ExistingColumn, IndexPlan};
pub use reconciler::Reconciler;
pub use types::{ColumnRecord, ForeignKeySpec, SyncSummary};
