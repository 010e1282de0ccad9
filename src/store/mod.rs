//! # Client-Side Store
//!
//! The cached scenario projection and the reconciler task that keeps it
//! consistent with the pipeline through deltas plus authoritative refetches.

pub mod reconciler;
pub mod scenario_store;

pub use reconciler::{DirectoryError, Reconciler, ScenarioDirectory};
pub use scenario_store::ScenarioStore;
