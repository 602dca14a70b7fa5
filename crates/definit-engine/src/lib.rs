//! Diff-and-release engine for definit.
//!
//! When application state moves from a previous structure to a next one,
//! every resource reachable from the previous structure that is no longer
//! present in the next one is released exactly once. Shared sub-structures are
//! skipped without being walked, cycles terminate, and one failing cleanup
//! never prevents its siblings from being released.
//!
//! # Key Types
//!
//! - [`deinit_diff`] / [`deinit_deep`] / [`is_deinitable`] -- The public entry points
//! - [`Deinitializer`] -- Configurable engine returning a [`DeinitReport`]
//! - [`EngineConfig`] / [`ErrorPolicy`] -- Failure aggregation and depth limit
//! - [`VisitedSet`] -- Per-call reference-identity set
//! - [`DeinitError`] -- Aggregated cleanup failure

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod visited;

pub use api::{deinit_deep, deinit_diff, is_deinitable};
pub use config::{EngineConfig, ErrorPolicy};
pub use engine::Deinitializer;
pub use error::{DeinitError, DeinitResult};
pub use report::DeinitReport;
pub use visited::{TrackedRef, VisitedSet};

pub use definit_value::{
    classify, same_value, Category, CleanupError, CleanupFailure, Deinit, Map, ResourceFn, Seq,
    Value,
};
