//! Value model for definit.
//!
//! Application state handed to the cleanup engine is expressed as a tree (or
//! graph) of [`Value`]s. Composites are shared, interior-mutable handles, so
//! two structures can hold the same sub-structure and a structure can refer to
//! itself. Resources are values implementing the [`Deinit`] capability.
//!
//! # Key Types
//!
//! - [`Value`] -- A dynamically-shaped node value
//! - [`Seq`] / [`Map`] -- Shared ordered sequence and plain key/value mapping
//! - [`Deinit`] -- The cleanup capability; [`ResourceFn`] adapts a closure
//! - [`Category`] -- Classification used by the traversal ([`classify`])
//! - [`same_value`] -- Identity comparison with NaN matching itself

pub mod classify;
pub mod error;
pub mod identity;
pub mod resource;
pub mod value;

pub use classify::{classify, is_deinitable, Category};
pub use error::{CleanupFailure, ValueError, ValueResult};
pub use identity::same_value;
pub use resource::{CleanupError, Deinit, ResourceFn};
pub use value::{Map, Seq, Value};
