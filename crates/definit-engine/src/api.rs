//! Entry points with the default configuration.

use definit_value::Value;

use crate::engine::Deinitializer;
use crate::error::DeinitResult;

/// Whether `value` exposes the cleanup capability.
pub fn is_deinitable(value: &Value) -> bool {
    definit_value::is_deinitable(value)
}

/// Release every resource reachable from `prev` that does not survive into
/// `next`.
///
/// A value survives when it is the same value as its counterpart in `next`.
/// Sequence items also survive when they appear anywhere in a next sequence;
/// mapping entries are matched by key only. Every resource is attempted even
/// if others fail; the last failure observed at each level is returned.
pub fn deinit_diff(prev: &Value, next: &Value) -> DeinitResult<()> {
    Deinitializer::default().diff(prev, next).into_result()
}

/// Release every resource reachable from `value`.
pub fn deinit_deep(value: &Value) -> DeinitResult<()> {
    deinit_diff(value, &Value::Undefined)
}
