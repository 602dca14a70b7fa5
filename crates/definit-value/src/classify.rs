//! Value classification.

use std::fmt;

use crate::value::Value;

/// How the engine treats a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Has the cleanup capability. Terminal: released, never descended into.
    Resource,
    /// Ordered composite; children matched by scanning the next sequence.
    Sequence,
    /// Plain mapping; children matched by key.
    Mapping,
    /// Left untouched.
    Opaque,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Resource => "resource",
            Category::Sequence => "sequence",
            Category::Mapping => "mapping",
            Category::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Classify a value. Pure; never touches the value's contents.
pub fn classify(value: &Value) -> Category {
    match value {
        Value::Resource(_) => Category::Resource,
        Value::Seq(_) => Category::Sequence,
        Value::Map(_) => Category::Mapping,
        Value::Undefined
        | Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Opaque(_) => Category::Opaque,
    }
}

/// Whether `value` exposes the cleanup capability.
pub fn is_deinitable(value: &Value) -> bool {
    classify(value) == Category::Resource
}
