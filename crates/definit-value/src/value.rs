//! Node values.
//!
//! Primitives are stored inline and compare by content. Composites, resources
//! and opaque payloads live behind `Rc`, so cloning a [`Value`] clones the
//! handle and both copies share one identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{ValueError, ValueResult};
use crate::identity::same_value;
use crate::resource::Deinit;

/// Address of a shared allocation, ignoring any pointer metadata.
pub(crate) fn rc_addr<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

/// A node in a structure handed to the cleanup engine.
#[derive(Clone, Default)]
pub enum Value {
    /// No value; the counterpart used when a position has no match.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// Ordered, integer-indexed composite.
    Seq(Seq),
    /// Plain key/value composite.
    Map(Map),
    /// A value carrying the cleanup capability.
    Resource(Rc<dyn Deinit>),
    /// Anything else. Never traversed, never cleaned.
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Build a sequence from the given items.
    pub fn seq(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Seq(Seq::from_iter(items))
    }

    /// Build a mapping from key/value pairs, keeping their order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Map::from_iter(entries))
    }

    /// Wrap a freshly-owned resource.
    pub fn resource<R: Deinit + 'static>(resource: R) -> Self {
        Value::Resource(Rc::new(resource))
    }

    /// Wrap a resource the caller keeps a handle to. The value shares the
    /// caller's allocation, and therefore its identity.
    pub fn shared_resource<R: Deinit + 'static>(resource: Rc<R>) -> Self {
        Value::Resource(resource)
    }

    /// Wrap an arbitrary payload the engine must not look into.
    pub fn opaque<T: Any>(payload: T) -> Self {
        Value::Opaque(Rc::new(payload))
    }

    pub fn nan() -> Self {
        Value::Number(f64::NAN)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Resource(_) => "resource",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Convert plain JSON into a fresh value tree. Arrays become [`Seq`]s and
    /// objects become [`Map`]s; nothing in the result is shared.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => Value::seq(items.iter().map(Value::from_json)),
            serde_json::Value::Object(entries) => {
                Value::map(entries.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }
}

impl fmt::Debug for Value {
    // Composites print as a summary so cyclic structures stay printable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Seq(seq) => write!(f, "Seq(len={}, @{:#x})", seq.len(), seq.addr()),
            Value::Map(map) => write!(f, "Map(len={}, @{:#x})", map.len(), map.addr()),
            Value::Resource(r) => write!(f, "Resource({})", r.describe()),
            Value::Opaque(rc) => write!(f, "Opaque(@{:#x})", rc_addr(rc)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Seq> for Value {
    fn from(seq: Seq) -> Self {
        Value::Seq(seq)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

/// Drop a batch of values without recursing once per level of nesting.
///
/// Composites whose last handle is being dropped hand their children to the
/// same work list instead of dropping them in place. Shared composites only
/// lose a reference.
fn drop_iteratively(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::Seq(mut seq) => {
                if let Some(items) = Rc::get_mut(&mut seq.0) {
                    pending.append(items.get_mut());
                }
            }
            Value::Map(mut map) => {
                if let Some(entries) = Rc::get_mut(&mut map.0) {
                    pending.extend(entries.get_mut().drain(..).map(|(_, v)| v));
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Seq
// ---------------------------------------------------------------------------

/// A shared, interior-mutable ordered sequence.
#[derive(Clone, Default)]
pub struct Seq(Rc<RefCell<Vec<Value>>>);

impl Seq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> ValueResult<Value> {
        let mut items = self.0.borrow_mut();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ValueError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value.into()))
    }

    pub fn remove(&self, index: usize) -> ValueResult<Value> {
        let mut items = self.0.borrow_mut();
        let len = items.len();
        if index >= len {
            return Err(ValueError::IndexOutOfBounds { index, len });
        }
        Ok(items.remove(index))
    }

    /// Whether any item is the same value as `value`, at any position.
    pub fn contains(&self, value: &Value) -> bool {
        self.0.borrow().iter().any(|item| same_value(item, value))
    }

    /// Copy of the current items. Handles are cloned, not the values behind
    /// them.
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Seq) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared allocation; stable for the handle's lifetime.
    pub fn addr(&self) -> usize {
        rc_addr(&self.0)
    }
}

impl FromIterator<Value> for Seq {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Seq(Rc::new(RefCell::new(iter.into_iter().collect())))
    }
}

impl Drop for Seq {
    fn drop(&mut self) {
        if let Some(items) = Rc::get_mut(&mut self.0) {
            drop_iteratively(std::mem::take(items.get_mut()));
        }
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq(len={}, @{:#x})", self.len(), self.addr())
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// A shared, interior-mutable plain mapping. Iteration follows insertion
/// order.
#[derive(Clone, Default)]
pub struct Map(Rc<RefCell<IndexMap<String, Value>>>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Insert or overwrite `key`, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Copy of the current entries. Handles are cloned, not the values behind
    /// them.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared allocation; stable for the handle's lifetime.
    pub fn addr(&self) -> usize {
        rc_addr(&self.0)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Map(Rc::new(RefCell::new(entries)))
    }
}

impl Drop for Map {
    fn drop(&mut self) {
        if let Some(entries) = Rc::get_mut(&mut self.0) {
            let children = entries.get_mut().drain(..).map(|(_, v)| v).collect();
            drop_iteratively(children);
        }
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map(len={}, @{:#x})", self.len(), self.addr())
    }
}
