//! Per-call set of shared values already handled by a traversal.
//!
//! Composites are recorded before their children are walked, which is what
//! makes cyclic structures terminate. Resources are recorded when released so
//! a resource reachable through several paths is released once.
//!
//! Entries keep their handle alive, so an address can never be reused by a
//! new allocation while the set exists.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use definit_value::{Deinit, Map, Seq, Value};

/// A shared value that can be tracked by identity.
#[derive(Clone)]
pub enum TrackedRef {
    Seq(Seq),
    Map(Map),
    Resource(Rc<dyn Deinit>),
}

impl TrackedRef {
    /// The trackable handle inside `value`, if it has reference identity the
    /// engine cares about.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Seq(seq) => Some(TrackedRef::Seq(seq.clone())),
            Value::Map(map) => Some(TrackedRef::Map(map.clone())),
            Value::Resource(resource) => Some(TrackedRef::Resource(Rc::clone(resource))),
            _ => None,
        }
    }

    pub fn addr(&self) -> usize {
        match self {
            TrackedRef::Seq(seq) => seq.addr(),
            TrackedRef::Map(map) => map.addr(),
            TrackedRef::Resource(resource) => Rc::as_ptr(resource) as *const () as usize,
        }
    }
}

impl PartialEq for TrackedRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for TrackedRef {}

impl Hash for TrackedRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

/// Reference-identity set scoped to a single traversal.
#[derive(Default)]
pub struct VisitedSet {
    entries: HashSet<TrackedRef>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value`. Returns `true` if it was not present before; values
    /// without reference identity are never recorded and return `false`.
    pub fn insert(&mut self, value: &Value) -> bool {
        match TrackedRef::of(value) {
            Some(tracked) => self.entries.insert(tracked),
            None => false,
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        TrackedRef::of(value).is_some_and(|tracked| self.entries.contains(&tracked))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use definit_value::ResourceFn;

    #[test]
    fn tracks_composites_by_identity() {
        let mut visited = VisitedSet::new();
        let seq = Value::Seq(Seq::new());
        assert!(!visited.contains(&seq));
        assert!(visited.insert(&seq));
        assert!(!visited.insert(&seq.clone()));
        assert!(visited.contains(&seq));
        assert!(!visited.contains(&Value::Seq(Seq::new())));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn tracks_resources_by_identity() {
        let mut visited = VisitedSet::new();
        let res = Value::resource(ResourceFn::new("r", || Ok(())));
        assert!(visited.insert(&res));
        assert!(visited.contains(&res.clone()));
    }

    #[test]
    fn ignores_values_without_identity() {
        let mut visited = VisitedSet::new();
        assert!(!visited.insert(&Value::from(1.0)));
        assert!(!visited.insert(&Value::opaque(5u32)));
        assert!(!visited.contains(&Value::from(1.0)));
        assert!(visited.is_empty());
    }

    #[test]
    fn distinct_maps_are_distinct_entries() {
        let mut visited = VisitedSet::new();
        let a = Value::Map(Map::new());
        let b = Value::Map(Map::new());
        assert!(visited.insert(&a));
        assert!(visited.insert(&b));
        assert_eq!(visited.len(), 2);
    }
}
