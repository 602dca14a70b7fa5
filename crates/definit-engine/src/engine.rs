//! The diff-and-release traversal.
//!
//! [`Deinitializer`] walks a previous structure against a next structure and
//! releases every resource that did not survive. For each pair of nodes:
//!
//! 1. If `prev` is the same value as `next`, it survives and is not walked.
//! 2. A resource is released (once per call) and not walked.
//! 3. An opaque value is left alone.
//! 4. A composite already entered in this call is skipped; otherwise its
//!    children are paired with their counterparts in `next` and walked.
//!    Sequence children that appear anywhere in a next sequence survive;
//!    mapping children are matched by key only.
//!
//! Every child of a composite is attempted even when an earlier sibling fails.
//! Failures are gathered per composite according to the [`ErrorPolicy`] and
//! handed to the parent as a single child failure.
//!
//! # Invariants
//!
//! - The walk is depth-first and follows child order, on a heap-allocated
//!   stack with one frame per open composite.
//! - A composite's children are snapshotted when it is entered, so cleanup
//!   operations may mutate the structure being walked.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use definit_value::{classify, same_value, Category, Deinit, Value};

use crate::config::{EngineConfig, ErrorPolicy};
use crate::error::DeinitError;
use crate::report::DeinitReport;
use crate::visited::VisitedSet;

/// Configurable diff-and-release engine.
#[derive(Clone, Debug, Default)]
pub struct Deinitializer {
    config: EngineConfig,
}

impl Deinitializer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Release everything reachable from `prev` that does not survive into
    /// `next`.
    pub fn diff(&self, prev: &Value, next: &Value) -> DeinitReport {
        let mut walk = Walk::new(&self.config);
        let error = walk.run(prev, next);
        let report = DeinitReport { error, ..walk.report };
        debug!(
            released = report.released,
            failed = report.failed,
            composites = report.composites_entered,
            survivors = report.survivors_skipped,
            "deinit traversal complete"
        );
        report
    }

    /// Release everything reachable from `value`.
    pub fn deep(&self, value: &Value) -> DeinitReport {
        self.diff(value, &Value::Undefined)
    }
}

/// Failures caught among the children of one composite.
struct Failures {
    policy: ErrorPolicy,
    kept: Vec<DeinitError>,
}

impl Failures {
    fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            kept: Vec::new(),
        }
    }

    fn record(&mut self, error: DeinitError) {
        match self.policy {
            ErrorPolicy::KeepLast => {
                self.kept.clear();
                self.kept.push(error);
            }
            ErrorPolicy::CollectAll => match error {
                DeinitError::Multiple(errors) => self.kept.extend(errors),
                single => self.kept.push(single),
            },
        }
    }

    fn into_error(mut self) -> Option<DeinitError> {
        match self.kept.len() {
            0 => None,
            1 => self.kept.pop(),
            _ => Some(DeinitError::Multiple(self.kept)),
        }
    }
}

/// An open composite: the child pairs still to visit and the failures seen so
/// far.
struct Frame {
    pending: std::vec::IntoIter<(Value, Value)>,
    failures: Failures,
}

enum Step {
    Done,
    Failed(DeinitError),
    Enter(Frame),
}

/// State of one traversal.
struct Walk<'a> {
    config: &'a EngineConfig,
    visited: VisitedSet,
    stack: Vec<Frame>,
    report: DeinitReport,
}

impl<'a> Walk<'a> {
    fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            visited: VisitedSet::new(),
            stack: Vec::new(),
            report: DeinitReport::default(),
        }
    }

    fn run(&mut self, prev: &Value, next: &Value) -> Option<DeinitError> {
        match self.step(prev, next) {
            Step::Done => return None,
            Step::Failed(error) => return Some(error),
            Step::Enter(frame) => self.stack.push(frame),
        }

        while let Some(frame) = self.stack.last_mut() {
            let Some((child_prev, child_next)) = frame.pending.next() else {
                let Some(done) = self.stack.pop() else { break };
                let outcome = done.failures.into_error();
                match self.stack.last_mut() {
                    Some(parent) => {
                        if let Some(error) = outcome {
                            parent.failures.record(error);
                        }
                    }
                    None => return outcome,
                }
                continue;
            };

            match self.step(&child_prev, &child_next) {
                Step::Done => {}
                Step::Failed(error) => {
                    if let Some(parent) = self.stack.last_mut() {
                        parent.failures.record(error);
                    }
                }
                Step::Enter(child) => self.stack.push(child),
            }
        }

        None
    }

    fn step(&mut self, prev: &Value, next: &Value) -> Step {
        if same_value(prev, next) {
            if classify(prev) != Category::Opaque {
                self.report.survivors_skipped += 1;
            }
            return Step::Done;
        }

        match classify(prev) {
            Category::Resource => match prev {
                Value::Resource(resource) => self.release(prev, resource),
                _ => Step::Done,
            },
            Category::Opaque => Step::Done,
            category @ (Category::Sequence | Category::Mapping) => {
                if self.visited.contains(prev) {
                    self.report.cycles_skipped += 1;
                    return Step::Done;
                }

                let depth = self.stack.len() + 1;
                if let Some(limit) = self.config.max_depth {
                    if depth > limit {
                        warn!(limit, "structure exceeds maximum depth; not entering");
                        return Step::Failed(DeinitError::DepthExceeded { limit });
                    }
                }

                self.visited.insert(prev);
                self.report.composites_entered += 1;
                let pairs = self.child_pairs(prev, next);
                trace!(kind = %category, children = pairs.len(), depth, "entering composite");
                Step::Enter(Frame {
                    pending: pairs.into_iter(),
                    failures: Failures::new(self.config.error_policy),
                })
            }
        }
    }

    fn release(&mut self, value: &Value, resource: &Rc<dyn Deinit>) -> Step {
        if !self.visited.insert(value) {
            self.report.repeats_skipped += 1;
            return Step::Done;
        }

        let label = resource.describe().into_owned();
        match resource.deinit() {
            Ok(()) => {
                self.report.released += 1;
                debug!(resource = %label, "released resource");
                Step::Done
            }
            Err(source) => {
                self.report.failed += 1;
                warn!(resource = %label, error = %source, "resource cleanup failed");
                Step::Failed(DeinitError::Cleanup {
                    resource: label,
                    source,
                })
            }
        }
    }

    /// Pair each child of `prev` with its counterpart in `next`, dropping the
    /// children that survive.
    fn child_pairs(&mut self, prev: &Value, next: &Value) -> Vec<(Value, Value)> {
        match prev {
            Value::Seq(seq) => {
                let next_seq = next.as_seq();
                let mut pairs = Vec::with_capacity(seq.len());
                for (index, child) in seq.snapshot().into_iter().enumerate() {
                    if let Some(next_seq) = next_seq {
                        if next_seq.contains(&child) {
                            if classify(&child) != Category::Opaque {
                                self.report.survivors_skipped += 1;
                            }
                            continue;
                        }
                    }
                    let counterpart = next_seq
                        .and_then(|next_seq| next_seq.get(index))
                        .unwrap_or_default();
                    pairs.push((child, counterpart));
                }
                pairs
            }
            Value::Map(map) => {
                let next_map = next.as_map();
                map.snapshot()
                    .into_iter()
                    .map(|(key, child)| {
                        let counterpart = next_map
                            .and_then(|next_map| next_map.get(&key))
                            .unwrap_or_default();
                        (child, counterpart)
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}
