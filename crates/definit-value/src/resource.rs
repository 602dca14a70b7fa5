//! The cleanup capability.
//!
//! A resource is anything that can be released: a handle, a subscription, a
//! connection. Resources are terminal for traversal; the engine never looks
//! inside a value that implements [`Deinit`], even if it also contains other
//! values.

use std::borrow::Cow;
use std::fmt;

/// Error type returned by a failing cleanup operation.
pub type CleanupError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A value that owns something which must be released.
///
/// `deinit` takes `&self` because resources are shared through `Rc`;
/// implementors that need to track state use interior mutability.
pub trait Deinit {
    /// Release the resource.
    fn deinit(&self) -> Result<(), CleanupError>;

    /// Human-readable label used in logs and error reports.
    ///
    /// Defaults to the implementing type's name.
    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// A labelled resource whose cleanup is a closure.
pub struct ResourceFn<F> {
    label: String,
    release: F,
}

impl<F> ResourceFn<F>
where
    F: Fn() -> Result<(), CleanupError>,
{
    /// Wrap `release` as a resource named `label`.
    pub fn new(label: impl Into<String>, release: F) -> Self {
        Self {
            label: label.into(),
            release,
        }
    }
}

impl<F> Deinit for ResourceFn<F>
where
    F: Fn() -> Result<(), CleanupError>,
{
    fn deinit(&self) -> Result<(), CleanupError> {
        (self.release)()
    }

    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }
}

impl<F> fmt::Debug for ResourceFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFn")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
