//! Run progress reporting.
//!
//! The engine never prints; it narrates through [`Reporter`] and the binary
//! decides how to render. Every method has an empty default body so a
//! reporter only implements the events it cares about.

use crate::types::{ItemKind, Transition};

/// Sink for run progress events, in execution order.
pub trait Reporter {
    /// An action for `slug` is about to run.
    fn action_started(&self, _kind: ItemKind, _slug: &str, _transition: &Transition) {}

    /// The action for `slug` finished.
    fn action_finished(
        &self,
        _kind: ItemKind,
        _slug: &str,
        _transition: &Transition,
        _error: Option<&str>,
    ) {
    }

    /// `slug` is unknown to the registry and will never be managed.
    fn item_excluded(&self, _kind: ItemKind, _slug: &str) {}

    /// The registry could not be consulted for `slug` this run.
    fn item_unresolved(&self, _kind: ItemKind, _slug: &str, _message: &str) {}

    /// A core phase is about to run.
    fn core_phase_started(&self, _phase: &str, _detail: &str) {}

    /// A core phase finished.
    fn core_phase_finished(&self, _phase: &str, _error: Option<&str>) {}

    /// Free-form informational note.
    fn note(&self, _message: &str) {}
}

/// Reporter that swallows every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}
