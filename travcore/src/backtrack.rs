//! Backtracking signals (§4.4): a pass may abandon a traversal by raising a
//! trigger that an upstream pass in the pipeline may catch and handle.
//!
//! The design note suggests modeling the raise/catch protocol as an
//! explicit result type threaded through the engine rather than reaching
//! for host-language exceptions or panics -- [`VisitResult`] is exactly
//! that: every hook in [`crate::inspector`], [`crate::modifier`] and
//! [`crate::transform`] returns one, and `?` propagates a trigger up to
//! whichever frame chooses to catch it.

use std::any::Any;
use std::fmt;

/// A typed control-flow signal raised by a pass (§3: "Trigger"). Concrete
/// passes define their own trigger payloads and implement this trait for
/// them; `as_any` lets a catching pass recover the concrete type.
pub trait Trigger: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

/// A trigger in flight, boxed so the engine doesn't need to be generic
/// over every trigger type a pipeline might use.
pub type TriggerBox = Box<dyn Trigger>;

/// The result type every traversal hook returns: `Ok` on ordinary
/// completion, `Err` carrying a trigger that propagates up the apply stack
/// until a [`Backtrack`] implementation catches it (§4.4, §7).
pub type VisitResult<T> = Result<T, TriggerBox>;

/// Implemented by passes that may catch a trigger raised by a pass that ran
/// before them in the pipeline.
pub trait Backtrack {
    /// Attempt to recover from `trigger`. Returning `true` stops
    /// propagation (the pipeline resumes after this pass); `false`
    /// re-raises it to the next pass upstream.
    fn backtrack(&mut self, trigger: &dyn Trigger) -> bool {
        let _ = trigger;
        false
    }

    /// Whether this pass can ever catch a trigger, allowing the pipeline
    /// to statically skip it when scanning for a catcher. Defaults to
    /// `true`: most passes never backtrack.
    fn never_backtracks(&self) -> bool {
        true
    }
}
