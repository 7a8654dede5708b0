//! User-facing diagnostics collaborator.
//!
//! The traversal core treats diagnostics as an opaque service (see §1 of the
//! design): passes report warnings and errors against the program under
//! compilation, but the core never lets a diagnostic interrupt a traversal.
//! `warning_enabled` is the single gate a pass consults before emitting a
//! warning, standing in for the enclosing source-level annotations this
//! crate does not model.

use crate::Error;

/// Accumulates diagnostics raised by a pass during one apply.
#[derive(Default, Debug)]
pub struct DiagnosticContext {
    errors: Vec<Error>,
    warnings: Vec<Error>,
}

impl DiagnosticContext {
    pub fn err(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn warning(&mut self, warning: Error) {
        self.warnings.push(warning);
    }

    pub fn warning_iter(&self) -> impl Iterator<Item = &Error> {
        self.warnings.iter()
    }

    pub fn errors_iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Whether a named warning category is enabled for the current position.
///
/// Defaults to enabled; a client embedding a real annotation/pragma system
/// overrides this to consult it.
pub trait WarningGate {
    fn warning_enabled(&self, category: &str) -> bool {
        let _ = category;
        true
    }
}

/// A gate that enables every category, used when no client has opted in to
/// its own annotation system.
#[derive(Default, Clone, Copy, Debug)]
pub struct AlwaysWarn;

impl WarningGate for AlwaysWarn {}
