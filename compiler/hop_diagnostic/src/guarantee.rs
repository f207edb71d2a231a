//! Type-level proof that an error was reported.

use std::fmt;

/// Proof that at least one error diagnostic was emitted.
///
/// Can only be obtained from [`DiagnosticQueue::emit_error`](crate::DiagnosticQueue::emit_error)
/// or by counting already-emitted errors, so a `Result<_, ErrorGuaranteed>`
/// cannot fail without a diagnostic having been recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// Proof from an error count; `None` when no errors were emitted.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then_some(ErrorGuaranteed(()))
    }

    pub(crate) fn new_emitted() -> Self {
        ErrorGuaranteed(())
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("error(s) emitted")
    }
}

#[cfg(test)]
mod tests;
