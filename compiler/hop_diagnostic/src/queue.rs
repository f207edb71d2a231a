//! Diagnostic queue for collecting, deduplicating, and sorting diagnostics.
//!
//! Lowering runs function by function; each function that fails planning
//! pushes one or more diagnostics here and moves on. The queue enforces an
//! error limit and drops exact duplicates (the same problem reported for
//! the same span, e.g. a global actor referenced by several calls).

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before further errors are dropped
    /// (0 = unlimited).
    pub error_limit: usize,
    /// Drop diagnostics identical to one already queued.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 20,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// No limit, no deduplication (for tests that count diagnostics).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Collects diagnostics in emission order and hands them back sorted.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    limit_reported: bool,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            limit_reported: false,
            config,
        }
    }

    /// Whether the error limit has been hit.
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    /// Queue a diagnostic. Returns `true` if it was kept.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        if self.config.deduplicate && self.diagnostics.contains(&diagnostic) {
            return false;
        }

        if diagnostic.is_error() {
            if self.limit_reached() {
                if !self.limit_reported {
                    self.limit_reported = true;
                    self.diagnostics.push(
                        Diagnostic::error(ErrorCode::E9002).with_note(format!(
                            "stopped reporting after {} errors",
                            self.config.error_limit
                        )),
                    );
                }
                return false;
            }
            self.error_count += 1;
        }

        self.diagnostics.push(diagnostic);
        true
    }

    /// Queue an error diagnostic and return proof that it was reported.
    ///
    /// The proof is returned even when the diagnostic is deduplicated or
    /// dropped by the limit: an equivalent error is already on record.
    pub fn emit_error(&mut self, diagnostic: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diagnostic.is_error(), "emit_error called with non-error");
        self.add(diagnostic);
        ErrorGuaranteed::new_emitted()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Proof of emitted errors, if any.
    pub fn errors_guaranteed(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Number of queued diagnostics of any severity.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drain the queue, ordered by primary span (diagnostics without a
    /// span, such as internal errors, sort last).
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut out = std::mem::take(&mut self.diagnostics);
        out.sort_by_key(|d| d.primary_span().map_or((1, 0, 0), |s| (0, s.start, s.end)));
        self.error_count = 0;
        self.limit_reported = false;
        out
    }
}
