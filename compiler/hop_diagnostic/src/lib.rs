//! Diagnostic system for isolation planning and hop placement.
//!
//! - Error codes for searchability ([`ErrorCode`], documented via
//!   [`ErrorDocs`])
//! - A primary span and optional secondary labels per [`Diagnostic`]
//! - Notes and suggestions explaining how to fix the problem
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is type-level proof that at least one error was
//! emitted into a [`DiagnosticQueue`]. Passes that abort codegen for a
//! function return it instead of silently producing nothing.
//!
//! ```text
//! let guarantee = queue.emit_error(diagnostic);
//! fn lower(..) -> Result<HopFunction, ErrorGuaranteed> { ... }
//! ```

mod diagnostic;
mod error_code;
pub mod errors;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::{ErrorCode, ParseErrorCodeError};
pub use errors::ErrorDocs;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
