//! Shared identifier and location types for the hop compiler.
//!
//! Every crate in the workspace names functions, actors, and global-actor
//! types through [`Name`] (a 32-bit interned handle) and points back at
//! source through [`Span`]. The interner is sharded so that independent
//! lowering jobs can intern concurrently.

mod interner;
mod name;
mod span;

pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::Span;
