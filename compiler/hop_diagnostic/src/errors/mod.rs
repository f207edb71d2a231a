//! Embedded error documentation for `hopc explain`.
//!
//! Each error code has a markdown file in this directory, embedded at
//! compile time.

use crate::ErrorCode;

/// Registry of embedded error documentation.
pub struct ErrorDocs;

impl ErrorDocs {
    /// Documentation for a code, if written.
    pub fn get(code: ErrorCode) -> Option<&'static str> {
        DOCS.iter().find(|(c, _)| *c == code).map(|(_, doc)| *doc)
    }

    pub fn all_codes() -> impl Iterator<Item = ErrorCode> {
        DOCS.iter().map(|(code, _)| *code)
    }

    pub fn has_docs(code: ErrorCode) -> bool {
        DOCS.iter().any(|(c, _)| *c == code)
    }
}

static DOCS: &[(ErrorCode, &str)] = &[
    (ErrorCode::E4001, include_str!("E4001.md")),
    (ErrorCode::E4002, include_str!("E4002.md")),
    (ErrorCode::E4003, include_str!("E4003.md")),
    (ErrorCode::E4004, include_str!("E4004.md")),
    (ErrorCode::E4005, include_str!("E4005.md")),
    (ErrorCode::E4006, include_str!("E4006.md")),
    (ErrorCode::E4007, include_str!("E4007.md")),
    (ErrorCode::E4008, include_str!("E4008.md")),
    (ErrorCode::E4009, include_str!("E4009.md")),
    (ErrorCode::E4010, include_str!("E4010.md")),
    (ErrorCode::E9001, include_str!("E9001.md")),
];

#[cfg(test)]
mod tests;
