use std::fmt;
use std::str::FromStr;

/// Error codes for all hop compiler diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E4xxx: isolation planning errors (user-facing)
/// - E9xxx: internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Isolation planning errors (E4xxx)
    /// Conflicting isolation attributes
    E4001,
    /// Multiple isolated parameters
    E4002,
    /// Isolated parameter, or the argument passed to one, is not an actor
    E4003,
    /// Unknown global actor
    E4004,
    /// Closure is both global-actor attributed and inherits actor context
    E4005,
    /// Call to an undeclared function
    E4006,
    /// Actor-isolated member used without an actor receiver
    E4007,
    /// Cross-isolation call from a synchronous context
    E4008,
    /// Throwing call in a non-throwing context
    E4009,
    /// Call does not match its callee's declaration
    E4010,

    // Internal errors (E9xxx)
    /// Hop placement invariant violated
    E9001,
    /// Too many errors
    E9002,
}

impl ErrorCode {
    /// Every code, in numeric order.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::E4001,
        ErrorCode::E4002,
        ErrorCode::E4003,
        ErrorCode::E4004,
        ErrorCode::E4005,
        ErrorCode::E4006,
        ErrorCode::E4007,
        ErrorCode::E4008,
        ErrorCode::E4009,
        ErrorCode::E4010,
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E4006 => "E4006",
            ErrorCode::E4007 => "E4007",
            ErrorCode::E4008 => "E4008",
            ErrorCode::E4009 => "E4009",
            ErrorCode::E4010 => "E4010",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// One-line summary, used as the default diagnostic headline.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E4001 => "conflicting isolation attributes",
            ErrorCode::E4002 => "multiple isolated parameters",
            ErrorCode::E4003 => "isolated parameter or argument is not an actor",
            ErrorCode::E4004 => "unknown global actor",
            ErrorCode::E4005 => "closure cannot both override and inherit isolation",
            ErrorCode::E4006 => "call to undeclared function",
            ErrorCode::E4007 => "actor-isolated member used without an actor receiver",
            ErrorCode::E4008 => "cross-isolation call from synchronous context",
            ErrorCode::E4009 => "throwing call in non-throwing context",
            ErrorCode::E4010 => "call does not match its declaration",
            ErrorCode::E9001 => "hop placement invariant violated",
            ErrorCode::E9002 => "too many errors",
        }
    }

    /// Long-form documentation page, if the code has one.
    pub fn explanation(&self) -> Option<&'static str> {
        crate::ErrorDocs::get(*self)
    }

    /// Internal compiler errors are never the user's fault.
    pub fn is_internal(&self) -> bool {
        self.as_str().starts_with("E9")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`ErrorCode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseErrorCodeError(pub String);

impl fmt::Display for ParseErrorCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error code `{}`", self.0)
    }
}

impl std::error::Error for ParseErrorCodeError {}

impl FromStr for ErrorCode {
    type Err = ParseErrorCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| ParseErrorCodeError(s.to_owned()))
    }
}
