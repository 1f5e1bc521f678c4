use std::fmt;

/// Errors produced while converting HTML into a content state. Any of these
/// is fatal for the document being loaded; there is no partial recovery.
#[derive(Debug)]
pub enum ParseError {
    /// An atomic block carried a sentinel token with no stored HTML behind
    /// it. Indicates broken pruning bookkeeping, not bad user input.
    MissingSentinel { token: String },
    /// A table cell sub-document failed to serialize.
    CellEncode(String),
    /// Re-serializing a pruned subtree failed.
    Serialize(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingSentinel { token } => {
                write!(f, "sentinel token '{}' has no stored markup", token)
            }
            ParseError::CellEncode(msg) => write!(f, "cannot encode table cell: {}", msg),
            ParseError::Serialize(msg) => write!(f, "cannot serialize subtree: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}
