use thiserror::Error;

use crate::reader::Position;

/// Error raised when a query source or document cannot be decoded.
///
/// This is the single failure surface of the crate: lexing, parsing,
/// ES DSL decoding and KQL rendering all report through it. `offset` is a
/// 0-based code point offset into the source; `line` and `column` count
/// from 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {line}, column {column})")]
pub struct DecodeError {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl DecodeError {
    /// Create an error anchored at a source position.
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            offset: position.offset,
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    /// Create an error with no originating source text.
    ///
    /// Used by the ES DSL decoder and the KQL renderer, which operate on
    /// in-memory values rather than source strings. The position is pinned
    /// to the start of a hypothetical input.
    pub fn sourceless(message: impl Into<String>) -> Self {
        Self::new(Position::start(), message)
    }

    /// Position the error is anchored at.
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }
}

/// Result type alias for kuery operations
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError {
            offset: 10,
            line: 1,
            column: 11,
            message: "unexpected token COLON".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected token COLON (line 1, column 11)");
    }

    #[test]
    fn test_sourceless_error_position() {
        let err = DecodeError::sourceless("not representable in KQL");
        assert_eq!(err.offset, 0);
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
    }
}
