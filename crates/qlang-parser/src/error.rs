//! Parse error type for the QLang parser.

use std::fmt;

/// A parse error with location information.
///
/// Every parse error is also forwarded to the diagnostic collector with the
/// enclosing `Class.Method` context; this type exists so callers that only
/// run the parser still get a typed error list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::new("expected 'end' to close class", 4, 1);
        assert_eq!(err.to_string(), "expected 'end' to close class");
        assert_eq!((err.line, err.column), (4, 1));
    }
}
