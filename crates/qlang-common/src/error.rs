use std::fmt;

use serde::Serialize;

/// A lexer error with location information.
///
/// Errors are collected during lexing rather than aborting immediately,
/// enabling error recovery and reporting multiple issues at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub line: u32,
    pub column: u32,
}

impl LexError {
    pub fn new(kind: LexErrorKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }
}

/// The specific kind of lexer error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LexErrorKind {
    /// An unexpected character was encountered.
    UnexpectedCharacter(char),
    /// A string literal was not closed before end of input.
    UnterminatedString,
    /// A block comment (`/* ... */`) was not closed before end of input.
    UnterminatedComment,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedComment => write!(f, "unterminated comment"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::new(LexErrorKind::UnexpectedCharacter('@'), 3, 7);
        assert_eq!(err.to_string(), "unexpected character: '@'");
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn lex_error_kind_display_all_variants() {
        assert_eq!(
            LexErrorKind::UnterminatedString.to_string(),
            "unterminated string literal"
        );
        assert_eq!(
            LexErrorKind::UnterminatedComment.to_string(),
            "unterminated comment"
        );
    }
}
