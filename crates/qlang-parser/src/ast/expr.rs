//! Flat-token expressions.
//!
//! The parser deliberately leaves expressions unparsed: an [`Expr`] is an
//! ordered token list with parenthesis balance preserved. Precedence is
//! resolved once, in the evaluator, via Shunting-Yard. What the AST layer
//! does own is the structural pre-validation (`check_for_errors`), which
//! flags shapes like two adjacent values or a dangling trailing operator
//! without blocking evaluation.

use qlang_common::diag::{ErrorCollector, Severity};
use qlang_common::token::{Token, TokenKind};
use serde::Serialize;

/// An unparsed expression: the token sequence between statement punctuation,
/// with inner parentheses kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expr {
    pub tokens: Vec<Token>,
}

impl Expr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// First token's line, for diagnostics.
    pub fn line(&self) -> u32 {
        self.tokens.first().map(|t| t.line).unwrap_or(0)
    }

    /// Whether a token kind can terminate or stand as a value.
    fn is_value(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::RParen
                | TokenKind::RBracket
        )
    }

    /// Structural pre-validation (reported, never gating):
    ///
    /// - two value tokens in a row (missing operator), unless the second is
    ///   a closing bracket/paren;
    /// - an expression starting or ending with a non-unary operator;
    /// - an operator directly after another operator or `(` that is not in
    ///   the legal prefix set (`-`, `!`, `++`, `--`);
    /// - a postfix `++`/`--` immediately followed by a value.
    pub fn check_for_errors(&self, collector: &mut ErrorCollector, context: &str) {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                let prev = &self.tokens[i - 1];
                if Self::is_value(prev.kind)
                    && Self::is_value(token.kind)
                    && !matches!(token.kind, TokenKind::RParen | TokenKind::RBracket)
                {
                    collector.report(
                        Severity::Error,
                        "Expected operator between values",
                        token.line,
                        token.column,
                        token.text.len() as u32,
                        "parser",
                        context,
                    );
                }
            }

            if token.kind != TokenKind::Operator {
                continue;
            }

            if i == self.tokens.len() - 1 {
                let is_postfix = token.text == "++" || token.text == "--";
                if !is_postfix {
                    collector.report(
                        Severity::Error,
                        format!("Expression cannot end with operator '{}'", token.text),
                        token.line,
                        token.column,
                        token.text.len() as u32,
                        "parser",
                        context,
                    );
                }
            }

            let requires_unary = i == 0
                || self.tokens[i - 1].kind == TokenKind::Operator
                || self.tokens[i - 1].kind == TokenKind::LParen;

            if requires_unary {
                let is_unary =
                    matches!(token.text.as_str(), "!" | "-" | "++" | "--");
                if !is_unary {
                    let message = if i == 0 {
                        format!("Expression cannot start with operator '{}'", token.text)
                    } else {
                        format!("Unexpected operator '{}'", token.text)
                    };
                    collector.report(
                        Severity::Error,
                        message,
                        token.line,
                        token.column,
                        token.text.len() as u32,
                        "parser",
                        context,
                    );
                }
            } else if token.text == "++" || token.text == "--" {
                // Postfix: the next token must not be a value.
                if let Some(next) = self.tokens.get(i + 1) {
                    if Self::is_value(next.kind) {
                        collector.report(
                            Severity::Error,
                            "Unexpected value after postfix operator",
                            next.line,
                            next.column,
                            next.text.len() as u32,
                            "parser",
                            context,
                        );
                    }
                }
            }
        }
    }
}
