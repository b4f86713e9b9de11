//! QLang parser: recursive descent over the token stream, producing an
//! owned typed AST.
//!
//! Expressions are deliberately left as flat token lists (precedence is the
//! evaluator's concern); everything else -- classes, enums, methods,
//! statements -- is parsed into typed nodes. The parser reports through the
//! shared diagnostic collector and recovers at statement boundaries, so a
//! single parse surfaces as many problems as possible.

pub mod ast;
pub mod error;
mod parser;

pub use error::ParseError;
pub use parser::Parser;

use qlang_common::diag::ErrorCollector;
use qlang_lexer::Lexer;

use ast::Program;

/// Result of parsing a QLang source file.
pub struct Parse {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl Parse {
    /// Whether parsing completed without errors.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lex and parse a source string, reporting into `collector`.
///
/// This is the main entry point. The collector receives the source text
/// (for listings), all lexer and parser diagnostics, and the per-method
/// context ranges.
pub fn parse(source: &str, collector: &mut ErrorCollector) -> Parse {
    let tokens = Lexer::tokenize_into(source, collector);
    let mut parser = Parser::new(tokens, collector);
    let program = parser.parse();
    let errors = parser.errors().to_vec();
    Parse { program, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entry_point_runs_full_pipeline() {
        let mut collector = ErrorCollector::new();
        let parse = parse("int32 a = 1;\n", &mut collector);
        assert!(parse.ok());
        assert_eq!(parse.program.code.stmts.len(), 1);
    }

    #[test]
    fn parse_reports_lexer_and_parser_errors() {
        let mut collector = ErrorCollector::new();
        let parse = parse("int32 @;\n", &mut collector);
        assert!(!parse.ok() || collector.has_errors());
        assert!(collector.has_errors());
    }
}
