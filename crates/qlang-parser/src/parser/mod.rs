//! Recursive-descent parser for QLang.
//!
//! The parser walks the token stream with single-token lookahead plus one
//! save/restore point for disambiguating dotted chains (`a.b.c(...)` vs
//! `a.b.c = ...`). While parsing it tracks known class and enum names,
//! the variables declared in the current method, the members of the class
//! being parsed, and the active generic type parameters; these sets drive
//! the statement classification table and the parse-time undeclared-name
//! warning.
//!
//! Errors are reported to the diagnostic collector with the enclosing
//! `Class.Method` context, and the parser recovers by skipping to the next
//! statement boundary so one run surfaces as many problems as possible.

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod stmts;

use rustc_hash::FxHashSet;

use qlang_common::diag::{ErrorCollector, Severity};
use qlang_common::token::{Token, TokenKind};

use crate::ast::Program;
use crate::error::ParseError;

/// Recursive-descent parser over a token stream.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    collector: &'a mut ErrorCollector,
    errors: Vec<ParseError>,
    /// Class names seen so far (declared or host-registered), used to
    /// classify `Name ident` as an instance declaration.
    class_names: FxHashSet<String>,
    enum_names: FxHashSet<String>,
    /// Variables declared in the current method scope (or at top level).
    declared_vars: FxHashSet<String>,
    /// Members of the class currently being parsed.
    class_members: FxHashSet<String>,
    /// Generic type parameters of the class currently being parsed.
    type_params: Vec<String>,
    /// Diagnostic context: `Class` or `Class.Method`.
    context: String,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, collector: &'a mut ErrorCollector) -> Self {
        Self {
            tokens,
            pos: 0,
            collector,
            errors: Vec::new(),
            class_names: FxHashSet::default(),
            enum_names: FxHashSet::default(),
            declared_vars: FxHashSet::default(),
            class_members: FxHashSet::default(),
            type_params: Vec::new(),
            context: String::new(),
        }
    }

    /// Register a host-supplied class name so import-style scripts that use
    /// engine classes parse their instance declarations correctly.
    pub fn register_known_class(&mut self, name: impl Into<String>) {
        self.class_names.insert(name.into());
    }

    pub fn register_known_classes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.register_known_class(name);
        }
    }

    /// Parse errors collected so far (also mirrored into the diagnostic
    /// collector).
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // ── Token cursor ───────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            // The lexer always terminates the stream with Eof; this covers
            // an empty token vector from a hand-constructed parser.
            self.tokens.last().expect("token stream must not be empty")
        })
    }

    pub(crate) fn peek_next(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .unwrap_or_else(|| self.tokens.last().expect("token stream must not be empty"))
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn at_op(&self, op: &str) -> bool {
        self.peek().is_op(op)
    }

    /// Consume the current token if it matches; no error otherwise.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it matches; report otherwise.
    pub(crate) fn expect(&mut self, kind: TokenKind, message: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.report(message);
            false
        }
    }

    /// Skip any run of end-of-line tokens.
    pub(crate) fn skip_eols(&mut self) {
        while self.at(TokenKind::Eol) {
            self.advance();
        }
    }

    pub(crate) fn save(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    // ── Error reporting and recovery ───────────────────────────────────

    pub(crate) fn report(&mut self, message: &str) {
        self.report_severity(message, Severity::Error);
    }

    pub(crate) fn report_severity(&mut self, message: &str, severity: Severity) {
        let (line, column) = {
            let tok = self.peek();
            (tok.line, tok.column)
        };
        self.errors.push(ParseError::new(message, line, column));
        self.collector
            .report(severity, message, line, column, 0, "parser", &self.context);
    }

    /// Consume tokens until a statement boundary: just past an end-of-line,
    /// or at the next statement-starting keyword.
    pub(crate) fn recover_to_next_statement(&mut self) {
        self.advance(); // the problematic token

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Eol {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Method
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::End => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Name tracking ──────────────────────────────────────────────────

    pub(crate) fn is_class_name(&self, name: &str) -> bool {
        self.class_names.contains(name)
    }

    pub(crate) fn is_type_param(&self, name: &str) -> bool {
        self.type_params.iter().any(|p| p == name)
    }

    pub(crate) fn declare_var(&mut self, name: &str) {
        self.declared_vars.insert(name.to_owned());
    }

    pub(crate) fn is_declared(&self, name: &str) -> bool {
        self.declared_vars.contains(name) || self.class_members.contains(name)
    }

    // ── Program ────────────────────────────────────────────────────────

    /// Parse a complete program: module/import headers, classes, enums, and
    /// the top-level code block, then run the post-parse expression checks.
    pub fn parse(&mut self) -> Program {
        let mut program = Program::new();

        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Module => {
                    self.advance();
                    if self.at(TokenKind::Ident) {
                        // module name is parsed and discarded
                        self.advance();
                    } else {
                        self.report("Expected module name after 'module'");
                    }
                    self.skip_eols();
                }
                TokenKind::Import => {
                    self.advance();
                    if self.at(TokenKind::Ident) {
                        let name = self.advance();
                        program.imports.push(name.text);
                    } else {
                        self.report("Expected module name after 'import'");
                    }
                    self.skip_eols();
                }
                TokenKind::Static => {
                    self.advance();
                    if self.at(TokenKind::Class) {
                        if let Some(mut cls) = self.parse_class() {
                            cls.is_static = true;
                            self.class_names.insert(cls.name.clone());
                            program.classes.push(cls);
                        }
                    } else {
                        self.report("Expected 'class' after 'static'");
                        self.recover_to_next_statement();
                    }
                }
                TokenKind::Class => {
                    if let Some(cls) = self.parse_class() {
                        self.class_names.insert(cls.name.clone());
                        program.classes.push(cls);
                    }
                }
                TokenKind::Enum => {
                    if let Some(def) = self.parse_enum() {
                        self.enum_names.insert(def.name.clone());
                        program.enums.push(def);
                    }
                }
                TokenKind::Eol => {
                    self.advance();
                }
                _ => break,
            }
        }

        program.code = self.parse_block();

        program.check_for_errors(self.collector);
        program
    }
}
