// QLang lexer -- tokenizer for the QLang scripting language.

mod cursor;

use cursor::Cursor;
use qlang_common::diag::{ErrorCollector, Severity};
use qlang_common::error::{LexError, LexErrorKind};
use qlang_common::token::{keyword_from_str, Token, TokenKind};

/// The QLang lexer. Converts source text into a stream of tokens.
///
/// Lexing never fails fatally: unrecognised characters become `Unknown`
/// tokens plus a recorded [`LexError`], and unterminated strings/comments
/// are reported and skipped. Whitespace is discarded except that every
/// `\n` emits an end-of-line token (in addition to any `;`).
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source. The returned stream always ends with an
    /// `Eof` token.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
        let mut lexer = Lexer::new(source);
        while !lexer.cursor.is_eof() {
            lexer.scan_token();
        }
        lexer
            .tokens
            .push(Token::new(TokenKind::Eof, "", lexer.cursor.line(), lexer.cursor.column()));
        (lexer.tokens, lexer.errors)
    }

    /// Tokenize and route lexer errors into a diagnostic collector.
    ///
    /// Also stores the source text on the collector for listing excerpts.
    pub fn tokenize_into(source: &str, collector: &mut ErrorCollector) -> Vec<Token> {
        collector.set_source(source);
        let (tokens, errors) = Self::tokenize(source);
        for err in errors {
            collector.report(
                Severity::Error,
                err.to_string(),
                err.line,
                err.column,
                0,
                "lexer",
                "",
            );
        }
        tokens
    }

    // ── Scanning ───────────────────────────────────────────────────────

    fn scan_token(&mut self) {
        let Some(c) = self.cursor.peek() else {
            return;
        };

        // Newlines are statement terminators, not trivia.
        if c == '\n' {
            let (line, col) = self.pos();
            self.cursor.advance();
            self.push(TokenKind::Eol, "\n", line, col);
            return;
        }

        if c.is_whitespace() {
            self.cursor.advance();
            return;
        }

        if c == '/' {
            match self.cursor.peek_next() {
                Some('/') => {
                    self.cursor.eat_while(|c| c != '\n');
                    return;
                }
                Some('*') => {
                    self.skip_block_comment();
                    return;
                }
                _ => {}
            }
        }

        if c.is_ascii_alphabetic() || c == '_' {
            self.scan_ident_or_keyword();
        } else if c.is_ascii_digit() {
            self.scan_number();
        } else if c == '"' {
            self.scan_string();
        } else {
            self.scan_operator_or_punctuation();
        }
    }

    /// Skip a `/* ... */` comment; report if EOF arrives before `*/`.
    fn skip_block_comment(&mut self) {
        let (line, col) = self.pos();
        self.cursor.advance(); // /
        self.cursor.advance(); // *
        loop {
            match self.cursor.peek() {
                None => {
                    self.errors
                        .push(LexError::new(LexErrorKind::UnterminatedComment, line, col));
                    return;
                }
                Some('*') if self.cursor.peek_next() == Some('/') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return;
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    fn scan_ident_or_keyword(&mut self) {
        let (line, col) = self.pos();
        let mut text = String::new();
        self.cursor
            .eat_while_into(&mut text, |c| c.is_ascii_alphanumeric() || c == '_');
        let kind = keyword_from_str(&text).unwrap_or(TokenKind::Ident);
        self.push(kind, text, line, col);
    }

    /// Decimal integers, `0x` hex, and floats. The dot only begins a
    /// fractional part when followed by a digit, so `1.method()` lexes as
    /// integer, dot, identifier.
    fn scan_number(&mut self) {
        let (line, col) = self.pos();
        let mut text = String::new();

        let first = self.cursor.advance().unwrap_or('0');
        text.push(first);

        if first == '0' && matches!(self.cursor.peek(), Some('x' | 'X')) {
            text.push(self.cursor.advance().unwrap_or('x'));
            self.cursor
                .eat_while_into(&mut text, |c| c.is_ascii_hexdigit());
            self.push(TokenKind::Int, text, line, col);
            return;
        }

        self.cursor
            .eat_while_into(&mut text, |c| c.is_ascii_digit());

        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            text.push('.');
            self.cursor.advance();
            self.cursor
                .eat_while_into(&mut text, |c| c.is_ascii_digit());
            self.push(TokenKind::Float, text, line, col);
        } else {
            self.push(TokenKind::Int, text, line, col);
        }
    }

    /// A string runs to the next `"`. Embedded newlines are accepted (the
    /// cursor keeps counting lines); EOF before the closing quote is an
    /// error and the partial content is dropped.
    fn scan_string(&mut self) {
        let (line, col) = self.pos();
        self.cursor.advance(); // opening "

        let mut text = String::new();
        loop {
            match self.cursor.peek() {
                None => {
                    self.errors
                        .push(LexError::new(LexErrorKind::UnterminatedString, line, col));
                    return;
                }
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.cursor.advance();
                }
            }
        }
        self.push(TokenKind::Str, text, line, col);
    }

    fn scan_operator_or_punctuation(&mut self) {
        let (line, col) = self.pos();
        let c = self.cursor.advance().unwrap_or('\0');
        let mut text = String::from(c);

        match c {
            '+' | '-' => {
                // ++/-- and the compound-assignment spellings +=/-=
                if self.cursor.peek() == Some(c) || self.cursor.peek() == Some('=') {
                    text.push(self.cursor.advance().unwrap_or('='));
                }
                self.push(TokenKind::Operator, text, line, col);
            }
            '*' | '/' | '=' | '!' => {
                if self.cursor.peek() == Some('=') {
                    text.push('=');
                    self.cursor.advance();
                }
                self.push(TokenKind::Operator, text, line, col);
            }
            '<' => {
                if self.cursor.peek() == Some('=') {
                    text.push('=');
                    self.cursor.advance();
                    self.push(TokenKind::Operator, text, line, col);
                } else {
                    // dedicated kind so the parser can use it as a generic bracket
                    self.push(TokenKind::Less, text, line, col);
                }
            }
            '>' => {
                if self.cursor.peek() == Some('=') {
                    text.push('=');
                    self.cursor.advance();
                    self.push(TokenKind::Operator, text, line, col);
                } else {
                    self.push(TokenKind::Greater, text, line, col);
                }
            }
            '&' => {
                if self.cursor.peek() == Some('&') {
                    text.push('&');
                    self.cursor.advance();
                    self.push(TokenKind::Operator, text, line, col);
                } else {
                    self.unknown(text, line, col);
                }
            }
            '|' => {
                if self.cursor.peek() == Some('|') {
                    text.push('|');
                    self.cursor.advance();
                    self.push(TokenKind::Operator, text, line, col);
                } else {
                    self.unknown(text, line, col);
                }
            }
            ';' => self.push(TokenKind::Eol, text, line, col),
            ',' => self.push(TokenKind::Comma, text, line, col),
            '.' => self.push(TokenKind::Dot, text, line, col),
            ':' => {
                if self.cursor.peek() == Some(':') {
                    text.push(':');
                    self.cursor.advance();
                    self.push(TokenKind::Scope, text, line, col);
                } else {
                    self.push(TokenKind::Colon, text, line, col);
                }
            }
            '(' => self.push(TokenKind::LParen, text, line, col),
            ')' => self.push(TokenKind::RParen, text, line, col),
            '{' => self.push(TokenKind::LBrace, text, line, col),
            '}' => self.push(TokenKind::RBrace, text, line, col),
            '[' => self.push(TokenKind::LBracket, text, line, col),
            ']' => self.push(TokenKind::RBracket, text, line, col),
            _ => self.unknown(text, line, col),
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn pos(&self) -> (u32, u32) {
        (self.cursor.line(), self.cursor.column())
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, line: u32, column: u32) {
        self.tokens.push(Token::new(kind, text, line, column));
    }

    fn unknown(&mut self, text: String, line: u32, column: u32) {
        let c = text.chars().next().unwrap_or('\0');
        self.errors
            .push(LexError::new(LexErrorKind::UnexpectedCharacter(c), line, column));
        self.push(TokenKind::Unknown, text, line, column);
    }
}
