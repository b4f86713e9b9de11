use serde::Serialize;

/// A token produced by the QLang lexer.
///
/// Tokens carry their source text verbatim (operators keep their spelling in
/// `text`, e.g. `"+"` or `"=="`) together with a 1-based line and column of
/// the first character. Expressions are stored as flat token lists after
/// parsing, so tokens stay cheap to clone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// Synthesized end-of-file token (used by the parser when it runs off
    /// the end of the stream).
    pub fn eof() -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            line: 0,
            column: 0,
        }
    }

    /// Whether this token is an operator with the given spelling.
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

/// Every kind of token in the QLang language.
///
/// Operators share a single kind; the spelling lives in [`Token::text`].
/// `<` and `>` get dedicated kinds so the parser can reuse them as generic
/// brackets without fighting the comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ── Special ────────────────────────────────────────────────────────
    Eof,
    Unknown,

    // ── Literals and names ─────────────────────────────────────────────
    Ident,
    Int,
    Float,
    Str,

    /// Any arithmetic/logic/assignment operator; spelling is in the text.
    Operator,

    // ── Punctuation ────────────────────────────────────────────────────
    /// End of statement: both `;` and `\n` produce this.
    Eol,
    Comma,
    Dot,
    Colon,
    /// `::`
    Scope,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// Bare `<` (generic bracket or comparison, decided by the consumer).
    Less,
    /// Bare `>`.
    Greater,

    // ── Keywords ───────────────────────────────────────────────────────
    Module,
    Import,
    End,
    Class,
    Static,
    Enum,
    Method,
    New,
    Return,
    If,
    Else,
    ElseIf,
    For,
    To,
    Next,
    While,
    Wend,
    True,
    False,
    This,
    Null,
    Super,
    Virtual,
    Override,

    // ── Primitive type keywords ────────────────────────────────────────
    Int32,
    Int64,
    Float32,
    Float64,
    Short,
    StringTy,
    Bool,
    Void,
    Byte,
    /// Raw pointer (`void*` interop).
    Cptr,
    /// Typed raw-pointer aliases; behave like `cptr` at runtime.
    Iptr,
    Fptr,
    Bptr,
}

impl TokenKind {
    /// Whether this kind is a primitive type keyword usable as a declared
    /// variable or parameter type.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Int32
                | TokenKind::Int64
                | TokenKind::Float32
                | TokenKind::Float64
                | TokenKind::Short
                | TokenKind::StringTy
                | TokenKind::Bool
                | TokenKind::Byte
                | TokenKind::Cptr
                | TokenKind::Iptr
                | TokenKind::Fptr
                | TokenKind::Bptr
        )
    }
}

/// Look up a keyword from its string representation.
///
/// Returns `Some(TokenKind)` if the string is a QLang keyword, `None`
/// otherwise. The lexer calls this to distinguish keywords from identifiers
/// after scanning an identifier-shaped token.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "module" => Some(TokenKind::Module),
        "import" => Some(TokenKind::Import),
        "end" => Some(TokenKind::End),
        "class" => Some(TokenKind::Class),
        "static" => Some(TokenKind::Static),
        "enum" => Some(TokenKind::Enum),
        "method" => Some(TokenKind::Method),
        "new" => Some(TokenKind::New),
        "return" => Some(TokenKind::Return),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "elseif" => Some(TokenKind::ElseIf),
        "for" => Some(TokenKind::For),
        "to" => Some(TokenKind::To),
        "next" => Some(TokenKind::Next),
        "while" => Some(TokenKind::While),
        "wend" => Some(TokenKind::Wend),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "this" => Some(TokenKind::This),
        "null" => Some(TokenKind::Null),
        "super" => Some(TokenKind::Super),
        "virtual" => Some(TokenKind::Virtual),
        "override" => Some(TokenKind::Override),
        "int32" => Some(TokenKind::Int32),
        "int64" => Some(TokenKind::Int64),
        "float32" => Some(TokenKind::Float32),
        "float64" => Some(TokenKind::Float64),
        "short" => Some(TokenKind::Short),
        "string" => Some(TokenKind::StringTy),
        "bool" => Some(TokenKind::Bool),
        "void" => Some(TokenKind::Void),
        "byte" => Some(TokenKind::Byte),
        "cptr" => Some(TokenKind::Cptr),
        "iptr" => Some(TokenKind::Iptr),
        "fptr" => Some(TokenKind::Fptr),
        "bptr" => Some(TokenKind::Bptr),
        _ => None,
    }
}

/// Map a primitive type name to its token kind.
///
/// Used when resolving a generic type parameter to a concrete type at
/// instance-construction time. Unknown names resolve to `Ident` (class type).
pub fn type_name_to_kind(name: &str) -> TokenKind {
    match keyword_from_str(name) {
        Some(kind) if kind.is_type_keyword() => kind,
        _ => TokenKind::Ident,
    }
}
