//! Token types for the ES3-flavored JavaScript surface.
//!
//! Includes the JScript conditional-compilation directives (`@cc_on`,
//! `@if`, `@set`, ...), which the lexer produces as ordinary tokens while
//! scanning inside `/*@ ... @*/` comments.

use crate::span::Span;

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// True when a line terminator occurred between the previous token and
    /// this one. Drives automatic semicolon insertion.
    pub newline_before: bool,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub const fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self { kind, span, newline_before }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals ===
    /// Identifier: `foo`, `_bar`, `$baz`
    Identifier(String),
    /// String literal, decoded: `"hello"`, `'world'`
    String(String),
    /// Number literal: `42`, `3.14`, `0xff`
    Number(f64),
    /// Regular expression: `/pattern/flags`
    Regex { pattern: String, flags: String },

    // === Keywords ===
    // Declarations
    Var,
    Function,

    // Control flow
    If,
    Else,
    Switch,
    Case,
    Default,
    For,
    While,
    Do,
    Break,
    Continue,
    Return,

    // Exception handling
    Try,
    Catch,
    Finally,
    Throw,

    // Operators as keywords
    New,
    Delete,
    Typeof,
    Void,
    In,
    Instanceof,

    // Values
    This,
    Null,
    True,
    False,

    // Other
    With,
    Debugger,

    // === Conditional compilation ===
    /// `@cc_on`
    CcOn,
    /// `@if`
    CcIf,
    /// `@elif`
    CcElif,
    /// `@else`
    CcElse,
    /// `@end`
    CcEnd,
    /// `@set`
    CcSet,
    /// `@name` — a conditional-compilation variable reference
    CcName(String),

    // === Punctuation ===
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]

    Semicolon, // ;
    Comma,     // ,
    Colon,     // :
    Dot,       // .
    Question,  // ?

    // === Operators ===
    // Assignment
    Eq,       // =
    PlusEq,   // +=
    MinusEq,  // -=
    StarEq,   // *=
    SlashEq,  // /=
    PercentEq, // %=
    AmpEq,    // &=
    PipeEq,   // |=
    CaretEq,  // ^=
    LtLtEq,   // <<=
    GtGtEq,   // >>=
    GtGtGtEq, // >>>=

    // Comparison
    EqEq,     // ==
    EqEqEq,   // ===
    BangEq,   // !=
    BangEqEq, // !==
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=

    // Arithmetic
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusPlus,   // ++
    MinusMinus, // --

    // Bitwise
    Amp,    // &
    Pipe,   // |
    Caret,  // ^
    Tilde,  // ~
    LtLt,   // <<
    GtGt,   // >>
    GtGtGt, // >>>

    // Logical
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !

    // === Special ===
    /// End of file
    Eof,
    /// Invalid token (lexer error)
    Invalid,
}

impl TokenKind {
    /// Check if this token can be the last token of an expression.
    ///
    /// A `/` following such a token is division; anywhere else it starts a
    /// regular expression literal.
    pub fn can_end_expr(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::Regex { .. }
                | TokenKind::CcName(_)
                | TokenKind::This
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Check if this is an assignment operator.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::LtLtEq
                | TokenKind::GtGtEq
                | TokenKind::GtGtGtEq
        )
    }

    /// Get the precedence of a binary operator (higher = binds tighter).
    /// Returns None if not a binary operator.
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            TokenKind::PipePipe => Some(1),
            TokenKind::AmpAmp => Some(2),
            TokenKind::Pipe => Some(3),
            TokenKind::Caret => Some(4),
            TokenKind::Amp => Some(5),
            TokenKind::EqEq | TokenKind::EqEqEq | TokenKind::BangEq | TokenKind::BangEqEq => Some(6),
            TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq
            | TokenKind::In | TokenKind::Instanceof => Some(7),
            TokenKind::LtLt | TokenKind::GtGt | TokenKind::GtGtGt => Some(8),
            TokenKind::Plus | TokenKind::Minus => Some(9),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(10),
            _ => None,
        }
    }
}

/// Look up a keyword from an identifier string.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "var" => Some(TokenKind::Var),
        "function" => Some(TokenKind::Function),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "switch" => Some(TokenKind::Switch),
        "case" => Some(TokenKind::Case),
        "default" => Some(TokenKind::Default),
        "for" => Some(TokenKind::For),
        "while" => Some(TokenKind::While),
        "do" => Some(TokenKind::Do),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "return" => Some(TokenKind::Return),
        "try" => Some(TokenKind::Try),
        "catch" => Some(TokenKind::Catch),
        "finally" => Some(TokenKind::Finally),
        "throw" => Some(TokenKind::Throw),
        "new" => Some(TokenKind::New),
        "delete" => Some(TokenKind::Delete),
        "typeof" => Some(TokenKind::Typeof),
        "void" => Some(TokenKind::Void),
        "in" => Some(TokenKind::In),
        "instanceof" => Some(TokenKind::Instanceof),
        "this" => Some(TokenKind::This),
        "null" => Some(TokenKind::Null),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "with" => Some(TokenKind::With),
        "debugger" => Some(TokenKind::Debugger),
        _ => None,
    }
}

/// Look up a conditional-compilation directive keyword (without the `@`).
pub fn cc_keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "cc_on" => Some(TokenKind::CcOn),
        "if" => Some(TokenKind::CcIf),
        "elif" => Some(TokenKind::CcElif),
        "else" => Some(TokenKind::CcElse),
        "end" => Some(TokenKind::CcEnd),
        "set" => Some(TokenKind::CcSet),
        _ => None,
    }
}

/// Check whether a name may never be used as an identifier.
///
/// Covers the ES3 keywords, the literal keywords, and the future reserved
/// words. Generated short names are filtered through this, as are property
/// names considered for quote removal.
pub fn is_reserved_word(s: &str) -> bool {
    matches!(
        s,
        // Keywords
        "break" | "case" | "catch" | "continue" | "default" | "delete" | "do"
        | "else" | "finally" | "for" | "function" | "if" | "in" | "instanceof"
        | "new" | "return" | "switch" | "this" | "throw" | "try" | "typeof"
        | "var" | "void" | "while" | "with" | "debugger"
        // Literals
        | "null" | "true" | "false"
        // Future reserved words
        | "abstract" | "boolean" | "byte" | "char" | "class" | "const"
        | "double" | "enum" | "export" | "extends" | "final" | "float"
        | "goto" | "implements" | "import" | "int" | "interface" | "long"
        | "native" | "package" | "private" | "protected" | "public" | "short"
        | "static" | "super" | "synchronized" | "throws" | "transient"
        | "volatile"
    )
}

/// Check whether a string is usable as a bare identifier: non-empty, valid
/// identifier characters, and not a reserved word.
///
/// This is the safety gate for emitting object-literal property names
/// without quotes.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$') => {}
        _ => return false,
    }
    if !bytes.all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$')) {
        return false;
    }
    !is_reserved_word(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_from_str("var"), Some(TokenKind::Var));
        assert_eq!(keyword_from_str("with"), Some(TokenKind::With));
        // Future reserved words lex as identifiers, not keywords
        assert_eq!(keyword_from_str("goto"), None);
        assert_eq!(keyword_from_str("class"), None);
    }

    #[test]
    fn test_reserved_superset() {
        // Every keyword is reserved
        assert!(is_reserved_word("do"));
        assert!(is_reserved_word("in"));
        // Future reserved words are reserved without being keywords
        assert!(is_reserved_word("goto"));
        assert!(is_reserved_word("enum"));
        assert!(!is_reserved_word("data"));
    }

    #[test]
    fn test_valid_identifier() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_a$1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1up"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("if"));
        assert!(!is_valid_identifier("class"));
    }

    #[test]
    fn test_regex_context() {
        // Division follows a value; a regex follows an operator
        assert!(TokenKind::Identifier("a".into()).can_end_expr());
        assert!(TokenKind::RParen.can_end_expr());
        assert!(!TokenKind::Eq.can_end_expr());
        assert!(!TokenKind::Return.can_end_expr());
        assert!(!TokenKind::Comma.can_end_expr());
    }
}
