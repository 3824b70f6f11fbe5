//! Lexer (tokenizer) for the ES3 JavaScript surface.
//!
//! The lexer converts source text into a stream of tokens. It's called
//! on-demand by the parser, not upfront, which enables context-sensitive
//! tokenization (regex vs division).
//!
//! Conditional-compilation comments (`/*@ ... @*/`, `//@ ...`) are not
//! skipped as trivia: the lexer re-enters code scanning inside them, so the
//! parser sees `@`-directive tokens inline in the stream.

use crate::span::Span;
use crate::token::{cc_keyword_from_str, keyword_from_str, Token, TokenKind};

/// Which kind of conditional-compilation comment the scanner is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CcComment {
    None,
    /// `/*@ ... @*/` — ends at `@*/`.
    Block,
    /// `//@ ...` — ends at the line terminator.
    Line,
}

/// The lexer state.
#[derive(Clone)]
pub struct Lexer<'a> {
    /// Source code as bytes (for fast indexing).
    source: &'a [u8],
    /// Current byte position.
    pos: usize,
    /// Start position of the current token.
    token_start: usize,
    /// Whether the previous token allows a regex to follow.
    /// This disambiguates `/regex/` vs `a / b`.
    allow_regex: bool,
    /// Conditional-compilation comment state.
    cc_comment: CcComment,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            token_start: 0,
            allow_regex: true, // At start of file, regex is allowed
            cc_comment: CcComment::None,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        let mut newline = false;
        loop {
            self.skip_whitespace_and_comments(&mut newline);
            self.token_start = self.pos;

            if self.is_eof() {
                return self.make_token(TokenKind::Eof, newline);
            }

            let ch = self.current();

            // Conditional-compilation comment boundaries are consumed here,
            // between tokens, so directive tokens inside flow through
            // uninterrupted.
            if ch == b'@'
                && self.cc_comment == CcComment::Block
                && self.peek_char() == b'*'
                && self.peek_char_n(2) == b'/'
            {
                self.advance_n(3);
                self.cc_comment = CcComment::None;
                continue;
            }
            if ch == b'/' && self.peek_char() == b'*' && self.peek_char_n(2) == b'@' {
                // Leave the `@` in place: it starts the first directive token
                self.advance_n(2);
                self.cc_comment = CcComment::Block;
                continue;
            }
            if ch == b'/' && self.peek_char() == b'/' && self.peek_char_n(2) == b'@' {
                self.advance_n(2);
                self.cc_comment = CcComment::Line;
                continue;
            }

            let kind = match ch {
                // Identifiers and keywords
                b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => self.scan_identifier(),

                // Numbers
                b'0'..=b'9' => self.scan_number(),

                // Strings
                b'"' | b'\'' => self.scan_string(ch),

                // Conditional-compilation directives and variables
                b'@' => self.scan_at(),

                // Punctuation and operators
                b'(' => { self.advance(); TokenKind::LParen }
                b')' => { self.advance(); TokenKind::RParen }
                b'{' => { self.advance(); TokenKind::LBrace }
                b'}' => { self.advance(); TokenKind::RBrace }
                b'[' => { self.advance(); TokenKind::LBracket }
                b']' => { self.advance(); TokenKind::RBracket }
                b';' => { self.advance(); TokenKind::Semicolon }
                b',' => { self.advance(); TokenKind::Comma }
                b':' => { self.advance(); TokenKind::Colon }
                b'~' => { self.advance(); TokenKind::Tilde }
                b'?' => { self.advance(); TokenKind::Question }

                b'.' => self.scan_dot(),
                b'+' => self.scan_plus(),
                b'-' => self.scan_minus(),
                b'*' => self.scan_star(),
                b'/' => self.scan_slash(),
                b'%' => self.scan_percent(),
                b'=' => self.scan_equals(),
                b'!' => self.scan_bang(),
                b'<' => self.scan_less_than(),
                b'>' => self.scan_greater_than(),
                b'&' => self.scan_ampersand(),
                b'|' => self.scan_pipe(),
                b'^' => self.scan_caret(),

                // Invalid character
                _ => {
                    self.advance();
                    TokenKind::Invalid
                }
            };

            // A `/` is division only after a token that can end an expression
            self.allow_regex = !kind.can_end_expr();

            return self.make_token(kind, newline);
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Token {
        let saved_pos = self.pos;
        let saved_start = self.token_start;
        let saved_regex = self.allow_regex;
        let saved_cc = self.cc_comment;

        let token = self.next_token();

        self.pos = saved_pos;
        self.token_start = saved_start;
        self.allow_regex = saved_regex;
        self.cc_comment = saved_cc;

        token
    }

    // === Helper methods ===

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current(&self) -> u8 {
        self.source.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_char(&self) -> u8 {
        self.source.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn peek_char_n(&self, n: usize) -> u8 {
        self.source.get(self.pos + n).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn make_token(&self, kind: TokenKind, newline_before: bool) -> Token {
        Token::new(
            kind,
            Span::new(self.token_start as u32, self.pos as u32),
            newline_before,
        )
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        // SAFETY: We only slice at ASCII boundaries of valid UTF-8
        unsafe { std::str::from_utf8_unchecked(&self.source[start..end]) }
    }

    fn token_slice(&self) -> &'a str {
        self.slice(self.token_start, self.pos)
    }

    // === Whitespace and comments ===

    fn skip_whitespace_and_comments(&mut self, newline: &mut bool) {
        loop {
            match self.current() {
                b' ' | b'\t' => {
                    self.advance();
                }
                b'\r' | b'\n' => {
                    *newline = true;
                    // A line terminator closes a `//@` comment
                    if self.cc_comment == CcComment::Line {
                        self.cc_comment = CcComment::None;
                    }
                    self.advance();
                }
                // Comments; the `@` forms are handled as token material
                b'/' if self.peek_char() == b'/' && self.peek_char_n(2) != b'@' => {
                    self.skip_line_comment();
                }
                b'/' if self.peek_char() == b'*' && self.peek_char_n(2) != b'@' => {
                    self.skip_block_comment(newline);
                }
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.advance_n(2); // Skip //
        while !self.is_eof() && self.current() != b'\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, newline: &mut bool) {
        self.advance_n(2); // Skip /*
        while !self.is_eof() {
            if self.current() == b'*' && self.peek_char() == b'/' {
                self.advance_n(2);
                return;
            }
            // A comment hiding a line terminator still triggers ASI
            if self.current() == b'\n' {
                *newline = true;
            }
            self.advance();
        }
        // Unterminated block comment - will be reported as error during parsing
    }

    // === Token scanning ===

    fn scan_identifier(&mut self) -> TokenKind {
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' => {
                    self.advance();
                }
                // TODO: Handle Unicode identifiers
                _ => break,
            }
        }

        let ident = self.token_slice();

        // Check if it's a keyword
        keyword_from_str(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }

    /// Scan an `@`-prefixed conditional-compilation token: `@cc_on`, `@if`,
    /// `@set`, or a variable like `@_jscript_version`.
    fn scan_at(&mut self) -> TokenKind {
        self.advance(); // Skip @
        let name_start = self.pos;
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' => {
                    self.advance();
                }
                _ => break,
            }
        }
        if self.pos == name_start {
            return TokenKind::Invalid;
        }
        let name = self.slice(name_start, self.pos);
        cc_keyword_from_str(name).unwrap_or_else(|| TokenKind::CcName(name.to_string()))
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        if self.current() == b'0' && matches!(self.peek_char(), b'x' | b'X') {
            return self.scan_hex_number();
        }

        // Decimal integer part
        while self.current().is_ascii_digit() {
            self.advance();
        }

        let int_end = self.pos;
        let mut is_integer = true;

        // Fraction part; a bare trailing `.` as in `5.` is legal
        if self.current() == b'.' {
            is_integer = false;
            self.advance();
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        // Exponent part
        if self.current() == b'e' || self.current() == b'E' {
            is_integer = false;
            self.advance();
            if self.current() == b'+' || self.current() == b'-' {
                self.advance();
            }
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        // Legacy octal: a multi-digit integer with a leading zero and only
        // octal digits. Digits 8 or 9 force decimal, as engines do.
        if is_integer && self.source[start] == b'0' && int_end - start > 1 {
            let digits = &self.source[start..int_end];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let mut value = 0.0f64;
                for d in digits {
                    value = value * 8.0 + f64::from(d - b'0');
                }
                return TokenKind::Number(value);
            }
        }

        let num_str = self.slice(start, self.pos);
        // Overflow parses to infinity; that is the desired degradation
        TokenKind::Number(num_str.parse().unwrap_or(0.0))
    }

    fn scan_hex_number(&mut self) -> TokenKind {
        self.advance_n(2); // Skip 0x
        let digits_start = self.pos;

        // Accumulate in floating point: absurdly long literals degrade to
        // infinity instead of erroring out
        let mut value = 0.0f64;
        while self.current().is_ascii_hexdigit() {
            let digit = (self.current() as char).to_digit(16).unwrap_or(0);
            value = value * 16.0 + f64::from(digit);
            self.advance();
        }

        if self.pos == digits_start {
            // `0x` with no digits degrades to zero
            return TokenKind::Number(0.0);
        }

        TokenKind::Number(value)
    }

    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.advance(); // Skip opening quote

        let mut value = String::new();
        let mut seg_start = self.pos;
        let mut terminated = false;

        while !self.is_eof() {
            match self.current() {
                b'\\' => {
                    value.push_str(self.slice(seg_start, self.pos));
                    self.advance();
                    if !self.is_eof() {
                        self.scan_escape_sequence(&mut value);
                    }
                    seg_start = self.pos;
                }
                b'\n' | b'\r' => break,
                c if c == quote => {
                    terminated = true;
                    break;
                }
                _ => self.advance(),
            }
        }

        if !terminated {
            return TokenKind::Invalid;
        }
        value.push_str(self.slice(seg_start, self.pos));
        self.advance(); // Skip closing quote

        TokenKind::String(value)
    }

    fn scan_escape_sequence(&mut self, out: &mut String) {
        let ch = self.current();
        self.advance();

        match ch {
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000C}'),
            b'v' => out.push('\u{000B}'),
            // Legacy octal escape, up to three digits; `\0` is the zero case
            b'0'..=b'7' => {
                let mut value = u32::from(ch - b'0');
                for _ in 0..2 {
                    match self.current() {
                        d @ b'0'..=b'7' => {
                            value = value * 8 + u32::from(d - b'0');
                            self.advance();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
            }
            b'x' => out.push(self.scan_hex_escape(2)),
            b'u' => out.push(self.scan_hex_escape(4)),
            // Escaped line terminator is a line continuation
            b'\n' => {}
            b'\r' => {
                if self.current() == b'\n' {
                    self.advance();
                }
            }
            _ => out.push(ch as char),
        }
    }

    fn scan_hex_escape(&mut self, len: usize) -> char {
        let mut value = 0u32;
        for _ in 0..len {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    fn scan_regex(&mut self) -> TokenKind {
        self.advance(); // Skip opening /
        let pattern_start = self.pos;

        // Scan pattern
        let mut in_class = false;
        while !self.is_eof() {
            match self.current() {
                b'/' if !in_class => break,
                b'[' => {
                    in_class = true;
                    self.advance();
                }
                b']' => {
                    in_class = false;
                    self.advance();
                }
                b'\\' => {
                    self.advance();
                    if !self.is_eof() {
                        self.advance();
                    }
                }
                b'\n' | b'\r' => break, // Invalid - newline in regex
                _ => self.advance(),
            }
        }

        let pattern = self.slice(pattern_start, self.pos).to_string();

        if self.current() != b'/' {
            return TokenKind::Invalid;
        }
        self.advance(); // Skip closing /

        // Scan flags permissively: anything identifier-shaped rides along
        let flags_start = self.pos;
        while matches!(self.current(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$') {
            self.advance();
        }
        let flags = self.slice(flags_start, self.pos).to_string();

        TokenKind::Regex { pattern, flags }
    }

    // === Multi-character operators ===

    fn scan_dot(&mut self) -> TokenKind {
        self.advance();
        if self.current().is_ascii_digit() {
            // Number starting with .
            self.pos -= 1; // Back up to rescan
            self.scan_number()
        } else {
            TokenKind::Dot
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'+' => { self.advance(); TokenKind::PlusPlus }
            b'=' => { self.advance(); TokenKind::PlusEq }
            _ => TokenKind::Plus,
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'-' => { self.advance(); TokenKind::MinusMinus }
            b'=' => { self.advance(); TokenKind::MinusEq }
            _ => TokenKind::Minus,
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::StarEq
        } else {
            TokenKind::Star
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => { self.advance(); TokenKind::SlashEq }
            _ if self.allow_regex => {
                self.pos -= 1; // Back up
                self.scan_regex()
            }
            _ => TokenKind::Slash,
        }
    }

    fn scan_percent(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::PercentEq
        } else {
            TokenKind::Percent
        }
    }

    fn scan_equals(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            _ => TokenKind::Eq,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::BangEqEq
                } else {
                    TokenKind::BangEq
                }
            }
            _ => TokenKind::Bang,
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'<' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::LtLtEq
                } else {
                    TokenKind::LtLt
                }
            }
            b'=' => { self.advance(); TokenKind::LtEq }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'>' => {
                self.advance();
                match self.current() {
                    b'>' => {
                        self.advance();
                        if self.current() == b'=' {
                            self.advance();
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    }
                    b'=' => { self.advance(); TokenKind::GtGtEq }
                    _ => TokenKind::GtGt,
                }
            }
            b'=' => { self.advance(); TokenKind::GtEq }
            _ => TokenKind::Gt,
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'&' => { self.advance(); TokenKind::AmpAmp }
            b'=' => { self.advance(); TokenKind::AmpEq }
            _ => TokenKind::Amp,
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'|' => { self.advance(); TokenKind::PipePipe }
            b'=' => { self.advance(); TokenKind::PipeEq }
            _ => TokenKind::Pipe,
        }
    }

    fn scan_caret(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::CaretEq
        } else {
            TokenKind::Caret
        }
    }
}
