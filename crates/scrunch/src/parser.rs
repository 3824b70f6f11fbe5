//! Recursive-descent parser for the ES3 surface.
//!
//! Builds the index arena bottom-up: children are added before their
//! parent, so parent links are fixed at node creation. Conditional-
//! compilation directives arrive from the lexer as ordinary tokens and
//! become statement-level `Cc*` nodes here.

use crate::ast::{AssignOp, Ast, BinaryOp, NodeId, NodeKind, PostPreOp, UnaryOp};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parse error.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// The parser.
pub struct Parser<'a> {
    /// The lexer.
    lexer: Lexer<'a>,
    /// Current token.
    current: Token,
    /// The arena being built.
    ast: Ast,
    /// End offset of the previously consumed token, for span closing.
    prev_end: u32,
    /// When false, `in` is not parsed as a binary operator (for-in init).
    allow_in: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            ast: Ast::new(),
            prev_end: 0,
            allow_in: true,
        }
    }

    /// Parse the entire source into an AST.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        let span = Span::new(0, self.prev_end);
        self.ast.set_program(stmts, span);
        Ok(self.ast)
    }

    // =========================================================================
    // Token Handling
    // =========================================================================

    /// Get the current token kind.
    fn peek(&self) -> &TokenKind {
        &self.current.kind
    }

    /// Advance to the next token and return the previous.
    fn advance(&mut self) -> Token {
        self.prev_end = self.current.span.end;
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    /// Check if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    /// Check if at end of file.
    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    /// Consume a token if it matches, otherwise return an error.
    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("Expected {:?}, got {:?}", kind, self.peek()),
                self.current.span,
            ))
        }
    }

    /// Consume a token if it matches, returning true if consumed.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume an identifier token and return its name.
    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseError::new(
                format!("Expected {}, got {:?}", what, self.peek()),
                self.current.span,
            ))
        }
    }

    /// True at a conditional-compilation directive token. A statement
    /// ending at one is genuinely terminated (the rest is comment material
    /// for engines without conditional compilation).
    fn at_cc_boundary(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::CcOn
                | TokenKind::CcIf
                | TokenKind::CcElif
                | TokenKind::CcElse
                | TokenKind::CcEnd
                | TokenKind::CcSet
        )
    }

    /// Consume a semicolon (with ASI support).
    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        // Automatic Semicolon Insertion (ASI) rules:
        // 1. Explicit semicolon
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        // 2. Before closing brace
        if self.check(&TokenKind::RBrace) {
            return Ok(());
        }
        // 3. At end of file
        if self.is_eof() {
            return Ok(());
        }
        // 4. After newline - the current token was preceded by a line terminator
        if self.current.newline_before {
            return Ok(());
        }
        // 5. At a conditional-compilation boundary
        if self.at_cc_boundary() {
            return Ok(());
        }
        Err(ParseError::new("Expected semicolon", self.current.span))
    }

    /// Close a span opened at `start`.
    fn finish_span(&self, start: u32) -> Span {
        Span::new(start, self.prev_end)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_stmt(&mut self) -> Result<NodeId, ParseError> {
        match self.peek() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Var => self.parse_var_stmt(),
            TokenKind::Semicolon => {
                let span = self.current.span;
                self.advance();
                Ok(self.ast.add(NodeKind::Empty, span))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            TokenKind::Continue => self.parse_continue_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::With => self.parse_with_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::Function => self.parse_function(false),
            TokenKind::Debugger => self.parse_debugger_stmt(),

            TokenKind::CcOn => {
                let span = self.current.span;
                self.advance();
                Ok(self.ast.add(NodeKind::CcOn, span))
            }
            TokenKind::CcIf => self.parse_cc_if(false),
            TokenKind::CcElif => self.parse_cc_if(true),
            TokenKind::CcElse => {
                let span = self.current.span;
                self.advance();
                Ok(self.ast.add(NodeKind::CcElse, span))
            }
            TokenKind::CcEnd => {
                let span = self.current.span;
                self.advance();
                Ok(self.ast.add(NodeKind::CcEnd, span))
            }
            TokenKind::CcSet => self.parse_cc_set(),

            // An identifier followed by `:` labels the next statement
            TokenKind::Identifier(_) => {
                if matches!(self.lexer.peek().kind, TokenKind::Colon) {
                    self.parse_labeled_stmt()
                } else {
                    self.parse_expr_stmt()
                }
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// An expression statement is the expression node itself; there is no
    /// wrapper node.
    fn parse_expr_stmt(&mut self) -> Result<NodeId, ParseError> {
        let expr = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.ast.add(NodeKind::Block { stmts }, self.finish_span(start)))
    }

    fn parse_var_stmt(&mut self) -> Result<NodeId, ParseError> {
        let node = self.parse_var_decls()?;
        self.expect_semicolon()?;
        Ok(node)
    }

    /// Parse `var` and its declarators, without the terminating semicolon
    /// (for-statement heads reuse this).
    fn parse_var_decls(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Var)?;
        let mut decls = Vec::new();
        loop {
            decls.push(self.parse_var_declarator()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(self.ast.add(NodeKind::Var { decls }, self.finish_span(start)))
    }

    fn parse_var_declarator(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let name = self.expect_identifier("variable name")?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_assign_expr()?)
        } else {
            None
        };
        Ok(self.ast.add(
            NodeKind::VarDecl { name, init, binding: None },
            self.finish_span(start),
        ))
    }

    fn parse_if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let cons = self.parse_stmt()?;
        let alt = if self.eat(&TokenKind::Else) {
            Some(self.parse_stmt()?)
        } else {
            None
        };
        Ok(self.ast.add(NodeKind::If { test, cons, alt }, self.finish_span(start)))
    }

    fn parse_for_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            // `in` must not terminate the head prematurely
            let saved = self.allow_in;
            self.allow_in = false;
            let node = if self.check(&TokenKind::Var) {
                self.parse_var_decls()?
            } else {
                self.parse_expr()?
            };
            self.allow_in = saved;

            if self.eat(&TokenKind::In) {
                if let NodeKind::Var { decls } = self.ast.kind(node) {
                    if decls.len() > 1 {
                        return Err(ParseError::new(
                            "Only one declaration allowed in a for-in head",
                            self.current.span,
                        ));
                    }
                }
                let object = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_stmt()?;
                return Ok(self.ast.add(
                    NodeKind::ForIn { target: node, object, body },
                    self.finish_span(start),
                ));
            }
            Some(node)
        };

        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_stmt()?;

        Ok(self.ast.add(
            NodeKind::For { init, test, update, body },
            self.finish_span(start),
        ))
    }

    fn parse_while_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_stmt()?;
        Ok(self.ast.add(NodeKind::While { test, body }, self.finish_span(start)))
    }

    fn parse_do_while_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Do)?;
        let body = self.parse_stmt()?;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        self.expect_semicolon()?;
        Ok(self.ast.add(NodeKind::DoWhile { body, test }, self.finish_span(start)))
    }

    fn parse_switch_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Switch)?;
        self.expect(&TokenKind::LParen)?;
        let disc = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let case_start = self.current.span.start;
            let test = if self.eat(&TokenKind::Case) {
                let test = self.parse_expr()?;
                self.expect(&TokenKind::Colon)?;
                Some(test)
            } else if self.eat(&TokenKind::Default) {
                self.expect(&TokenKind::Colon)?;
                None
            } else {
                return Err(ParseError::new(
                    "Expected case or default in switch body",
                    self.current.span,
                ));
            };
            let mut stmts = Vec::new();
            while !matches!(
                self.peek(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                stmts.push(self.parse_stmt()?);
            }
            cases.push(self.ast.add(
                NodeKind::Case { test, stmts },
                self.finish_span(case_start),
            ));
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(self.ast.add(NodeKind::Switch { disc, cases }, self.finish_span(start)))
    }

    fn parse_break_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Break)?;
        let label = self.eat_label_reference();
        self.expect_semicolon()?;
        Ok(self.ast.add(
            NodeKind::Break { label, target_position: 0, nest_level: 0 },
            self.finish_span(start),
        ))
    }

    fn parse_continue_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Continue)?;
        let label = self.eat_label_reference();
        self.expect_semicolon()?;
        Ok(self.ast.add(
            NodeKind::Continue { label, target_position: 0, nest_level: 0 },
            self.finish_span(start),
        ))
    }

    /// A label after break/continue must sit on the same line.
    fn eat_label_reference(&mut self) -> Option<String> {
        if self.current.newline_before {
            return None;
        }
        if let TokenKind::Identifier(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    fn parse_return_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Return)?;
        let arg = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_eof()
            || self.current.newline_before
            || self.at_cc_boundary()
        {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semicolon()?;
        Ok(self.ast.add(NodeKind::Return { arg }, self.finish_span(start)))
    }

    fn parse_with_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::With)?;
        self.expect(&TokenKind::LParen)?;
        let object = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_stmt()?;
        Ok(self.ast.add(NodeKind::With { object, body }, self.finish_span(start)))
    }

    fn parse_throw_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Throw)?;
        // Restricted production: no line terminator after `throw`
        if self.current.newline_before {
            return Err(ParseError::new(
                "Illegal newline after throw",
                self.current.span,
            ));
        }
        let arg = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(self.ast.add(NodeKind::Throw { arg }, self.finish_span(start)))
    }

    fn parse_try_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Try)?;
        let block = self.parse_block()?;

        let (catch_param, catch_body) = if self.eat(&TokenKind::Catch) {
            self.expect(&TokenKind::LParen)?;
            let param_start = self.current.span.start;
            let name = self.expect_identifier("catch parameter")?;
            let param = self.ast.add(
                NodeKind::Param { name, binding: None },
                self.finish_span(param_start),
            );
            self.expect(&TokenKind::RParen)?;
            let body = self.parse_block()?;
            (Some(param), Some(body))
        } else {
            (None, None)
        };

        let finally_body = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch_body.is_none() && finally_body.is_none() {
            return Err(ParseError::new(
                "Missing catch or finally after try",
                self.current.span,
            ));
        }

        Ok(self.ast.add(
            NodeKind::Try { block, catch_param, catch_body, finally_body },
            self.finish_span(start),
        ))
    }

    fn parse_labeled_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let label = self.expect_identifier("label")?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_stmt()?;
        Ok(self.ast.add(
            NodeKind::Labeled { label, body, position: 0, referenced: false },
            self.finish_span(start),
        ))
    }

    fn parse_debugger_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Debugger)?;
        self.expect_semicolon()?;
        Ok(self.ast.add(NodeKind::Debugger, self.finish_span(start)))
    }

    /// `@if (cond)` or `@elif (cond)`.
    fn parse_cc_if(&mut self, elif: bool) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.advance(); // @if / @elif
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let kind = if elif {
            NodeKind::CcElseIf { condition }
        } else {
            NodeKind::CcIf { condition }
        };
        Ok(self.ast.add(kind, self.finish_span(start)))
    }

    /// `@set @name = value`.
    fn parse_cc_set(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::CcSet)?;
        let name = if let TokenKind::CcName(name) = self.peek() {
            let name = name.clone();
            self.advance();
            name
        } else {
            return Err(ParseError::new(
                format!("Expected @variable after @set, got {:?}", self.peek()),
                self.current.span,
            ));
        };
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_assign_expr()?;
        Ok(self.ast.add(NodeKind::CcSet { name, value }, self.finish_span(start)))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Full expression, comma operator included.
    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let mut expr = self.parse_assign_expr()?;
        while self.eat(&TokenKind::Comma) {
            let right = self.parse_assign_expr()?;
            expr = self.ast.add(
                NodeKind::Binary { op: BinaryOp::Comma, left: expr, right },
                self.finish_span(start),
            );
        }
        Ok(expr)
    }

    fn parse_assign_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let expr = self.parse_conditional_expr()?;
        if let Some(op) = assign_op_for(self.peek()) {
            self.advance();
            let value = self.parse_assign_expr()?;
            return Ok(self.ast.add(
                NodeKind::Assign { op, target: expr, value },
                self.finish_span(start),
            ));
        }
        Ok(expr)
    }

    fn parse_conditional_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let test = self.parse_binary_expr(1)?;
        if self.eat(&TokenKind::Question) {
            // The consequent always allows `in`, even in a for-head
            let saved = self.allow_in;
            self.allow_in = true;
            let cons = self.parse_assign_expr()?;
            self.allow_in = saved;
            self.expect(&TokenKind::Colon)?;
            let alt = self.parse_assign_expr()?;
            return Ok(self.ast.add(
                NodeKind::Conditional { test, cons, alt },
                self.finish_span(start),
            ));
        }
        Ok(test)
    }

    /// Precedence climbing over the binary operators. All ES3 binary
    /// operators are left-associative.
    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let mut left = self.parse_unary_expr()?;
        loop {
            let Some(prec) = self.peek().binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            if matches!(self.peek(), TokenKind::In) && !self.allow_in {
                break;
            }
            let Some(op) = binary_op_for(self.peek()) else {
                break;
            };
            self.advance();
            let right = self.parse_binary_expr(prec + 1)?;
            left = self.ast.add(
                NodeKind::Binary { op, left, right },
                self.finish_span(start),
            );
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let op = match self.peek() {
            TokenKind::Delete => Some(UnaryOp::Delete),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary_expr()?;
            return Ok(self.ast.add(NodeKind::Unary { op, operand }, self.finish_span(start)));
        }

        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if matches!(self.peek(), TokenKind::PlusPlus) {
                PostPreOp::PreIncrement
            } else {
                PostPreOp::PreDecrement
            };
            self.advance();
            let operand = self.parse_unary_expr()?;
            return Ok(self.ast.add(NodeKind::PostPre { op, operand }, self.finish_span(start)));
        }

        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let expr = self.parse_left_hand_side_expr()?;
        // Restricted production: no line terminator before a postfix operator
        if !self.current.newline_before
            && matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus)
        {
            let op = if matches!(self.peek(), TokenKind::PlusPlus) {
                PostPreOp::PostIncrement
            } else {
                PostPreOp::PostDecrement
            };
            self.advance();
            return Ok(self.ast.add(
                NodeKind::PostPre { op, operand: expr },
                self.finish_span(start),
            ));
        }
        Ok(expr)
    }

    fn parse_left_hand_side_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier("property name")?;
                    expr = self.ast.add(
                        NodeKind::Member { object: expr, name },
                        self.finish_span(start),
                    );
                }
                TokenKind::LBracket => {
                    let args = self.parse_bracket_args()?;
                    expr = self.ast.add(
                        NodeKind::Call {
                            callee: expr,
                            args,
                            in_brackets: true,
                            is_constructor: false,
                        },
                        self.finish_span(start),
                    );
                }
                TokenKind::LParen => {
                    let args = self.parse_args()?;
                    expr = self.ast.add(
                        NodeKind::Call {
                            callee: expr,
                            args,
                            in_brackets: false,
                            is_constructor: false,
                        },
                        self.finish_span(start),
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `new` binds tighter than call parentheses: member and index chains
    /// on the callee are consumed before the constructor arguments.
    fn parse_new_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::New)?;

        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier("property name")?;
                    callee = self.ast.add(
                        NodeKind::Member { object: callee, name },
                        self.finish_span(start),
                    );
                }
                TokenKind::LBracket => {
                    let args = self.parse_bracket_args()?;
                    callee = self.ast.add(
                        NodeKind::Call {
                            callee,
                            args,
                            in_brackets: true,
                            is_constructor: false,
                        },
                        self.finish_span(start),
                    );
                }
                _ => break,
            }
        }

        let args = if self.check(&TokenKind::LParen) {
            self.parse_args()?
        } else {
            // `new Foo` without arguments
            self.ast.add(NodeKind::List { items: Vec::new() }, Span::empty(self.prev_end))
        };

        Ok(self.ast.add(
            NodeKind::Call {
                callee,
                args,
                in_brackets: false,
                is_constructor: true,
            },
            self.finish_span(start),
        ))
    }

    /// Parenthesized argument list; always yields a `List` node.
    fn parse_args(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LParen)?;
        let saved = self.allow_in;
        self.allow_in = true;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RParen) {
            items.push(self.parse_assign_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.allow_in = saved;
        self.expect(&TokenKind::RParen)?;
        Ok(self.ast.add(NodeKind::List { items }, self.finish_span(start)))
    }

    /// Bracket index; the single index expression rides in a `List` so
    /// indexing shares the call node's shape.
    fn parse_bracket_args(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBracket)?;
        let saved = self.allow_in;
        self.allow_in = true;
        let index = self.parse_expr()?;
        self.allow_in = saved;
        self.expect(&TokenKind::RBracket)?;
        Ok(self.ast.add(NodeKind::List { items: vec![index] }, self.finish_span(start)))
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(self.ast.add(
                    NodeKind::Ident { name, binding: None },
                    self.finish_span(start),
                ))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(self.ast.add(NodeKind::Number(n), self.finish_span(start)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(self.ast.add(NodeKind::Str(s), self.finish_span(start)))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Ok(self.ast.add(NodeKind::Regex { pattern, flags }, self.finish_span(start)))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.ast.add(NodeKind::Bool(true), self.finish_span(start)))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.ast.add(NodeKind::Bool(false), self.finish_span(start)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self.ast.add(NodeKind::Null, self.finish_span(start)))
            }
            TokenKind::This => {
                self.advance();
                Ok(self.ast.add(NodeKind::This, self.finish_span(start)))
            }
            TokenKind::CcName(name) => {
                self.advance();
                Ok(self.ast.add(NodeKind::CcName { name }, self.finish_span(start)))
            }
            TokenKind::Function => self.parse_function(true),
            TokenKind::LParen => {
                self.advance();
                let saved = self.allow_in;
                self.allow_in = true;
                let expr = self.parse_expr()?;
                self.allow_in = saved;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            _ => Err(ParseError::new(
                format!("Unexpected token {:?}", self.peek()),
                self.current.span,
            )),
        }
    }

    fn parse_array_literal(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBracket)?;
        let mut items = Vec::new();
        loop {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            if self.check(&TokenKind::Comma) {
                // Elision hole
                let span = self.current.span;
                self.advance();
                items.push(self.ast.add(NodeKind::Empty, span));
                continue;
            }
            items.push(self.parse_assign_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(self.ast.add(NodeKind::ArrayLit { items }, self.finish_span(start)))
    }

    fn parse_object_literal(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBrace)?;
        let mut props = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let prop_start = self.current.span.start;
            let (key, quoted_key) = match self.peek().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    let key = self.ast.add(NodeKind::Str(name), self.finish_span(prop_start));
                    (key, false)
                }
                TokenKind::String(s) => {
                    self.advance();
                    let key = self.ast.add(NodeKind::Str(s), self.finish_span(prop_start));
                    (key, true)
                }
                TokenKind::Number(n) => {
                    self.advance();
                    let key = self.ast.add(NodeKind::Number(n), self.finish_span(prop_start));
                    (key, false)
                }
                other => {
                    return Err(ParseError::new(
                        format!("Expected property name, got {:?}", other),
                        self.current.span,
                    ));
                }
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_assign_expr()?;
            props.push(self.ast.add(
                NodeKind::Property { key, value, quoted_key },
                self.finish_span(prop_start),
            ));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.ast.add(NodeKind::ObjectLit { props }, self.finish_span(start)))
    }

    /// Function declaration or expression.
    fn parse_function(&mut self, is_expression: bool) -> Result<NodeId, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Function)?;

        let name = if let TokenKind::Identifier(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };
        if name.is_none() && !is_expression {
            return Err(ParseError::new(
                "Function declaration requires a name",
                self.current.span,
            ));
        }

        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param_start = self.current.span.start;
            let pname = self.expect_identifier("parameter name")?;
            params.push(self.ast.add(
                NodeKind::Param { name: pname, binding: None },
                self.finish_span(param_start),
            ));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        let body = self.parse_block()?;

        Ok(self.ast.add(
            NodeKind::Function { name, params, body, is_expression, binding: None },
            self.finish_span(start),
        ))
    }
}

fn binary_op_for(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::EqEqEq => BinaryOp::StrictEq,
        TokenKind::BangEq => BinaryOp::NotEq,
        TokenKind::BangEqEq => BinaryOp::StrictNotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::In => BinaryOp::In,
        TokenKind::Instanceof => BinaryOp::Instanceof,
        TokenKind::LtLt => BinaryOp::Shl,
        TokenKind::GtGt => BinaryOp::Shr,
        TokenKind::GtGtGt => BinaryOp::UShr,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    })
}

fn assign_op_for(kind: &TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::AddAssign,
        TokenKind::MinusEq => AssignOp::SubAssign,
        TokenKind::StarEq => AssignOp::MulAssign,
        TokenKind::SlashEq => AssignOp::DivAssign,
        TokenKind::PercentEq => AssignOp::ModAssign,
        TokenKind::LtLtEq => AssignOp::ShlAssign,
        TokenKind::GtGtEq => AssignOp::ShrAssign,
        TokenKind::GtGtGtEq => AssignOp::UShrAssign,
        TokenKind::AmpEq => AssignOp::BitAndAssign,
        TokenKind::PipeEq => AssignOp::BitOrAssign,
        TokenKind::CaretEq => AssignOp::BitXorAssign,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Ast {
        Parser::new(source).parse().unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn program_stmts(ast: &Ast) -> Vec<NodeId> {
        match ast.kind(ast.root) {
            NodeKind::Block { stmts } => stmts.clone(),
            other => panic!("root is not a block: {other:?}"),
        }
    }

    #[test]
    fn test_var_statement() {
        let ast = parse("var a = 1, b;");
        let stmts = program_stmts(&ast);
        assert_eq!(stmts.len(), 1);
        match ast.kind(stmts[0]) {
            NodeKind::Var { decls } => {
                assert_eq!(decls.len(), 2);
                assert!(matches!(
                    ast.kind(decls[0]),
                    NodeKind::VarDecl { name, init: Some(_), .. } if name == "a"
                ));
                assert!(matches!(
                    ast.kind(decls[1]),
                    NodeKind::VarDecl { name, init: None, .. } if name == "b"
                ));
            }
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn test_function_declaration() {
        let ast = parse("function add(a, b) { return a + b; }");
        let stmts = program_stmts(&ast);
        match ast.kind(stmts[0]) {
            NodeKind::Function { name: Some(name), params, is_expression: false, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_for_in() {
        let ast = parse("for (var k in obj) f(k);");
        let stmts = program_stmts(&ast);
        match ast.kind(stmts[0]) {
            NodeKind::ForIn { target, .. } => {
                assert!(matches!(ast.kind(*target), NodeKind::Var { .. }));
            }
            other => panic!("expected for-in, got {other:?}"),
        }
    }

    #[test]
    fn test_labeled_statement() {
        let ast = parse("outer: while (x) { break outer; }");
        let stmts = program_stmts(&ast);
        match ast.kind(stmts[0]) {
            NodeKind::Labeled { label, .. } => assert_eq!(label, "outer"),
            other => panic!("expected labeled statement, got {other:?}"),
        }
    }

    #[test]
    fn test_new_expression() {
        let ast = parse("x = new Foo.Bar(1);");
        let stmts = program_stmts(&ast);
        let NodeKind::Assign { value, .. } = ast.kind(stmts[0]) else {
            panic!("expected assignment");
        };
        match ast.kind(*value) {
            NodeKind::Call { callee, args, is_constructor: true, in_brackets: false } => {
                assert!(matches!(ast.kind(*callee), NodeKind::Member { name, .. } if name == "Bar"));
                assert!(matches!(ast.kind(*args), NodeKind::List { items } if items.len() == 1));
            }
            other => panic!("expected constructor call, got {other:?}"),
        }
    }

    #[test]
    fn test_index_is_bracketed_call() {
        let ast = parse("a[i] = 1;");
        let stmts = program_stmts(&ast);
        let NodeKind::Assign { target, .. } = ast.kind(stmts[0]) else {
            panic!("expected assignment");
        };
        assert!(matches!(
            ast.kind(*target),
            NodeKind::Call { in_brackets: true, is_constructor: false, .. }
        ));
    }

    #[test]
    fn test_array_holes() {
        let ast = parse("x = [1, , 2];");
        let stmts = program_stmts(&ast);
        let NodeKind::Assign { value, .. } = ast.kind(stmts[0]) else {
            panic!("expected assignment");
        };
        let NodeKind::ArrayLit { items } = ast.kind(*value) else {
            panic!("expected array literal");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(ast.kind(items[1]), NodeKind::Empty));
    }

    #[test]
    fn test_asi_between_lines() {
        let ast = parse("a = 1\nb = 2");
        assert_eq!(program_stmts(&ast).len(), 2);
    }

    #[test]
    fn test_asi_return() {
        let ast = parse("function f() { return\n1; }");
        let stmts = program_stmts(&ast);
        let NodeKind::Function { body, .. } = ast.kind(stmts[0]) else {
            panic!("expected function");
        };
        let NodeKind::Block { stmts: body_stmts } = ast.kind(*body) else {
            panic!("expected block body");
        };
        // `return` takes no argument; `1` becomes its own statement
        assert_eq!(body_stmts.len(), 2);
        assert!(matches!(ast.kind(body_stmts[0]), NodeKind::Return { arg: None }));
    }

    #[test]
    fn test_postfix_needs_same_line() {
        let ast = parse("x\n++y");
        let stmts = program_stmts(&ast);
        assert_eq!(stmts.len(), 2);
        assert!(matches!(
            ast.kind(stmts[1]),
            NodeKind::PostPre { op: PostPreOp::PreIncrement, .. }
        ));
    }

    #[test]
    fn test_comma_operator() {
        let ast = parse("a = (b, c);");
        let stmts = program_stmts(&ast);
        let NodeKind::Assign { value, .. } = ast.kind(stmts[0]) else {
            panic!("expected assignment");
        };
        assert!(matches!(
            ast.kind(*value),
            NodeKind::Binary { op: BinaryOp::Comma, .. }
        ));
    }

    #[test]
    fn test_cc_directives() {
        let ast = parse("/*@cc_on @if (@_jscript_version >= 4) f(); @else g(); @end @*/");
        let stmts = program_stmts(&ast);
        assert_eq!(stmts.len(), 6);
        assert!(matches!(ast.kind(stmts[0]), NodeKind::CcOn));
        match ast.kind(stmts[1]) {
            NodeKind::CcIf { condition } => {
                assert!(matches!(ast.kind(*condition), NodeKind::Binary { op: BinaryOp::GtEq, .. }));
            }
            other => panic!("expected @if, got {other:?}"),
        }
        assert!(matches!(ast.kind(stmts[3]), NodeKind::CcElse));
        assert!(matches!(ast.kind(stmts[5]), NodeKind::CcEnd));
    }

    #[test]
    fn test_cc_set() {
        let ast = parse("/*@set @debug = 1 @*/");
        let stmts = program_stmts(&ast);
        match ast.kind(stmts[0]) {
            NodeKind::CcSet { name, .. } => assert_eq!(name, "debug"),
            other => panic!("expected @set, got {other:?}"),
        }
    }

    #[test]
    fn test_with_statement() {
        let ast = parse("with (o) { x = 1; }");
        let stmts = program_stmts(&ast);
        assert!(matches!(ast.kind(stmts[0]), NodeKind::With { .. }));
    }

    #[test]
    fn test_try_requires_catch_or_finally() {
        assert!(Parser::new("try { f(); }").parse().is_err());
        assert!(Parser::new("try { f(); } catch (e) {}").parse().is_ok());
        assert!(Parser::new("try { f(); } finally {}").parse().is_ok());
    }

    #[test]
    fn test_object_literal_keys() {
        let ast = parse("x = { a: 1, \"b c\": 2, 3: 4 };");
        let stmts = program_stmts(&ast);
        let NodeKind::Assign { value, .. } = ast.kind(stmts[0]) else {
            panic!("expected assignment");
        };
        let NodeKind::ObjectLit { props } = ast.kind(*value) else {
            panic!("expected object literal");
        };
        assert_eq!(props.len(), 3);
        assert!(matches!(ast.kind(props[0]), NodeKind::Property { quoted_key: false, .. }));
        assert!(matches!(ast.kind(props[1]), NodeKind::Property { quoted_key: true, .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::new("var = 3;").parse().is_err());
        assert!(Parser::new("function () {}").parse().is_err());
        assert!(Parser::new("throw\nx;").parse().is_err());
        assert!(Parser::new("for (var a, b in o) {}").parse().is_err());
    }
}
