//! Code emission.
//!
//! Serializes the tree back to source text, using crunched names from the
//! scope tree wherever a node carries a binding. Minimal output comes from
//! three mechanisms: a precedence table decides where parentheses are truly
//! needed, a token-adjacency guard inserts the rare space two neighboring
//! tokens cannot do without, and statement separators are elided where a
//! closing brace or end of input already terminates the statement.
//!
//! Emission is pure: the same tree, scope tree, and options always produce
//! identical text.

use serde::{Deserialize, Serialize};

use crate::ast::{AssignOp, Ast, BinaryOp, NodeId, NodeKind, PostPreOp, UnaryOp};
use crate::crunch::{label_text, CrunchOptions};
use crate::scope::{BindingId, ScopeTree};
use crate::token::{is_reserved_word, is_valid_identifier};

/// Whitespace style of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Everything on one line, separators elided where possible.
    #[default]
    SingleLine,
    /// One statement per line, indented. Whitespace only; the token stream
    /// is the same.
    MultiLine,
}

/// Knobs for the emitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub output_mode: OutputMode,
    /// Indent unit for multi-line output.
    pub indent: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self { output_mode: OutputMode::SingleLine, indent: "  ".to_string() }
    }
}

/// How a node is being asked to render itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Ordinary statement or expression position.
    Normal,
    /// Statement list without surrounding braces (the program body).
    NoBraces,
    /// Children joined by commas (argument lists).
    Commas,
}

// Binding strength, low to high. Binary operators occupy 4..=13.
const PREC_COMMA: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_COND: u8 = 3;
const PREC_UNARY: u8 = 14;
const PREC_POSTFIX: u8 = 15;
const PREC_CALL: u8 = 17;
/// Member access, bracket indexing, and `new` with an argument list.
const PREC_MEMBER: u8 = 18;

pub struct Codegen<'a> {
    ast: &'a Ast,
    scopes: &'a ScopeTree,
    crunch: &'a CrunchOptions,
    options: &'a CodegenOptions,
    output: String,
    indent_level: usize,
}

impl<'a> Codegen<'a> {
    pub fn new(
        ast: &'a Ast,
        scopes: &'a ScopeTree,
        crunch: &'a CrunchOptions,
        options: &'a CodegenOptions,
    ) -> Self {
        Self { ast, scopes, crunch, options, output: String::new(), indent_level: 0 }
    }

    /// Serialize the whole program.
    pub fn generate(mut self) -> String {
        self.emit_node(self.ast.root, Format::NoBraces);
        if self.multi() && !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output
    }

    /// Serialize a single subtree.
    pub fn generate_node(mut self, id: NodeId) -> String {
        self.emit_node(id, Format::Normal);
        self.output
    }

    pub fn emit_node(&mut self, id: NodeId, format: Format) {
        let ast = self.ast;
        match format {
            Format::NoBraces => match ast.kind(id) {
                NodeKind::Block { stmts } => self.emit_stmt_list(stmts, true),
                _ => self.emit_stmt(id),
            },
            Format::Commas => match ast.kind(id) {
                NodeKind::List { items } => {
                    for (i, &item) in items.iter().enumerate() {
                        if i > 0 {
                            self.push(",");
                        }
                        self.emit_expr_prec(item, PREC_ASSIGN);
                    }
                }
                _ => self.emit_expr_prec(id, PREC_ASSIGN),
            },
            Format::Normal => self.emit_stmt(id),
        }
    }

    fn multi(&self) -> bool {
        self.options.output_mode == OutputMode::MultiLine
    }

    /// Append text, spacing it off when it would otherwise fuse with the
    /// previous token.
    fn push(&mut self, text: &str) {
        if let (Some(&last), Some(&first)) =
            (self.output.as_bytes().last(), text.as_bytes().first())
        {
            if joins_tokens(last, first) {
                self.output.push(' ');
            }
        }
        self.output.push_str(text);
    }

    fn newline(&mut self) {
        if self.multi() && !self.output.is_empty() {
            self.output.push('\n');
            for _ in 0..self.indent_level {
                self.output.push_str(&self.options.indent);
            }
        }
    }

    /// The name an identifier-carrying node appears under in the output.
    fn output_ident(&self, name: &'a str, binding: Option<BindingId>) -> &'a str {
        let scopes: &'a ScopeTree = self.scopes;
        match binding {
            Some(b) => scopes.output_name(b),
            None => name,
        }
    }

    // === Statements ===

    fn emit_stmt_list(&mut self, stmts: &[NodeId], end_elidable: bool) {
        let ast = self.ast;
        let mut i = 0;
        while i < stmts.len() {
            if is_cc_directive(ast.kind(stmts[i])) {
                let start = i;
                while i < stmts.len() && is_cc_directive(ast.kind(stmts[i])) {
                    i += 1;
                }
                self.newline();
                self.emit_cc_group(&stmts[start..i]);
                continue;
            }
            let id = stmts[i];
            i += 1;
            self.newline();
            self.emit_stmt(id);
            if self.requires_separator(id) {
                let last = i == stmts.len();
                if !(last && end_elidable) {
                    self.push(";");
                }
            }
        }
    }

    /// Whether the statement needs `;` before another statement can follow
    /// on the same line. Statements ending in `}` do not; compounds ask
    /// their final substatement.
    fn requires_separator(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Block { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Try { .. }
            | NodeKind::Empty
            | NodeKind::CcOn
            | NodeKind::CcIf { .. }
            | NodeKind::CcElseIf { .. }
            | NodeKind::CcElse
            | NodeKind::CcEnd
            | NodeKind::CcSet { .. } => false,
            NodeKind::Function { is_expression, .. } => *is_expression,
            NodeKind::If { cons, alt, .. } => self.requires_separator(alt.unwrap_or(*cons)),
            NodeKind::While { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::ForIn { body, .. }
            | NodeKind::With { body, .. }
            | NodeKind::Labeled { body, .. } => self.requires_separator(*body),
            _ => true,
        }
    }

    fn emit_stmt(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Block { stmts } => {
                self.push("{");
                self.indent_level += 1;
                self.emit_stmt_list(stmts, true);
                self.indent_level -= 1;
                self.newline();
                self.push("}");
            }
            NodeKind::Var { decls } => self.emit_var(decls, false),
            NodeKind::VarDecl { .. } => self.emit_var_decl(id, false),
            NodeKind::Empty => self.push(";"),
            NodeKind::If { test, cons, alt } => {
                self.push("if");
                self.push("(");
                self.emit_expr(*test);
                self.push(")");
                match alt {
                    Some(alt) => {
                        // An unbraced trailing if would capture our else
                        let wrap = self.ends_with_dangling_if(*cons);
                        if wrap {
                            self.push("{");
                        }
                        self.emit_stmt(*cons);
                        if wrap {
                            self.push("}");
                        } else if self.requires_separator(*cons) {
                            self.push(";");
                        }
                        self.push("else");
                        self.emit_stmt(*alt);
                    }
                    None => self.emit_stmt(*cons),
                }
            }
            NodeKind::For { init, test, update, body } => {
                self.push("for");
                self.push("(");
                if let Some(init) = init {
                    match ast.kind(*init) {
                        NodeKind::Var { decls } => self.emit_var(decls, true),
                        _ => self.emit_for_head_expr(*init),
                    }
                }
                self.push(";");
                if let Some(test) = test {
                    self.emit_expr(*test);
                }
                self.push(";");
                if let Some(update) = update {
                    self.emit_expr(*update);
                }
                self.push(")");
                self.emit_stmt(*body);
            }
            NodeKind::ForIn { target, object, body } => {
                self.push("for");
                self.push("(");
                match ast.kind(*target) {
                    NodeKind::Var { decls } => self.emit_var(decls, false),
                    _ => self.emit_expr_prec(*target, PREC_COND),
                }
                self.push("in");
                self.emit_expr(*object);
                self.push(")");
                self.emit_stmt(*body);
            }
            NodeKind::While { test, body } => {
                self.push("while");
                self.push("(");
                self.emit_expr(*test);
                self.push(")");
                self.emit_stmt(*body);
            }
            NodeKind::DoWhile { body, test } => {
                self.push("do");
                self.emit_stmt(*body);
                if self.requires_separator(*body) {
                    self.push(";");
                }
                self.push("while");
                self.push("(");
                self.emit_expr(*test);
                self.push(")");
            }
            NodeKind::Switch { disc, cases } => {
                self.push("switch");
                self.push("(");
                self.emit_expr(*disc);
                self.push(")");
                self.push("{");
                self.indent_level += 1;
                for (i, &case) in cases.iter().enumerate() {
                    self.newline();
                    self.emit_case(case, i == cases.len() - 1);
                }
                self.indent_level -= 1;
                self.newline();
                self.push("}");
            }
            NodeKind::Case { .. } => self.emit_case(id, false),
            NodeKind::Break { label, target_position, .. } => {
                self.push("break");
                if let Some(label) = label {
                    if self.crunch.rename_labels {
                        let text = label_text(*target_position);
                        self.push(&text);
                    } else {
                        self.push(label);
                    }
                }
            }
            NodeKind::Continue { label, target_position, .. } => {
                self.push("continue");
                if let Some(label) = label {
                    if self.crunch.rename_labels {
                        let text = label_text(*target_position);
                        self.push(&text);
                    } else {
                        self.push(label);
                    }
                }
            }
            NodeKind::Return { arg } => {
                self.push("return");
                if let Some(arg) = arg {
                    self.emit_expr(*arg);
                }
            }
            NodeKind::With { object, body } => {
                self.push("with");
                self.push("(");
                self.emit_expr(*object);
                self.push(")");
                self.emit_stmt(*body);
            }
            NodeKind::Throw { arg } => {
                self.push("throw");
                self.emit_expr(*arg);
            }
            NodeKind::Try { block, catch_param, catch_body, finally_body } => {
                self.push("try");
                self.emit_stmt(*block);
                if let Some(catch_body) = catch_body {
                    self.push("catch");
                    self.push("(");
                    if let Some(param) = catch_param {
                        if let NodeKind::Param { name, binding } = ast.kind(*param) {
                            let text = self.output_ident(name, *binding);
                            self.push(text);
                        }
                    }
                    self.push(")");
                    self.emit_stmt(*catch_body);
                }
                if let Some(finally_body) = finally_body {
                    self.push("finally");
                    self.emit_stmt(*finally_body);
                }
            }
            NodeKind::Labeled { label, body, position, referenced } => {
                if *referenced || !self.crunch.remove_unreferenced_labels {
                    if self.crunch.rename_labels {
                        let text = label_text(*position);
                        self.push(&text);
                    } else {
                        self.push(label);
                    }
                    self.push(":");
                }
                self.emit_stmt(*body);
            }
            NodeKind::Debugger => self.push("debugger"),
            NodeKind::Function { is_expression, .. } if !*is_expression => {
                self.emit_function(id);
            }
            NodeKind::CcOn
            | NodeKind::CcIf { .. }
            | NodeKind::CcElseIf { .. }
            | NodeKind::CcElse
            | NodeKind::CcEnd
            | NodeKind::CcSet { .. } => self.emit_cc_group(&[id]),
            _ => {
                // Expression statement. One that would start with `{` or
                // `function` must not be mistaken for a block or declaration.
                if self.starts_with_brace_or_function(id) {
                    self.push("(");
                    self.emit_expr(id);
                    self.push(")");
                } else {
                    self.emit_expr(id);
                }
            }
        }
    }

    fn emit_case(&mut self, id: NodeId, last: bool) {
        let ast = self.ast;
        if let NodeKind::Case { test, stmts } = ast.kind(id) {
            match test {
                Some(test) => {
                    self.push("case");
                    self.emit_expr(*test);
                    self.push(":");
                }
                None => self.push("default:"),
            }
            self.indent_level += 1;
            self.emit_stmt_list(stmts, last);
            self.indent_level -= 1;
        }
    }

    fn emit_var(&mut self, decls: &[NodeId], in_for_head: bool) {
        self.push("var");
        for (i, &decl) in decls.iter().enumerate() {
            if i > 0 {
                self.push(",");
            }
            self.emit_var_decl(decl, in_for_head);
        }
    }

    fn emit_var_decl(&mut self, id: NodeId, in_for_head: bool) {
        let ast = self.ast;
        if let NodeKind::VarDecl { name, init, binding } = ast.kind(id) {
            let text = self.output_ident(name, *binding);
            self.push(text);
            if let Some(init) = init {
                self.push("=");
                if in_for_head && self.contains_in_operator(*init) {
                    self.push("(");
                    self.emit_expr_prec(*init, PREC_ASSIGN);
                    self.push(")");
                } else {
                    self.emit_expr_prec(*init, PREC_ASSIGN);
                }
            }
        }
    }

    /// An expression in a `for` head: a bare `in` operator would read as a
    /// for-in, so it gets parentheses there.
    fn emit_for_head_expr(&mut self, id: NodeId) {
        if self.contains_in_operator(id) {
            self.push("(");
            self.emit_expr(id);
            self.push(")");
        } else {
            self.emit_expr(id);
        }
    }

    /// `in` operators not already shielded by brackets in the emitted text.
    fn contains_in_operator(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Binary { op: BinaryOp::In, .. } => true,
            NodeKind::Binary { left, right, .. } => {
                self.contains_in_operator(*left) || self.contains_in_operator(*right)
            }
            NodeKind::Assign { target, value, .. } => {
                self.contains_in_operator(*target) || self.contains_in_operator(*value)
            }
            NodeKind::Conditional { test, cons, alt } => {
                self.contains_in_operator(*test)
                    || self.contains_in_operator(*cons)
                    || self.contains_in_operator(*alt)
            }
            NodeKind::Unary { operand, .. } | NodeKind::PostPre { operand, .. } => {
                self.contains_in_operator(*operand)
            }
            NodeKind::Member { object, .. } => self.contains_in_operator(*object),
            NodeKind::Call { callee, .. } => self.contains_in_operator(*callee),
            _ => false,
        }
    }

    fn ends_with_dangling_if(&self, mut id: NodeId) -> bool {
        loop {
            match self.ast.kind(id) {
                NodeKind::If { alt: None, .. } => return true,
                NodeKind::If { alt: Some(alt), .. } => id = *alt,
                NodeKind::While { body, .. }
                | NodeKind::For { body, .. }
                | NodeKind::ForIn { body, .. }
                | NodeKind::With { body, .. }
                | NodeKind::Labeled { body, .. } => id = *body,
                _ => return false,
            }
        }
    }

    /// Would the first token of this expression be `{` or `function`?
    fn starts_with_brace_or_function(&self, mut id: NodeId) -> bool {
        loop {
            match self.ast.kind(id) {
                NodeKind::Function { is_expression: true, .. } | NodeKind::ObjectLit { .. } => {
                    return true;
                }
                NodeKind::Binary { left, .. } => id = *left,
                NodeKind::Assign { target, .. } => id = *target,
                NodeKind::Conditional { test, .. } => id = *test,
                NodeKind::Member { object, .. } => id = *object,
                NodeKind::Call { callee, is_constructor, .. } => {
                    if *is_constructor {
                        return false;
                    }
                    id = *callee;
                }
                NodeKind::PostPre { op, operand } if !op.is_prefix() => id = *operand,
                _ => return false,
            }
        }
    }

    fn emit_function(&mut self, id: NodeId) {
        let ast = self.ast;
        if let NodeKind::Function { name, params, body, binding, .. } = ast.kind(id) {
            self.push("function");
            if let Some(name) = name {
                let text = self.output_ident(name, *binding);
                self.push(text);
            }
            self.push("(");
            for (i, &param) in params.iter().enumerate() {
                if i > 0 {
                    self.push(",");
                }
                if let NodeKind::Param { name, binding } = ast.kind(param) {
                    let text = self.output_ident(name, *binding);
                    self.push(text);
                }
            }
            self.push(")");
            self.emit_stmt(*body);
        }
    }

    // === Expressions ===

    fn emit_expr(&mut self, id: NodeId) {
        self.emit_expr_prec(id, 0);
    }

    /// Emit an expression that sits where the surroundings demand at least
    /// `min_prec` binding strength; anything looser gets parentheses.
    fn emit_expr_prec(&mut self, id: NodeId, min_prec: u8) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Ident { name, binding } => {
                let text = self.output_ident(name, *binding);
                self.push(text);
            }
            NodeKind::Number(n) => {
                let text = format_number(*n);
                self.push(&text);
            }
            NodeKind::Str(s) => {
                let text = format!("\"{}\"", escape_string(s));
                self.push(&text);
            }
            NodeKind::Bool(b) => self.push(if *b { "true" } else { "false" }),
            NodeKind::Null => self.push("null"),
            NodeKind::This => self.push("this"),
            NodeKind::Regex { pattern, flags } => {
                let text = format!("/{pattern}/{flags}");
                self.push(&text);
            }
            NodeKind::ArrayLit { items } => {
                self.push("[");
                for (i, &item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                    }
                    // Elision holes are empty slots between commas
                    if !matches!(ast.kind(item), NodeKind::Empty) {
                        self.emit_expr_prec(item, PREC_ASSIGN);
                    }
                }
                self.push("]");
            }
            NodeKind::ObjectLit { props } => {
                self.push("{");
                for (i, &prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                    }
                    self.emit_property(prop);
                }
                self.push("}");
            }
            NodeKind::Property { .. } => self.emit_property(id),
            NodeKind::Unary { op, operand } => {
                let wrap = PREC_UNARY < min_prec;
                if wrap {
                    self.push("(");
                }
                self.push(unary_op_text(*op));
                self.emit_expr_prec(*operand, PREC_UNARY);
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::PostPre { op, operand } => {
                let wrap = PREC_POSTFIX < min_prec;
                if wrap {
                    self.push("(");
                }
                let text = match op {
                    PostPreOp::PreIncrement | PostPreOp::PostIncrement => "++",
                    PostPreOp::PreDecrement | PostPreOp::PostDecrement => "--",
                };
                if op.is_prefix() {
                    self.push(text);
                    self.emit_expr_prec(*operand, PREC_UNARY);
                } else {
                    self.emit_expr_prec(*operand, PREC_POSTFIX);
                    self.push(text);
                }
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::Binary { op: BinaryOp::Comma, left, right } => {
                let wrap = PREC_COMMA < min_prec;
                if wrap {
                    self.push("(");
                }
                self.emit_expr_prec(*left, PREC_COMMA);
                self.push(",");
                self.emit_expr_prec(*right, PREC_ASSIGN);
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::Binary { op, left, right } => {
                let (prec, text) = binary_op_info(*op);
                let wrap = prec < min_prec;
                if wrap {
                    self.push("(");
                }
                self.emit_expr_prec(*left, prec);
                self.push(text);
                self.emit_expr_prec(*right, prec + 1);
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::Assign { op, target, value } => {
                let wrap = PREC_ASSIGN < min_prec;
                if wrap {
                    self.push("(");
                }
                self.emit_expr_prec(*target, PREC_COND);
                self.push(assign_op_text(*op));
                self.emit_expr_prec(*value, PREC_ASSIGN);
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::Conditional { test, cons, alt } => {
                let wrap = PREC_COND < min_prec;
                if wrap {
                    self.push("(");
                }
                self.emit_expr_prec(*test, PREC_COND + 1);
                self.push("?");
                self.emit_expr_prec(*cons, PREC_ASSIGN);
                self.push(":");
                self.emit_expr_prec(*alt, PREC_ASSIGN);
                if wrap {
                    self.push(")");
                }
            }
            NodeKind::Member { object, name } => {
                self.emit_expr_prec(*object, PREC_MEMBER);
                self.push(".");
                self.push(name);
            }
            NodeKind::Call { callee, args, in_brackets, is_constructor } => {
                self.emit_call(*callee, *args, *in_brackets, *is_constructor, min_prec);
            }
            NodeKind::List { .. } => self.emit_node(id, Format::Commas),
            NodeKind::Function { .. } => self.emit_function(id),
            NodeKind::Param { name, binding } => {
                let text = self.output_ident(name, *binding);
                self.push(text);
            }
            NodeKind::CcName { name } => {
                let text = format!("@{name}");
                self.push(&text);
            }
            _ => self.emit_stmt(id),
        }
    }

    fn emit_call(
        &mut self,
        callee: NodeId,
        args: NodeId,
        in_brackets: bool,
        is_constructor: bool,
        min_prec: u8,
    ) {
        let empty_args = matches!(self.ast.kind(args), NodeKind::List { items } if items.is_empty());
        if is_constructor {
            self.push("new");
            // A plain call in the callee would swallow the argument list
            self.emit_expr_prec(callee, PREC_MEMBER);
            // `new Foo` can drop its empty parens except where a following
            // `(` or `.` would bind to the wrong thing
            if !empty_args || min_prec >= PREC_CALL {
                self.push("(");
                self.emit_node(args, Format::Commas);
                self.push(")");
            }
        } else if in_brackets {
            self.emit_expr_prec(callee, PREC_MEMBER);
            self.push("[");
            self.emit_node(args, Format::Commas);
            self.push("]");
        } else {
            let wrap = PREC_CALL < min_prec;
            if wrap {
                self.push("(");
            }
            self.emit_expr_prec(callee, PREC_CALL);
            self.push("(");
            self.emit_node(args, Format::Commas);
            self.push(")");
            if wrap {
                self.push(")");
            }
        }
    }

    fn emit_property(&mut self, id: NodeId) {
        let ast = self.ast;
        if let NodeKind::Property { key, value, quoted_key } = ast.kind(id) {
            match ast.kind(*key) {
                NodeKind::Str(s) => {
                    let bare = !*quoted_key
                        || (self.crunch.unquote_safe_property_names
                            && is_valid_identifier(s)
                            && !is_reserved_word(s));
                    if bare {
                        self.push(s);
                    } else {
                        let text = format!("\"{}\"", escape_string(s));
                        self.push(&text);
                    }
                }
                NodeKind::Number(n) => {
                    let text = format_number(*n);
                    self.push(&text);
                }
                _ => self.emit_expr_prec(*key, PREC_ASSIGN),
            }
            self.push(":");
            self.emit_expr_prec(*value, PREC_ASSIGN);
        }
    }

    // === Conditional compilation ===

    /// A run of adjacent directives becomes one `/*@ ... @*/` wrapper, so
    /// engines without the preprocessor skip it as a single comment.
    fn emit_cc_group(&mut self, stmts: &[NodeId]) {
        let saved = std::mem::take(&mut self.output);
        self.output.push_str("/*");
        for (i, &directive) in stmts.iter().enumerate() {
            if i > 0 {
                self.output.push(' ');
            }
            self.emit_cc_directive(directive);
        }
        self.output.push_str("@*/");
        let mut group = std::mem::replace(&mut self.output, saved);
        if !self.multi() {
            // Normalized line endings; the trailing newline keeps following
            // code out of the directives' line
            if group.contains('\r') {
                group = group.replace("\r\n", "\n").replace('\r', "\n");
            }
            self.push(&group);
            self.output.push('\n');
        } else {
            self.push(&group);
        }
    }

    fn emit_cc_directive(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::CcOn => self.output.push_str("@cc_on"),
            NodeKind::CcIf { condition } => {
                self.output.push_str("@if(");
                self.emit_expr(*condition);
                self.output.push(')');
            }
            NodeKind::CcElseIf { condition } => {
                self.output.push_str("@elif(");
                self.emit_expr(*condition);
                self.output.push(')');
            }
            NodeKind::CcElse => self.output.push_str("@else"),
            NodeKind::CcEnd => self.output.push_str("@end"),
            NodeKind::CcSet { name, value } => {
                self.output.push_str("@set@");
                self.output.push_str(name);
                self.output.push('=');
                self.emit_expr_prec(*value, PREC_ASSIGN);
            }
            _ => {}
        }
    }
}

fn is_cc_directive(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::CcOn
            | NodeKind::CcIf { .. }
            | NodeKind::CcElseIf { .. }
            | NodeKind::CcElse
            | NodeKind::CcEnd
            | NodeKind::CcSet { .. }
    )
}

/// Two tokens that would fuse if emitted back to back.
fn joins_tokens(last: u8, next: u8) -> bool {
    fn ident(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
    }
    (ident(last) && ident(next))
        || (last == b'-' && next == b'-')
        || (last == b'+' && next == b'+')
        || (last == b'/' && next == b'/')
        // `1.x` would pull the dot into the number
        || (last.is_ascii_digit() && next == b'.')
}

fn unary_op_text(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Minus => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::Typeof => "typeof",
        UnaryOp::Void => "void",
        UnaryOp::Delete => "delete",
    }
}

fn assign_op_text(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::ModAssign => "%=",
        AssignOp::ShlAssign => "<<=",
        AssignOp::ShrAssign => ">>=",
        AssignOp::UShrAssign => ">>>=",
        AssignOp::BitAndAssign => "&=",
        AssignOp::BitOrAssign => "|=",
        AssignOp::BitXorAssign => "^=",
    }
}

fn binary_op_info(op: BinaryOp) -> (u8, &'static str) {
    match op {
        BinaryOp::Comma => (PREC_COMMA, ","),
        BinaryOp::Or => (4, "||"),
        BinaryOp::And => (5, "&&"),
        BinaryOp::BitOr => (6, "|"),
        BinaryOp::BitXor => (7, "^"),
        BinaryOp::BitAnd => (8, "&"),
        BinaryOp::Eq => (9, "=="),
        BinaryOp::NotEq => (9, "!="),
        BinaryOp::StrictEq => (9, "==="),
        BinaryOp::StrictNotEq => (9, "!=="),
        BinaryOp::Lt => (10, "<"),
        BinaryOp::LtEq => (10, "<="),
        BinaryOp::Gt => (10, ">"),
        BinaryOp::GtEq => (10, ">="),
        BinaryOp::In => (10, "in"),
        BinaryOp::Instanceof => (10, "instanceof"),
        BinaryOp::Shl => (11, "<<"),
        BinaryOp::Shr => (11, ">>"),
        BinaryOp::UShr => (11, ">>>"),
        BinaryOp::Add => (12, "+"),
        BinaryOp::Sub => (12, "-"),
        BinaryOp::Mul => (13, "*"),
        BinaryOp::Div => (13, "/"),
        BinaryOp::Mod => (13, "%"),
    }
}

fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n < 0.0 { "-Infinity".to_string() } else { "Infinity".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        let plain = format!("{n}");
        let exp = format!("{n:e}");
        if exp.len() < plain.len() {
            exp
        } else {
            plain
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => result.push_str("\\0"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
