//! AST node model.
//!
//! Nodes live in a flat arena (`Ast`) and refer to each other by index
//! (`NodeId`). Each node knows its parent, so read-side queries can walk
//! upward, while ownership stays strictly top-down from the root. All
//! structural mutation goes through [`Ast::replace_child`], which validates
//! the old child by identity and refuses incompatible replacements instead
//! of panicking.

use crate::scope::BindingId;
use crate::span::Span;

/// Index of a node in the arena.
pub type NodeId = usize;

/// Unary operators (excluding increment/decrement, which have their own
/// node kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,  // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
    Typeof, // typeof
    Void,   // void
    Delete, // delete
}

/// The four increment/decrement forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostPreOp {
    PreIncrement,  // ++x
    PreDecrement,  // --x
    PostIncrement, // x++
    PostDecrement, // x--
}

impl PostPreOp {
    /// True for the prefix forms.
    pub fn is_prefix(self) -> bool {
        matches!(self, PostPreOp::PreIncrement | PostPreOp::PreDecrement)
    }
}

/// Binary operators, the comma operator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Comma, // ,

    // Logical
    Or,  // ||
    And, // &&

    // Bitwise
    BitOr,  // |
    BitXor, // ^
    BitAnd, // &

    // Comparison
    Eq,          // ==
    NotEq,       // !=
    StrictEq,    // ===
    StrictNotEq, // !==
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    In,          // in
    Instanceof,  // instanceof

    // Shifts
    Shl,  // <<
    Shr,  // >>
    UShr, // >>>

    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,       // =
    AddAssign,    // +=
    SubAssign,    // -=
    MulAssign,    // *=
    DivAssign,    // /=
    ModAssign,    // %=
    ShlAssign,    // <<=
    ShrAssign,    // >>=
    UShrAssign,   // >>>=
    BitAndAssign, // &=
    BitOrAssign,  // |=
    BitXorAssign, // ^=
}

/// The kind of a node, with its structural operands.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // === Literals and primaries ===
    /// Identifier reference. `binding` is filled in by scope analysis.
    Ident { name: String, binding: Option<BindingId> },
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    This,
    Regex { pattern: String, flags: String },
    /// Array literal; elision holes are `Empty` nodes.
    ArrayLit { items: Vec<NodeId> },
    ObjectLit { props: Vec<NodeId> },
    /// One `key: value` pair. The key is a `Str` or `Number` node;
    /// `quoted_key` records whether the source spelled it with quotes.
    Property { key: NodeId, value: NodeId, quoted_key: bool },

    // === Operators ===
    Unary { op: UnaryOp, operand: NodeId },
    PostPre { op: PostPreOp, operand: NodeId },
    Binary { op: BinaryOp, left: NodeId, right: NodeId },
    Assign { op: AssignOp, target: NodeId, value: NodeId },
    Conditional { test: NodeId, cons: NodeId, alt: NodeId },
    /// Property access with a literal name: `obj.name`. The name is part of
    /// the object's shape and is never renamed.
    Member { object: NodeId, name: String },
    /// Calls, `new` expressions, and bracket indexing, unified. `args` is
    /// always a `List` node.
    Call { callee: NodeId, args: NodeId, in_brackets: bool, is_constructor: bool },
    /// Comma-separated structural list (call and constructor arguments).
    List { items: Vec<NodeId> },
    /// Function declaration (`is_expression` false) or expression.
    Function {
        name: Option<String>,
        params: Vec<NodeId>,
        body: NodeId,
        is_expression: bool,
        binding: Option<BindingId>,
    },
    /// A formal parameter.
    Param { name: String, binding: Option<BindingId> },

    // === Statements ===
    Block { stmts: Vec<NodeId> },
    /// A `var` statement: one or more declarators.
    Var { decls: Vec<NodeId> },
    /// One declarator within a `var` statement.
    VarDecl { name: String, init: Option<NodeId>, binding: Option<BindingId> },
    Empty,
    If { test: NodeId, cons: NodeId, alt: Option<NodeId> },
    For { init: Option<NodeId>, test: Option<NodeId>, update: Option<NodeId>, body: NodeId },
    ForIn { target: NodeId, object: NodeId, body: NodeId },
    While { test: NodeId, body: NodeId },
    DoWhile { body: NodeId, test: NodeId },
    /// `position` is the 1-based label-stack position of the target label
    /// and `nest_level` counts the loop/switch constructs crossed on the
    /// way to it; both are resolved during analysis.
    Break { label: Option<String>, target_position: u32, nest_level: u32 },
    Continue { label: Option<String>, target_position: u32, nest_level: u32 },
    Return { arg: Option<NodeId> },
    With { object: NodeId, body: NodeId },
    Switch { disc: NodeId, cases: Vec<NodeId> },
    /// A `case` clause; `test` is None for `default`.
    Case { test: Option<NodeId>, stmts: Vec<NodeId> },
    /// `position` is this label's own 1-based label-stack position;
    /// `referenced` records whether any break/continue targets it.
    Labeled { label: String, body: NodeId, position: u32, referenced: bool },
    Throw { arg: NodeId },
    Try {
        block: NodeId,
        catch_param: Option<NodeId>,
        catch_body: Option<NodeId>,
        finally_body: Option<NodeId>,
    },
    Debugger,

    // === Conditional compilation ===
    /// `@cc_on`
    CcOn,
    /// `@if (condition)`
    CcIf { condition: NodeId },
    /// `@elif (condition)`
    CcElseIf { condition: NodeId },
    /// `@else`
    CcElse,
    /// `@end`
    CcEnd,
    /// `@set @name = value`
    CcSet { name: String, value: NodeId },
    /// A conditional-compilation variable in expression position.
    CcName { name: String },
}

/// A node: kind, source location, parent link.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// The arena. The root is always a `Block` holding the program body.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<AstNode>,
    pub root: NodeId,
}

impl Ast {
    /// Create an empty arena whose root is an empty program block.
    pub fn new() -> Self {
        let root_node = AstNode {
            kind: NodeKind::Block { stmts: Vec::new() },
            span: Span::default(),
            parent: None,
        };
        Self { nodes: vec![root_node], root: 0 }
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node. Parent links of its children are fixed up immediately,
    /// so children must be created before their parent.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(AstNode { kind, span, parent: None });
        for child in self.children(id) {
            self.nodes[child].parent = Some(id);
        }
        id
    }

    /// Replace the root's statement list (used once, at the end of parsing).
    pub fn set_program(&mut self, stmts: Vec<NodeId>, span: Span) {
        for &stmt in &stmts {
            self.nodes[stmt].parent = Some(self.root);
        }
        self.nodes[self.root].kind = NodeKind::Block { stmts };
        self.nodes[self.root].span = span;
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    #[inline]
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id].kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Direct structural children in source order. Absent optional operands
    /// are skipped.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        match &self.nodes[id].kind {
            NodeKind::Ident { .. }
            | NodeKind::Number(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_)
            | NodeKind::Null
            | NodeKind::This
            | NodeKind::Regex { .. }
            | NodeKind::Param { .. }
            | NodeKind::Empty
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Debugger
            | NodeKind::CcOn
            | NodeKind::CcElse
            | NodeKind::CcEnd
            | NodeKind::CcName { .. } => {}

            NodeKind::ArrayLit { items } | NodeKind::ObjectLit { props: items } => {
                out.extend_from_slice(items);
            }
            NodeKind::Property { key, value, .. } => {
                out.push(*key);
                out.push(*value);
            }
            NodeKind::Unary { operand, .. } | NodeKind::PostPre { operand, .. } => {
                out.push(*operand);
            }
            NodeKind::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            NodeKind::Assign { target, value, .. } => {
                out.push(*target);
                out.push(*value);
            }
            NodeKind::Conditional { test, cons, alt } => {
                out.push(*test);
                out.push(*cons);
                out.push(*alt);
            }
            NodeKind::Member { object, .. } => out.push(*object),
            NodeKind::Call { callee, args, .. } => {
                out.push(*callee);
                out.push(*args);
            }
            NodeKind::List { items } => out.extend_from_slice(items),
            NodeKind::Function { params, body, .. } => {
                out.extend_from_slice(params);
                out.push(*body);
            }
            NodeKind::Block { stmts } => out.extend_from_slice(stmts),
            NodeKind::Var { decls } => out.extend_from_slice(decls),
            NodeKind::VarDecl { init, .. } => out.extend(init.iter().copied()),
            NodeKind::If { test, cons, alt } => {
                out.push(*test);
                out.push(*cons);
                out.extend(alt.iter().copied());
            }
            NodeKind::For { init, test, update, body } => {
                out.extend(init.iter().copied());
                out.extend(test.iter().copied());
                out.extend(update.iter().copied());
                out.push(*body);
            }
            NodeKind::ForIn { target, object, body } => {
                out.push(*target);
                out.push(*object);
                out.push(*body);
            }
            NodeKind::While { test, body } => {
                out.push(*test);
                out.push(*body);
            }
            NodeKind::DoWhile { body, test } => {
                out.push(*body);
                out.push(*test);
            }
            NodeKind::Return { arg } => out.extend(arg.iter().copied()),
            NodeKind::With { object, body } => {
                out.push(*object);
                out.push(*body);
            }
            NodeKind::Switch { disc, cases } => {
                out.push(*disc);
                out.extend_from_slice(cases);
            }
            NodeKind::Case { test, stmts } => {
                out.extend(test.iter().copied());
                out.extend_from_slice(stmts);
            }
            NodeKind::Labeled { body, .. } => out.push(*body),
            NodeKind::Throw { arg } => out.push(*arg),
            NodeKind::Try { block, catch_param, catch_body, finally_body } => {
                out.push(*block);
                out.extend(catch_param.iter().copied());
                out.extend(catch_body.iter().copied());
                out.extend(finally_body.iter().copied());
            }
            NodeKind::CcIf { condition } | NodeKind::CcElseIf { condition } => {
                out.push(*condition);
            }
            NodeKind::CcSet { value, .. } => out.push(*value),
        }
        out
    }

    /// Swap `old`, a direct child of `parent`, for `new` (or remove it where
    /// the slot allows removal). The old child is validated by identity; on
    /// any mismatch or structural incompatibility nothing is mutated and
    /// `false` is returned.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: Option<NodeId>) -> bool {
        if parent >= self.nodes.len() || old >= self.nodes.len() {
            return false;
        }
        if let Some(n) = new {
            if n >= self.nodes.len() {
                return false;
            }
        }

        // A call's argument slot only accepts a List
        if let NodeKind::Call { args, .. } = &self.nodes[parent].kind {
            if *args == old {
                match new {
                    Some(n) => {
                        if !matches!(self.nodes[n].kind, NodeKind::List { .. }) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
        }

        let mut kind = std::mem::replace(&mut self.nodes[parent].kind, NodeKind::Empty);
        let replaced = Self::swap_slot(&mut kind, old, new);
        self.nodes[parent].kind = kind;

        if replaced {
            if let Some(n) = new {
                self.nodes[n].parent = Some(parent);
            }
            self.nodes[old].parent = None;
        }
        replaced
    }

    /// Find the slot currently holding `old` and rewrite it. Required
    /// scalar slots refuse removal; vector slots drop the element.
    fn swap_slot(kind: &mut NodeKind, old: NodeId, new: Option<NodeId>) -> bool {
        fn in_vec(items: &mut Vec<NodeId>, old: NodeId, new: Option<NodeId>) -> bool {
            if let Some(idx) = items.iter().position(|&c| c == old) {
                match new {
                    Some(n) => items[idx] = n,
                    None => {
                        items.remove(idx);
                    }
                }
                true
            } else {
                false
            }
        }
        fn in_required(slot: &mut NodeId, old: NodeId, new: Option<NodeId>) -> bool {
            if *slot == old {
                if let Some(n) = new {
                    *slot = n;
                    return true;
                }
            }
            false
        }
        fn in_optional(slot: &mut Option<NodeId>, old: NodeId, new: Option<NodeId>) -> bool {
            if *slot == Some(old) {
                *slot = new;
                true
            } else {
                false
            }
        }

        match kind {
            NodeKind::Ident { .. }
            | NodeKind::Number(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_)
            | NodeKind::Null
            | NodeKind::This
            | NodeKind::Regex { .. }
            | NodeKind::Param { .. }
            | NodeKind::Empty
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Debugger
            | NodeKind::CcOn
            | NodeKind::CcElse
            | NodeKind::CcEnd
            | NodeKind::CcName { .. } => false,

            NodeKind::ArrayLit { items }
            | NodeKind::ObjectLit { props: items }
            | NodeKind::List { items }
            | NodeKind::Block { stmts: items }
            | NodeKind::Var { decls: items } => in_vec(items, old, new),

            NodeKind::Property { key, value, .. } => {
                in_required(key, old, new) || in_required(value, old, new)
            }
            NodeKind::Unary { operand, .. } | NodeKind::PostPre { operand, .. } => {
                in_required(operand, old, new)
            }
            NodeKind::Binary { left, right, .. } => {
                in_required(left, old, new) || in_required(right, old, new)
            }
            NodeKind::Assign { target, value, .. } => {
                in_required(target, old, new) || in_required(value, old, new)
            }
            NodeKind::Conditional { test, cons, alt } => {
                in_required(test, old, new)
                    || in_required(cons, old, new)
                    || in_required(alt, old, new)
            }
            NodeKind::Member { object, .. } => in_required(object, old, new),
            NodeKind::Call { callee, args, .. } => {
                in_required(callee, old, new) || in_required(args, old, new)
            }
            NodeKind::Function { params, body, .. } => {
                in_vec(params, old, new) || in_required(body, old, new)
            }
            NodeKind::VarDecl { init, .. } => in_optional(init, old, new),
            NodeKind::If { test, cons, alt } => {
                in_required(test, old, new)
                    || in_required(cons, old, new)
                    || in_optional(alt, old, new)
            }
            NodeKind::For { init, test, update, body } => {
                in_optional(init, old, new)
                    || in_optional(test, old, new)
                    || in_optional(update, old, new)
                    || in_required(body, old, new)
            }
            NodeKind::ForIn { target, object, body } => {
                in_required(target, old, new)
                    || in_required(object, old, new)
                    || in_required(body, old, new)
            }
            NodeKind::While { test, body } => {
                in_required(test, old, new) || in_required(body, old, new)
            }
            NodeKind::DoWhile { body, test } => {
                in_required(body, old, new) || in_required(test, old, new)
            }
            NodeKind::Return { arg } => in_optional(arg, old, new),
            NodeKind::With { object, body } => {
                in_required(object, old, new) || in_required(body, old, new)
            }
            NodeKind::Switch { disc, cases } => {
                in_required(disc, old, new) || in_vec(cases, old, new)
            }
            NodeKind::Case { test, stmts } => {
                in_optional(test, old, new) || in_vec(stmts, old, new)
            }
            NodeKind::Labeled { body, .. } => in_required(body, old, new),
            NodeKind::Throw { arg } => in_required(arg, old, new),
            NodeKind::Try { block, catch_param, catch_body, finally_body } => {
                in_required(block, old, new)
                    || in_optional(catch_param, old, new)
                    || in_optional(catch_body, old, new)
                    || in_optional(finally_body, old, new)
            }
            NodeKind::CcIf { condition } | NodeKind::CcElseIf { condition } => {
                in_required(condition, old, new)
            }
            NodeKind::CcSet { value, .. } => in_required(value, old, new),
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}
