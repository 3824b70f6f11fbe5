//! Scope analysis.
//!
//! Two walks over the tree. The first builds the scope graph: it opens
//! scopes for functions, `with` bodies, and `catch` clauses, hoists `var`
//! and function declarations to the nearest function-or-global scope,
//! resolves break/continue targets onto the label stack, and poisons scopes
//! whose contents `eval` might inspect. The second walk binds every
//! identifier reference to a symbol, creating ambient bindings under `with`
//! and alias links where a reference crosses a function boundary.
//!
//! Problems found here (duplicate declarations, unknown labels, `return`
//! outside a function) become diagnostics; analysis always completes.

use rustc_hash::FxHashMap;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::crunch::CrunchOptions;
use crate::error::Diagnostic;
use crate::scope::{BindingId, BindingKind, ScopeId, ScopeKind, ScopeTree};
use crate::span::Span;

/// Everything analysis learned about one document.
pub struct Analysis {
    pub scopes: ScopeTree,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyze `ast`, filling in binding references, label positions, and jump
/// depths on the nodes themselves.
pub fn analyze(ast: &mut Ast, options: &CrunchOptions) -> Analysis {
    let mut analyzer = Analyzer {
        options,
        scopes: ScopeTree::new(),
        stack: vec![ScopeTree::GLOBAL],
        scope_of: FxHashMap::default(),
        labels: Vec::new(),
        breakables: Vec::new(),
        pending_label: None,
        diagnostics: Vec::new(),
    };
    analyzer.collect(ast, ast.root);
    analyzer.resolve(ast, ast.root);
    Analysis { scopes: analyzer.scopes, diagnostics: analyzer.diagnostics }
}

/// A label currently in scope during the collect walk.
struct LabelEntry {
    name: String,
    /// 1-based position on the label stack.
    position: u32,
    /// The `Labeled` node, so jumps can mark it referenced.
    node: NodeId,
}

/// A construct a break (and, for loops, a continue) can target.
struct Breakable {
    /// Label-stack position of the label naming this construct, if any.
    label: Option<u32>,
    is_loop: bool,
}

struct Analyzer<'a> {
    options: &'a CrunchOptions,
    scopes: ScopeTree,
    stack: Vec<ScopeId>,
    /// Which scope each scope-opening node's body runs in. Keyed by the node
    /// the scope actually covers: the function itself, a `with` body, a
    /// catch body.
    scope_of: FxHashMap<NodeId, ScopeId>,
    labels: Vec<LabelEntry>,
    breakables: Vec<Breakable>,
    /// Set by a `Labeled` node for its immediate body; a loop or switch
    /// claims it, anything else drops it.
    pending_label: Option<u32>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer<'_> {
    fn current(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&ScopeTree::GLOBAL)
    }

    fn in_function(&self) -> bool {
        self.stack.iter().any(|&s| self.scopes.scope(s).kind == ScopeKind::Function)
    }

    fn declare_checked(&mut self, scope: ScopeId, name: &str, span: Span) -> BindingId {
        match self.scopes.declare(scope, name, BindingKind::Local) {
            Ok(id) => id,
            Err(existing) => {
                self.diagnostics.push(Diagnostic::warning(
                    format!("duplicate declaration of `{name}`"),
                    span,
                ));
                existing
            }
        }
    }

    // === Pass one: scopes, declarations, labels ===

    fn collect(&mut self, ast: &mut Ast, id: NodeId) {
        let pending = self.pending_label.take();
        match ast.kind(id).clone() {
            NodeKind::Function { name, params, body, is_expression, .. } => {
                if !is_expression {
                    if let Some(name) = &name {
                        let target = self.scopes.hoist_target(self.current());
                        let b = self.declare_checked(target, name, ast.span(id));
                        if let NodeKind::Function { binding, .. } = ast.kind_mut(id) {
                            *binding = Some(b);
                        }
                    }
                }
                let fn_scope = self.scopes.push_scope(ScopeKind::Function, self.current());
                self.scope_of.insert(id, fn_scope);
                self.stack.push(fn_scope);
                if is_expression {
                    // A function expression's name is visible only inside it
                    if let Some(name) = &name {
                        let b = self.declare_checked(fn_scope, name, ast.span(id));
                        if let NodeKind::Function { binding, .. } = ast.kind_mut(id) {
                            *binding = Some(b);
                        }
                    }
                }

                // Labels do not cross function boundaries
                let saved_labels = std::mem::take(&mut self.labels);
                let saved_breakables = std::mem::take(&mut self.breakables);
                for p in params {
                    self.collect(ast, p);
                }
                self.collect(ast, body);
                self.labels = saved_labels;
                self.breakables = saved_breakables;
                self.stack.pop();
            }
            NodeKind::Param { name, .. } => {
                let b = self.declare_checked(self.current(), &name, ast.span(id));
                if let NodeKind::Param { binding, .. } = ast.kind_mut(id) {
                    *binding = Some(b);
                }
            }
            NodeKind::VarDecl { name, init, .. } => {
                let target = self.scopes.hoist_target(self.current());
                let b = self.declare_checked(target, &name, ast.span(id));
                if let NodeKind::VarDecl { binding, .. } = ast.kind_mut(id) {
                    *binding = Some(b);
                }
                if let Some(init) = init {
                    self.collect(ast, init);
                }
            }
            NodeKind::With { object, body } => {
                self.collect(ast, object);
                let w = self.scopes.push_scope(ScopeKind::With, self.current());
                self.scope_of.insert(body, w);
                self.stack.push(w);
                self.collect(ast, body);
                self.stack.pop();
            }
            NodeKind::Try { block, catch_param, catch_body, finally_body } => {
                self.collect(ast, block);
                if let Some(catch_body) = catch_body {
                    let c = self.scopes.push_scope(ScopeKind::Catch, self.current());
                    self.scope_of.insert(catch_body, c);
                    self.stack.push(c);
                    if let Some(param) = catch_param {
                        self.collect(ast, param);
                    }
                    self.collect(ast, catch_body);
                    self.stack.pop();
                }
                if let Some(finally_body) = finally_body {
                    self.collect(ast, finally_body);
                }
            }
            NodeKind::Call { callee, .. } => {
                if let NodeKind::Ident { name, .. } = ast.kind(callee) {
                    // eval can read and write any name visible where it
                    // runs, so every enclosing scope becomes unknowable
                    if name == "eval" && !self.options.evals_are_safe {
                        let mut current = Some(self.current());
                        while let Some(s) = current {
                            self.scopes.scope_mut(s).known_at_compile_time = false;
                            current = self.scopes.scope(s).parent;
                        }
                    }
                }
                for c in ast.children(id) {
                    self.collect(ast, c);
                }
            }
            NodeKind::This => {
                let mut current = Some(self.current());
                while let Some(s) = current {
                    if self.scopes.scope(s).kind == ScopeKind::Function {
                        self.scopes.scope_mut(s).uses_this = true;
                        break;
                    }
                    current = self.scopes.scope(s).parent;
                }
            }
            NodeKind::Return { arg } => {
                if !self.in_function() {
                    self.diagnostics.push(Diagnostic::error(
                        "return outside of a function",
                        ast.span(id),
                    ));
                }
                if let Some(arg) = arg {
                    self.collect(ast, arg);
                }
            }
            NodeKind::Labeled { label, body, .. } => {
                let position = self.labels.len() as u32 + 1;
                if let NodeKind::Labeled { position: p, .. } = ast.kind_mut(id) {
                    *p = position;
                }
                self.labels.push(LabelEntry { name: label, position, node: id });
                self.pending_label = Some(position);
                self.collect(ast, body);
                self.pending_label = None;
                self.labels.pop();
            }
            NodeKind::While { .. } | NodeKind::DoWhile { .. } | NodeKind::For { .. }
            | NodeKind::ForIn { .. } => {
                self.breakables.push(Breakable { label: pending, is_loop: true });
                for c in ast.children(id) {
                    self.collect(ast, c);
                }
                self.breakables.pop();
            }
            NodeKind::Switch { .. } => {
                self.breakables.push(Breakable { label: pending, is_loop: false });
                for c in ast.children(id) {
                    self.collect(ast, c);
                }
                self.breakables.pop();
            }
            NodeKind::Break { label, .. } => self.resolve_jump(ast, id, label, true),
            NodeKind::Continue { label, .. } => self.resolve_jump(ast, id, label, false),
            _ => {
                for c in ast.children(id) {
                    self.collect(ast, c);
                }
            }
        }
    }

    /// Fix a break or continue onto its target: record the label's stack
    /// position and how many break targets the jump crosses to reach it. A
    /// jump to the construct it already sits in needs no label at all.
    fn resolve_jump(&mut self, ast: &mut Ast, id: NodeId, label: Option<String>, is_break: bool) {
        let Some(name) = label else { return };
        let Some(entry) = self.labels.iter().rev().find(|l| l.name == name) else {
            self.diagnostics.push(Diagnostic::error(
                format!("undefined label `{name}`"),
                ast.span(id),
            ));
            return;
        };
        let position = entry.position;
        let target_node = entry.node;

        let mut depth = None;
        let mut crossed = 0u32;
        for b in self.breakables.iter().rev() {
            if !is_break && !b.is_loop {
                // continue cannot target a switch
                continue;
            }
            if b.label == Some(position) {
                depth = Some(crossed);
                break;
            }
            crossed += 1;
        }
        // A label on a plain statement is still a valid break target, one
        // level out from wherever the jump sits
        let depth = depth.unwrap_or_else(|| crossed.max(1));

        if self.options.rename_labels && depth == 0 {
            // The innermost construct is the target; the plain form says so
            match ast.kind_mut(id) {
                NodeKind::Break { label, .. } | NodeKind::Continue { label, .. } => *label = None,
                _ => {}
            }
            return;
        }

        match ast.kind_mut(id) {
            NodeKind::Break { target_position, nest_level, .. }
            | NodeKind::Continue { target_position, nest_level, .. } => {
                *target_position = position;
                *nest_level = depth;
            }
            _ => {}
        }
        if let NodeKind::Labeled { referenced, .. } = ast.kind_mut(target_node) {
            *referenced = true;
        }
    }

    // === Pass two: identifier references ===

    fn resolve(&mut self, ast: &mut Ast, id: NodeId) {
        let pushed = if let Some(&scope) = self.scope_of.get(&id) {
            self.stack.push(scope);
            true
        } else {
            false
        };

        if let NodeKind::Ident { name, .. } = ast.kind(id) {
            let name = name.clone();
            self.resolve_ident(ast, id, &name);
        } else {
            for c in ast.children(id) {
                self.resolve(ast, c);
            }
        }

        if pushed {
            self.stack.pop();
        }
    }

    fn resolve_ident(&mut self, ast: &mut Ast, id: NodeId, name: &str) {
        let top = self.current();
        let resolved = self.scopes.resolve(top, name);

        // A `with` body between the reference and its declaration makes the
        // reference ambient: the with object may intercept the name at
        // runtime, so it binds to the innermost such scope and whatever it
        // shadows keeps its source name.
        let with_scope = {
            let stop = resolved.map(|(scope, _)| scope);
            let mut found = None;
            let mut current = Some(top);
            while let Some(s) = current {
                if Some(s) == stop {
                    break;
                }
                if self.scopes.scope(s).kind == ScopeKind::With {
                    found = Some(s);
                    break;
                }
                current = self.scopes.scope(s).parent;
            }
            found
        };

        let binding = if let Some(w) = with_scope {
            if let Some((_, shadowed)) = resolved {
                let root = self.scopes.resolve_alias(shadowed);
                self.scopes.binding_mut(root).can_crunch = false;
            }
            match self.scopes.lookup_in(w, name) {
                Some(b) => b,
                None => self
                    .scopes
                    .declare(w, name, BindingKind::Ambient)
                    .unwrap_or_else(|existing| existing),
            }
        } else {
            match resolved {
                Some((def, b)) => {
                    let ref_fn = self.scopes.hoist_target(top);
                    let root = self.scopes.resolve_alias(b);
                    if self.scopes.binding(root).kind != BindingKind::Local
                        || self.scopes.hoist_target(def) == ref_fn
                    {
                        b
                    } else {
                        // Crossing a function boundary: leave an alias in
                        // the referencing function so the cruncher knows the
                        // outer name is live here
                        self.scopes.declare_alias(ref_fn, b)
                    }
                }
                None => match self.scopes.lookup_in(ScopeTree::GLOBAL, name) {
                    Some(b) => b,
                    None => self
                        .scopes
                        .declare(ScopeTree::GLOBAL, name, BindingKind::Predefined)
                        .unwrap_or_else(|existing| existing),
                },
            }
        };

        if let NodeKind::Ident { binding: slot, .. } = ast.kind_mut(id) {
            *slot = Some(binding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::parser::Parser;

    fn analyze_source(source: &str) -> (Ast, Analysis) {
        let mut ast = Parser::new(source).parse().unwrap();
        let analysis = analyze(&mut ast, &CrunchOptions::default());
        (ast, analysis)
    }

    fn find_ident(ast: &Ast, name: &str) -> Option<BindingId> {
        for id in 0..ast.len() {
            if let NodeKind::Ident { name: n, binding } = ast.kind(id) {
                if n == name {
                    return *binding;
                }
            }
        }
        None
    }

    #[test]
    fn test_var_binds_in_function_scope() {
        let (ast, analysis) = analyze_source("function f() { var x = 1; return x; }");
        let b = find_ident(&ast, "x").unwrap();
        assert_eq!(analysis.scopes.binding(b).kind, BindingKind::Local);
        assert!(analysis.diagnostics.is_empty());
    }

    #[test]
    fn test_var_hoists_out_of_catch() {
        let (ast, analysis) =
            analyze_source("function f() { try { g(); } catch (e) { var x = e; } return x; }");
        // Both `x` references resolve to the same hoisted binding
        let b = find_ident(&ast, "x").unwrap();
        let root = analysis.scopes.resolve_alias(b);
        assert_eq!(analysis.scopes.binding(root).name, "x");
        assert_eq!(analysis.scopes.binding(root).kind, BindingKind::Local);
    }

    #[test]
    fn test_undeclared_name_becomes_predefined_global() {
        let (ast, analysis) = analyze_source("function f() { return document; }");
        let b = find_ident(&ast, "document").unwrap();
        let root = analysis.scopes.resolve_alias(b);
        assert_eq!(analysis.scopes.binding(root).kind, BindingKind::Predefined);
        assert!(!analysis.scopes.binding(root).can_crunch);
    }

    #[test]
    fn test_cross_function_reference_creates_alias() {
        let (ast, analysis) =
            analyze_source("function o() { var v; function i() { return v; } }");
        let b = find_ident(&ast, "v").unwrap();
        let binding = analysis.scopes.binding(b);
        assert!(binding.outer.is_some());
        let root = analysis.scopes.resolve_alias(b);
        assert_ne!(root, b);
        assert_eq!(analysis.scopes.binding(root).name, "v");
    }

    #[test]
    fn test_eval_poisons_every_enclosing_scope() {
        let (_ast, analysis) = analyze_source(
            "function f() { var x; eval(s); } function g() { var y; }",
        );
        let known: Vec<bool> = (0..analysis.scopes.scope_count())
            .map(|s| analysis.scopes.scope(s).known_at_compile_time)
            .collect();
        // Global, f, g; f and its ancestors are poisoned, the sibling is not
        assert_eq!(known, vec![false, false, true]);
    }

    #[test]
    fn test_eval_in_nested_function_poisons_ancestors() {
        let (_ast, analysis) = analyze_source(
            "function outer() { var o = 1; function inner() { eval(s); } }",
        );
        // eval may read `o` through the scope chain at runtime
        for s in 0..analysis.scopes.scope_count() {
            assert!(!analysis.scopes.scope(s).known_at_compile_time);
        }
    }

    #[test]
    fn test_evals_are_safe_disables_poisoning() {
        let mut ast = Parser::new("function f() { var x; eval(s); }").parse().unwrap();
        let options = CrunchOptions { evals_are_safe: true, ..CrunchOptions::default() };
        let analysis = analyze(&mut ast, &options);
        for s in 0..analysis.scopes.scope_count() {
            assert!(analysis.scopes.scope(s).known_at_compile_time);
        }
    }

    #[test]
    fn test_with_body_reference_is_ambient_and_poisons_local() {
        let (ast, analysis) =
            analyze_source("function f(obj) { var v = 1; with (obj) { v = 2; } }");
        let b = find_ident(&ast, "v").unwrap();
        assert_eq!(analysis.scopes.binding(b).kind, BindingKind::Ambient);
        // The shadowed local keeps its name
        let (_, local) = (0..analysis.scopes.scope_count())
            .flat_map(|s| {
                analysis.scopes.scope(s).declared.iter().map(move |&b| (s, b))
            })
            .find(|&(_, b)| {
                let binding = analysis.scopes.binding(b);
                binding.name == "v" && binding.kind == BindingKind::Local
            })
            .unwrap();
        assert!(!analysis.scopes.binding(local).can_crunch);
    }

    #[test]
    fn test_duplicate_parameter_reports_and_keeps_first() {
        let (_ast, analysis) = analyze_source("function f(a, a) {}");
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].severity, Severity::Warning);
        assert!(analysis.diagnostics[0].message.contains("duplicate"));
    }

    #[test]
    fn test_return_at_top_level_is_an_error() {
        let (_ast, analysis) = analyze_source("return 1;");
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_undefined_label_is_an_error() {
        let (_ast, analysis) = analyze_source("while (x) { break missing; }");
        assert!(analysis
            .diagnostics
            .iter()
            .any(|d| d.message.contains("missing") && d.severity == Severity::Error));
    }

    #[test]
    fn test_zero_depth_label_is_stripped() {
        let (ast, analysis) = analyze_source("a: while (x) { break a; }");
        assert!(analysis.diagnostics.is_empty());
        let brk = (0..ast.len())
            .find(|&id| matches!(ast.kind(id), NodeKind::Break { .. }))
            .unwrap();
        match ast.kind(brk) {
            NodeKind::Break { label, .. } => assert_eq!(*label, None),
            _ => unreachable!(),
        }
        // The target label is now unreferenced
        let labeled = (0..ast.len())
            .find(|&id| matches!(ast.kind(id), NodeKind::Labeled { .. }))
            .unwrap();
        match ast.kind(labeled) {
            NodeKind::Labeled { referenced, .. } => assert!(!referenced),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_outer_label_break_records_position_and_depth() {
        let (ast, analysis) =
            analyze_source("a: while (x) { while (y) { break a; } }");
        assert!(analysis.diagnostics.is_empty());
        let brk = (0..ast.len())
            .find(|&id| matches!(ast.kind(id), NodeKind::Break { .. }))
            .unwrap();
        match ast.kind(brk) {
            NodeKind::Break { label, target_position, nest_level } => {
                assert_eq!(label.as_deref(), Some("a"));
                assert_eq!(*target_position, 1);
                assert_eq!(*nest_level, 1);
            }
            _ => unreachable!(),
        }
        let labeled = (0..ast.len())
            .find(|&id| matches!(ast.kind(id), NodeKind::Labeled { .. }))
            .unwrap();
        match ast.kind(labeled) {
            NodeKind::Labeled { referenced, position, .. } => {
                assert!(referenced);
                assert_eq!(*position, 1);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_continue_skips_switch_when_counting() {
        let (ast, analysis) = analyze_source(
            "a: while (x) { switch (y) { default: continue a; } }",
        );
        assert!(analysis.diagnostics.is_empty());
        let cont = (0..ast.len())
            .find(|&id| matches!(ast.kind(id), NodeKind::Continue { .. }))
            .unwrap();
        match ast.kind(cont) {
            NodeKind::Continue { label, .. } => {
                // The switch does not count for continue, so the loop is the
                // innermost continue target and the label is dropped
                assert_eq!(*label, None);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_this_marks_enclosing_function() {
        let (_ast, analysis) = analyze_source("function f() { return this; }");
        let uses: Vec<bool> = (0..analysis.scopes.scope_count())
            .map(|s| analysis.scopes.scope(s).uses_this)
            .collect();
        assert_eq!(uses, vec![false, true]);
    }

    #[test]
    fn test_function_expression_name_stays_inside() {
        let (_ast, analysis) = analyze_source("var f = function g() { return g; };");
        // `g` is not visible in the global scope
        assert!(analysis.scopes.lookup_in(ScopeTree::GLOBAL, "g").is_none());
    }
}
