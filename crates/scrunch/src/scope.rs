//! Lexical scopes and symbol bindings.
//!
//! The scope tree is built by analysis (`analyze`), consumed by the name
//! cruncher (`crunch`), and read by the emitter to map identifier nodes to
//! their output names.

use rustc_hash::FxHashMap;

/// Index of a scope in the tree.
pub type ScopeId = usize;

/// Index of a binding.
pub type BindingId = usize;

/// What kind of construct opened the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    /// Body of a `with` statement. Never known at compile time.
    With,
    /// A `catch` clause; holds exactly the catch parameter.
    Catch,
}

impl ScopeKind {
    /// `var` declarations hoist to the nearest scope of these kinds.
    pub fn is_hoist_target(self) -> bool {
        matches!(self, ScopeKind::Global | ScopeKind::Function)
    }
}

/// How a binding came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Declared by `var`, a function name, a parameter, or a catch variable.
    Local,
    /// Forced into existence by a `with` scope; its runtime meaning is
    /// unknowable, so it is never renamed.
    Ambient,
    /// A host or runtime global referenced but never declared. Never
    /// renamed.
    Predefined,
}

/// A named symbol.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Eligibility for renaming. Ambient and predefined bindings are born
    /// ineligible; locals lose eligibility when a `with` body may capture
    /// them.
    pub can_crunch: bool,
    /// Assigned output name. Absent until the crunch phase runs, and always
    /// absent on aliased bindings (the root of the chain holds it).
    pub crunched: Option<String>,
    /// Alias link: when set, this binding stands for one declared in an
    /// outer scope, and every name query follows the chain.
    pub outer: Option<BindingId>,
}

/// One lexical scope.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Name lookup within this scope.
    symbols: FxHashMap<String, BindingId>,
    /// Bindings in declaration order, for deterministic crunch iteration.
    pub declared: Vec<BindingId>,
    /// False once `eval` (or the scope being a `with` body) makes static
    /// analysis unreliable here. Nothing in an unknown scope is renamed.
    pub known_at_compile_time: bool,
    /// A `this` expression resolved to this scope.
    pub uses_this: bool,
}

/// All scopes and bindings of one document.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
}

impl ScopeTree {
    pub const GLOBAL: ScopeId = 0;

    /// Create a tree holding just the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                children: Vec::new(),
                symbols: FxHashMap::default(),
                declared: Vec::new(),
                known_at_compile_time: true,
                uses_this: false,
            }],
            bindings: Vec::new(),
        }
    }

    /// Open a child scope. A `with` scope is born not known at compile
    /// time.
    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            symbols: FxHashMap::default(),
            declared: Vec::new(),
            known_at_compile_time: kind != ScopeKind::With,
            uses_this: false,
        });
        self.scopes[parent].children.push(id);
        id
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    #[inline]
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    #[inline]
    pub fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id]
    }

    /// Declare `name` in `scope`. On a duplicate the original binding wins
    /// and comes back as the `Err` value.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
    ) -> Result<BindingId, BindingId> {
        if let Some(&existing) = self.scopes[scope].symbols.get(name) {
            return Err(existing);
        }
        let id = self.bindings.len();
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            can_crunch: kind == BindingKind::Local,
            crunched: None,
            outer: None,
        });
        self.scopes[scope].symbols.insert(name.to_string(), id);
        self.scopes[scope].declared.push(id);
        Ok(id)
    }

    /// Declare an alias in `scope` for a binding that lives further out.
    pub fn declare_alias(&mut self, scope: ScopeId, outer: BindingId) -> BindingId {
        let name = self.bindings[outer].name.clone();
        let id = self.bindings.len();
        self.bindings.push(Binding {
            name: name.clone(),
            kind: self.bindings[outer].kind,
            can_crunch: false, // the chain root decides
            crunched: None,
            outer: Some(outer),
        });
        self.scopes[scope].symbols.insert(name, id);
        self.scopes[scope].declared.push(id);
        id
    }

    /// Look `name` up in exactly one scope.
    pub fn lookup_in(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        self.scopes[scope].symbols.get(name).copied()
    }

    /// Resolve `name` starting from `scope`, walking outward. Returns the
    /// scope it was found in along with the binding.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, BindingId)> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(&b) = self.scopes[s].symbols.get(name) {
                return Some((s, b));
            }
            current = self.scopes[s].parent;
        }
        None
    }

    /// Follow the alias chain to the binding that actually owns the name.
    pub fn resolve_alias(&self, mut id: BindingId) -> BindingId {
        while let Some(outer) = self.bindings[id].outer {
            id = outer;
        }
        id
    }

    /// The name this binding appears as in output: the chain root's
    /// crunched name if one was assigned, otherwise its original name.
    pub fn output_name(&self, id: BindingId) -> &str {
        let root = self.resolve_alias(id);
        match &self.bindings[root].crunched {
            Some(name) => name,
            None => &self.bindings[root].name,
        }
    }

    /// Walk from `scope` to the nearest function-or-global scope.
    pub fn hoist_target(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while !self.scopes[current].kind.is_hoist_target() {
            // The global scope is always a hoist target, so a parent exists
            current = self.scopes[current].parent.unwrap_or(Self::GLOBAL);
        }
        current
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
