//! Name crunching.
//!
//! Walks the scope tree after analysis and assigns each renameable binding
//! the shortest identifier that is still free where the binding is visible.
//! Renaming never changes meaning: a binding only gets a new name when every
//! scope that can see it is fully known at compile time, and the new name is
//! never one that something visible there already answers to.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::scope::{BindingId, BindingKind, ScopeId, ScopeTree};
use crate::token::is_reserved_word;

/// Knobs for the renaming passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrunchOptions {
    /// Rename bindings in function scopes.
    pub rename_locals: bool,
    /// Also rename bindings declared at the top level. Off by default:
    /// top-level names are usually a script's public surface.
    pub rename_top_level: bool,
    /// Replace label names with generated short ones.
    pub rename_labels: bool,
    /// Drop labels nothing jumps to.
    pub remove_unreferenced_labels: bool,
    /// Strip quotes from object-literal keys that are valid identifiers.
    pub unquote_safe_property_names: bool,
    /// Treat `eval` as unable to reach local names, so scopes containing an
    /// eval call stay renameable.
    pub evals_are_safe: bool,
    /// Names never assigned as output names and never renamed away.
    pub reserved_names: FxHashSet<String>,
}

impl Default for CrunchOptions {
    fn default() -> Self {
        Self {
            rename_locals: true,
            rename_top_level: false,
            rename_labels: true,
            remove_unreferenced_labels: true,
            unquote_safe_property_names: true,
            evals_are_safe: false,
            reserved_names: FxHashSet::default(),
        }
    }
}

impl CrunchOptions {
    /// No transformation at all: output reproduces the parsed program.
    pub fn passthrough() -> Self {
        Self {
            rename_locals: false,
            rename_labels: false,
            remove_unreferenced_labels: false,
            unquote_safe_property_names: false,
            ..Self::default()
        }
    }
}

const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Bijective base-52 spelling of `n`: 0..52 map to `a`..`Z`, 52 is `aa`.
/// Least significant letter first, so early two-letter names share a cheap
/// prefix (`aa`, `ba`, `ca`, ...).
pub fn encode_name(mut n: usize) -> String {
    let mut name = String::new();
    loop {
        name.push(ALPHABET[n % 52] as char);
        n /= 52;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    name
}

/// Output text for the label at 1-based stack position `position`. Pure in
/// `position`, so every jump to one label agrees on its spelling.
pub fn label_text(position: u32) -> String {
    encode_name(position.saturating_sub(1) as usize)
}

/// Hands out generated names in length order, skipping reserved words and a
/// caller-supplied forbidden set.
pub struct CrunchEnumerator {
    counter: usize,
    forbidden: FxHashSet<String>,
}

impl CrunchEnumerator {
    pub fn new(forbidden: FxHashSet<String>) -> Self {
        Self { counter: 0, forbidden }
    }

    pub fn next_name(&mut self) -> String {
        loop {
            let candidate = encode_name(self.counter);
            self.counter += 1;
            if !is_reserved_word(&candidate) && !self.forbidden.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Assign crunched names across the whole tree.
///
/// Scopes are visited in creation order, which puts every scope after its
/// ancestors, so a scope always sees the final names of everything it can
/// shadow. Each renameable binding in a scope gets the first free name from
/// a fresh enumerator; sibling scopes restart from `a`.
pub fn crunch(scopes: &mut ScopeTree, options: &CrunchOptions) {
    if !options.rename_locals {
        return;
    }

    // A binding reachable from inside an unknown scope must keep its source
    // name: the runtime may look it up by that name.
    for s in 0..scopes.scope_count() {
        if scopes.scope(s).known_at_compile_time {
            continue;
        }
        for b in scopes.scope(s).declared.clone() {
            let root = scopes.resolve_alias(b);
            scopes.binding_mut(root).can_crunch = false;
        }
    }

    for s in 0..scopes.scope_count() {
        if !scope_is_crunched(scopes, s, options) {
            continue;
        }
        let mut forbidden = forbidden_names(scopes, s, options);
        forbidden.extend(options.reserved_names.iter().cloned());
        let mut names = CrunchEnumerator::new(forbidden);
        for b in scopes.scope(s).declared.clone() {
            if !is_renameable(scopes, b, options) {
                continue;
            }
            let name = names.next_name();
            scopes.binding_mut(b).crunched = Some(name);
        }
    }
}

/// Whether the crunch pass assigns names in this scope at all.
fn scope_is_crunched(scopes: &ScopeTree, scope: ScopeId, options: &CrunchOptions) -> bool {
    scopes.scope(scope).known_at_compile_time
        && (scope != ScopeTree::GLOBAL || options.rename_top_level)
}

/// Whether this particular binding may receive a generated name. Aliases are
/// never renamed directly; their chain root is.
fn is_renameable(scopes: &ScopeTree, binding: BindingId, options: &CrunchOptions) -> bool {
    let b = scopes.binding(binding);
    b.outer.is_none()
        && b.kind == BindingKind::Local
        && b.can_crunch
        && !options.reserved_names.contains(&b.name)
}

/// Whether a binding keeps its source name in the output. Scopes later in
/// creation order have not been assigned names yet, so this predicts rather
/// than reads.
fn binding_is_kept(
    scopes: &ScopeTree,
    scope: ScopeId,
    binding: BindingId,
    options: &CrunchOptions,
) -> bool {
    !scope_is_crunched(scopes, scope, options) || !is_renameable(scopes, binding, options)
}

/// Every name that must stay free while assigning in `scope`: final names of
/// all enclosing scopes, kept source names in `scope` itself, and kept
/// source names anywhere below it (an inner scope may reference a binding we
/// are naming here, and its own kept names must not be captured).
fn forbidden_names(
    scopes: &ScopeTree,
    scope: ScopeId,
    options: &CrunchOptions,
) -> FxHashSet<String> {
    let mut set = FxHashSet::default();

    let mut current = Some(scope);
    while let Some(s) = current {
        for &b in &scopes.scope(s).declared {
            let binding = scopes.binding(b);
            if binding.outer.is_some() {
                continue;
            }
            if let Some(crunched) = &binding.crunched {
                set.insert(crunched.clone());
            } else if binding_is_kept(scopes, s, b, options) {
                set.insert(binding.name.clone());
            }
        }
        current = scopes.scope(s).parent;
    }

    let mut stack: Vec<ScopeId> = scopes.scope(scope).children.clone();
    while let Some(s) = stack.pop() {
        for &b in &scopes.scope(s).declared {
            let binding = scopes.binding(b);
            if binding.outer.is_some() {
                continue;
            }
            if binding_is_kept(scopes, s, b, options) {
                set.insert(binding.name.clone());
            }
        }
        stack.extend_from_slice(&scopes.scope(s).children);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;

    #[test]
    fn test_encode_name_sequence() {
        let first: Vec<String> = (0..52).map(encode_name).collect();
        let mut expected: Vec<String> = ('a'..='z').map(|c| c.to_string()).collect();
        expected.extend(('A'..='Z').map(|c| c.to_string()));
        assert_eq!(first, expected);

        assert_eq!(encode_name(52), "aa");
        assert_eq!(encode_name(53), "ba");
        assert_eq!(encode_name(52 + 51), "Za");
        assert_eq!(encode_name(52 + 52 * 52), "aaa");
    }

    #[test]
    fn test_enumerator_skips_forbidden_and_reserved() {
        let mut forbidden = FxHashSet::default();
        forbidden.insert("a".to_string());
        forbidden.insert("c".to_string());
        let mut names = CrunchEnumerator::new(forbidden);
        assert_eq!(names.next_name(), "b");
        assert_eq!(names.next_name(), "d");

        // After the single letters, two-letter reserved words are skipped
        let mut names = CrunchEnumerator::new(FxHashSet::default());
        let mut seen = Vec::new();
        for _ in 0..60 {
            seen.push(names.next_name());
        }
        assert!(!seen.contains(&"do".to_string()));
        assert!(!seen.contains(&"if".to_string()));
        assert!(!seen.contains(&"in".to_string()));
    }

    #[test]
    fn test_label_text_is_deterministic() {
        assert_eq!(label_text(1), "a");
        assert_eq!(label_text(2), "b");
        assert_eq!(label_text(53), "aa");
        assert_eq!(label_text(1), label_text(1));
    }

    #[test]
    fn test_crunch_assigns_in_declaration_order() {
        let mut tree = ScopeTree::new();
        let f = tree.push_scope(ScopeKind::Function, ScopeTree::GLOBAL);
        let x = tree.declare(f, "alpha", BindingKind::Local).unwrap();
        let y = tree.declare(f, "beta", BindingKind::Local).unwrap();

        crunch(&mut tree, &CrunchOptions::default());

        assert_eq!(tree.binding(x).crunched.as_deref(), Some("a"));
        assert_eq!(tree.binding(y).crunched.as_deref(), Some("b"));
    }

    #[test]
    fn test_crunch_skips_global_by_default() {
        let mut tree = ScopeTree::new();
        let g = tree.declare(ScopeTree::GLOBAL, "top", BindingKind::Local).unwrap();

        crunch(&mut tree, &CrunchOptions::default());
        assert_eq!(tree.binding(g).crunched, None);

        let options = CrunchOptions { rename_top_level: true, ..CrunchOptions::default() };
        crunch(&mut tree, &options);
        assert_eq!(tree.binding(g).crunched.as_deref(), Some("a"));
    }

    #[test]
    fn test_crunch_avoids_outer_names_seen_from_inside() {
        // function outer(a) { function inner() { return a; } var b; }
        // `inner`'s alias for `a` means `b` must not be named `a`... but the
        // outer scope names first, so check the other direction: the inner
        // scope must not reuse the name the outer scope assigned to a
        // binding it references.
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(ScopeKind::Function, ScopeTree::GLOBAL);
        let inner = tree.push_scope(ScopeKind::Function, outer);
        let p = tree.declare(outer, "param", BindingKind::Local).unwrap();
        let _alias = tree.declare_alias(inner, p);
        let local = tree.declare(inner, "local", BindingKind::Local).unwrap();

        crunch(&mut tree, &CrunchOptions::default());

        let p_name = tree.binding(p).crunched.clone().unwrap();
        let local_name = tree.binding(local).crunched.clone().unwrap();
        assert_ne!(p_name, local_name);
    }

    #[test]
    fn test_crunch_keeps_names_used_under_unknown_scope() {
        // An inner scope poisoned by eval references an outer binding
        // through an alias; the outer binding keeps its source name.
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(ScopeKind::Function, ScopeTree::GLOBAL);
        let inner = tree.push_scope(ScopeKind::Function, outer);
        tree.scope_mut(inner).known_at_compile_time = false;

        let v = tree.declare(outer, "value", BindingKind::Local).unwrap();
        let _alias = tree.declare_alias(inner, v);
        let other = tree.declare(outer, "other", BindingKind::Local).unwrap();

        crunch(&mut tree, &CrunchOptions::default());

        assert_eq!(tree.binding(v).crunched, None);
        // The kept name is also off limits for siblings
        assert_ne!(tree.binding(other).crunched.as_deref(), Some("value"));
        assert!(tree.binding(other).crunched.is_some());
    }

    #[test]
    fn test_reserved_names_are_never_assigned_or_renamed() {
        let mut tree = ScopeTree::new();
        let f = tree.push_scope(ScopeKind::Function, ScopeTree::GLOBAL);
        let keep = tree.declare(f, "a", BindingKind::Local).unwrap();
        let other = tree.declare(f, "thing", BindingKind::Local).unwrap();

        let mut reserved = FxHashSet::default();
        reserved.insert("a".to_string());
        let options = CrunchOptions { reserved_names: reserved, ..CrunchOptions::default() };
        crunch(&mut tree, &options);

        assert_eq!(tree.binding(keep).crunched, None);
        assert_eq!(tree.binding(other).crunched.as_deref(), Some("b"));
    }
}
