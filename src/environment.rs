//! Chained, name-resolving scopes with upward lookup and local caching.
//!
//! See spec.md §4.3. An `Environment` is a local `Symbol -> Sexpr`
//! dictionary plus an optional parent; every environment in a chain shares
//! one `SymbolProvider` (invariant E1). Looking a name up walks parents
//! until a binding is found or the root is passed (E3); a successful
//! upward hit is cached into the local dictionary of the environment that
//! asked (E4) — a deliberate read-time mutation documented in spec.md §9.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::intern::SymbolProvider;
use crate::sexpr::Sexpr;
use crate::symbol::Symbol;

struct EnvironmentInner {
    locals: RefCell<AHashMap<i32, Sexpr>>,
    parent: Option<Environment>,
    provider: Rc<SymbolProvider>,
    depth: usize,
}

/// A scope: local bindings plus an optional link to an enclosing scope.
/// Cheap to clone — clones share the same underlying dictionary.
#[derive(Clone)]
pub struct Environment(Rc<EnvironmentInner>);

impl Environment {
    /// Creates a root environment (no parent) bound to `provider`.
    #[must_use]
    pub fn root(provider: Rc<SymbolProvider>) -> Self {
        Self(Rc::new(EnvironmentInner {
            locals: RefCell::new(AHashMap::new()),
            parent: None,
            provider,
            depth: 0,
        }))
    }

    /// Creates a fresh child scope whose parent is `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self(Rc::new(EnvironmentInner {
            locals: RefCell::new(AHashMap::new()),
            parent: Some(self.clone()),
            provider: self.0.provider.clone(),
            depth: self.0.depth + 1,
        }))
    }

    /// The symbol provider shared by this whole chain (invariant E1).
    #[must_use]
    pub fn provider(&self) -> &Rc<SymbolProvider> {
        &self.0.provider
    }

    /// True if this environment has no parent (spec.md invariant E2).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Distance from the root: `0` for the root itself. A debugging aid,
    /// not part of lookup semantics.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    /// Whether `symbol` has a binding reachable from here — local or
    /// through an ancestor.
    #[must_use]
    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        self.try_get_symbol(symbol).is_some()
    }

    /// Interns `literal` (allocating a fresh user symbol if it has never
    /// been seen) and checks whether it has a binding.
    #[must_use]
    pub fn contains_literal(&self, literal: &str) -> bool {
        let symbol = self.0.provider.intern(literal, false);
        self.contains_symbol(&symbol)
    }

    /// Looks `symbol` up: local dictionary first, then each ancestor in
    /// turn. A hit found through a parent is cached into *this*
    /// environment's local dictionary before being returned (E4), so a
    /// repeated lookup of the same name from the same scope is O(1)
    /// afterwards.
    #[must_use]
    pub fn try_get_symbol(&self, symbol: &Symbol) -> Option<Sexpr> {
        if let Some(value) = self.0.locals.borrow().get(&symbol.index()) {
            return Some(value.clone());
        }
        let mut ancestor = self.0.parent.clone();
        while let Some(env) = ancestor {
            if let Some(value) = env.0.locals.borrow().get(&symbol.index()) {
                self.0.locals.borrow_mut().insert(symbol.index(), value.clone());
                return Some(value);
            }
            ancestor = env.0.parent.clone();
        }
        None
    }

    /// Interns `literal` and looks it up, per [`try_get_symbol`][Self::try_get_symbol].
    #[must_use]
    pub fn try_get_literal(&self, literal: &str) -> Option<Sexpr> {
        let symbol = self.0.provider.intern(literal, false);
        self.try_get_symbol(&symbol)
    }

    /// Binds `symbol` to `value` in this environment's *local* dictionary,
    /// shadowing (never mutating) any ancestor binding. Returns `self` so
    /// calls can be chained: `env.set(a, 1).set(b, 2)`.
    pub fn set(&self, symbol: Symbol, value: Sexpr) -> &Self {
        self.0.locals.borrow_mut().insert(symbol.index(), value);
        self
    }
}
