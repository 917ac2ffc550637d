//! Bijective, append-only mapping between literal strings and [`Symbol`]s.
//!
//! Seeded once with the reserved builtin literals (`(`, `)`, `` ` ``, `let`,
//! `=>`, ...), then grown by the parser as it encounters new user
//! identifiers. Indices are assigned from one shared, monotonically
//! increasing counter; the sign at the moment of interning (builtin vs.
//! user) is what separates the two namespaces. See `spec.md` §4.2.

use std::rc::Rc;

use ahash::AHashMap;
use strum::{EnumIter, IntoEnumIterator};

use crate::sexpr::Sexpr;
use crate::symbol::Symbol;

/// The reserved builtin literals, seeded in this exact order so their
/// indices land on `Unknown(0)`, `Open(-1)`, `Close(-2)`, `Quote(-3)`,
/// `Params(-4)`, `This(-5)`, `Let(-6)`, `Lambda(-7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum CoreBuiltin {
    Unknown,
    Open,
    Close,
    Quote,
    Params,
    This,
    Let,
    Lambda,
}

impl CoreBuiltin {
    fn literal(self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Open => "(",
            Self::Close => ")",
            Self::Quote => "`",
            Self::Params => "params",
            Self::This => "this",
            Self::Let => "let",
            Self::Lambda => "=>",
        }
    }
}

struct ProviderState {
    literals: AHashMap<Rc<str>, Symbol>,
    names: AHashMap<i32, Rc<str>>,
    count: u32,
}

/// The bijective, append-only literal-to-[`Symbol`] table shared by every
/// component of one interpreter instance (parser, environments, closures).
///
/// Invariants (spec.md §4.2):
/// - a literal present maps to exactly one `Symbol`;
/// - a `Symbol` present maps to exactly one literal;
/// - nothing is ever removed or rebound.
pub struct SymbolProvider {
    state: std::cell::RefCell<ProviderState>,
    unknown: Symbol,
    open: Symbol,
    close: Symbol,
    quote: Symbol,
    params: Symbol,
    this: Symbol,
    let_: Symbol,
    lambda: Symbol,
}

impl SymbolProvider {
    /// Seeds the provider with the default core builtin table, verifying
    /// each literal lands on the index `spec.md` §3 reserves for it. A
    /// mismatch is a programmer error, not a recoverable condition (§7
    /// category 1) — this is the "strict" seeding variant `spec.md` §4.2
    /// allows implementers to choose.
    #[must_use]
    pub fn with_core_seed() -> Rc<Self> {
        let state = ProviderState {
            literals: AHashMap::new(),
            names: AHashMap::new(),
            count: 0,
        };
        let mut provider = Self {
            state: std::cell::RefCell::new(state),
            unknown: Symbol::new(0),
            open: Symbol::new(0),
            close: Symbol::new(0),
            quote: Symbol::new(0),
            params: Symbol::new(0),
            this: Symbol::new(0),
            let_: Symbol::new(0),
            lambda: Symbol::new(0),
        };
        for builtin in CoreBuiltin::iter() {
            let expected_index = -(provider.state.borrow().count as i32);
            let symbol = provider.intern_raw(builtin.literal(), true);
            assert_eq!(
                symbol.index(),
                expected_index,
                "core seed out of order: {:?} expected index {expected_index}",
                builtin
            );
            match builtin {
                CoreBuiltin::Unknown => provider.unknown = symbol,
                CoreBuiltin::Open => provider.open = symbol,
                CoreBuiltin::Close => provider.close = symbol,
                CoreBuiltin::Quote => provider.quote = symbol,
                CoreBuiltin::Params => provider.params = symbol,
                CoreBuiltin::This => provider.this = symbol,
                CoreBuiltin::Let => provider.let_ = symbol,
                CoreBuiltin::Lambda => provider.lambda = symbol,
            }
        }
        Rc::new(provider)
    }

    /// Like [`with_core_seed`][Self::with_core_seed], but seeds `params`
    /// and `this` with unguessable literals derived from `nonce` instead of
    /// the plain `"params"`/`"this"` strings, so ordinary user identifiers
    /// cannot accidentally rebind them. The core intentionally takes no
    /// dependency on a random-number crate; callers supply their own
    /// entropy (a UUID, a counter mixed with host randomness, ...).
    #[must_use]
    pub fn with_hardened_seed(nonce: &str) -> Rc<Self> {
        let state = ProviderState {
            literals: AHashMap::new(),
            names: AHashMap::new(),
            count: 0,
        };
        let mut provider = Self {
            state: std::cell::RefCell::new(state),
            unknown: Symbol::new(0),
            open: Symbol::new(0),
            close: Symbol::new(0),
            quote: Symbol::new(0),
            params: Symbol::new(0),
            this: Symbol::new(0),
            let_: Symbol::new(0),
            lambda: Symbol::new(0),
        };
        for builtin in CoreBuiltin::iter() {
            let literal = match builtin {
                CoreBuiltin::Params => format!("\u{0}params\u{0}{nonce}"),
                CoreBuiltin::This => format!("\u{0}this\u{0}{nonce}"),
                other => other.literal().to_owned(),
            };
            let symbol = provider.intern_raw(&literal, true);
            match builtin {
                CoreBuiltin::Unknown => provider.unknown = symbol,
                CoreBuiltin::Open => provider.open = symbol,
                CoreBuiltin::Close => provider.close = symbol,
                CoreBuiltin::Quote => provider.quote = symbol,
                CoreBuiltin::Params => provider.params = symbol,
                CoreBuiltin::This => provider.this = symbol,
                CoreBuiltin::Let => provider.let_ = symbol,
                CoreBuiltin::Lambda => provider.lambda = symbol,
            }
        }
        Rc::new(provider)
    }

    fn intern_raw(&self, literal: &str, as_builtin: bool) -> Symbol {
        if let Some(existing) = self.state.borrow().literals.get(literal) {
            return existing.clone();
        }
        let mut state = self.state.borrow_mut();
        let count = state.count as i32;
        let index = if as_builtin { -count } else { count };
        let symbol = Symbol::new(index);
        let literal: Rc<str> = Rc::from(literal);
        state.literals.insert(literal.clone(), symbol.clone());
        state.names.insert(index, literal);
        state.count += 1;
        symbol
    }

    /// Returns whether `literal` has already been interned.
    #[must_use]
    pub fn contains(&self, literal: &str) -> bool {
        self.state.borrow().literals.contains_key(literal)
    }

    /// Returns the existing symbol for `literal`, or allocates and returns
    /// a fresh one. `as_builtin` selects which side of the shared counter
    /// the new index is drawn from; it is ignored if `literal` already
    /// exists (an existing mapping is never rebound, per invariant I3).
    #[must_use]
    pub fn intern(&self, literal: &str, as_builtin: bool) -> Symbol {
        self.intern_raw(literal, as_builtin)
    }

    /// Returns the literal a symbol was interned from. Panics if `symbol`
    /// was never produced by this provider — that is a programmer error
    /// (spec.md §7 category 1), not a recoverable condition.
    #[must_use]
    pub fn name_of(&self, symbol: &Symbol) -> Rc<str> {
        self.state
            .borrow()
            .names
            .get(&symbol.index())
            .cloned()
            .unwrap_or_else(|| panic!("invariant violation: no literal interned for {symbol:?}"))
    }

    #[must_use]
    pub fn unknown(&self) -> Symbol {
        self.unknown.clone()
    }

    #[must_use]
    pub fn open(&self) -> Symbol {
        self.open.clone()
    }

    #[must_use]
    pub fn close(&self) -> Symbol {
        self.close.clone()
    }

    #[must_use]
    pub fn quote(&self) -> Symbol {
        self.quote.clone()
    }

    #[must_use]
    pub fn params(&self) -> Symbol {
        self.params.clone()
    }

    #[must_use]
    pub fn this(&self) -> Symbol {
        self.this.clone()
    }

    #[must_use]
    pub fn let_(&self) -> Symbol {
        self.let_.clone()
    }

    #[must_use]
    pub fn lambda(&self) -> Symbol {
        self.lambda.clone()
    }

    /// The index of `This`. Any symbol whose index is strictly below this
    /// threshold is a "dispatch builtin" the evaluator may memoize
    /// (spec.md §3, §4.5). `Open`, `Close`, `Quote`, `Params`, and `This`
    /// itself sit at or above the threshold and are handled inline by the
    /// parser/evaluator instead.
    #[must_use]
    pub fn builtin_threshold(&self) -> i32 {
        self.this.index()
    }

    /// Wraps `expr` as `[Quote, expr]`, the exact shape the parser
    /// produces for a quoted form (spec.md §6: "guaranteed exact shape").
    #[must_use]
    pub fn quote_expr(&self, expr: Sexpr) -> Sexpr {
        Sexpr::list(vec![Sexpr::Symbol(self.quote()), expr])
    }
}
