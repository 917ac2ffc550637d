//! The S-expression node type and first-class closures.
//!
//! An `Sexpr` is either an atom (including the nil atom, numbers, strings,
//! symbols, closures, and opaque host values), a list, or a memoized-builtin
//! cell produced internally by the evaluator (spec.md §3). Lists are
//! mutable in place — the evaluator overwrites individual slots with
//! resolved closures and memoized cells as an optimization — but their
//! shape never changes after parsing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::environment::Environment;
use crate::symbol::Symbol;

/// A shared, interior-mutable list of `Sexpr` nodes. Aliased across
/// closures that captured the same body expression, which is exactly what
/// lets builtin-memoization rewrites (spec.md §4.5) be observed on every
/// subsequent evaluation of that physical list.
pub type SexprList = Rc<RefCell<Vec<Sexpr>>>;

/// A node in an S-expression tree.
#[derive(Clone)]
pub enum Sexpr {
    /// The nil/null atom — also the value of an empty `let` body.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Symbol(Symbol),
    /// A first-class callable, user-created (`lambda`) or wrapping a host
    /// function.
    Closure(Closure),
    /// An opaque host value the evaluator never inspects, only carries.
    Opaque(Rc<dyn std::any::Any>),
    List(SexprList),
    /// A resolved builtin, memoized into a list slot in place of the
    /// `Symbol` that used to live there. Never produced by the parser.
    BuiltinCell(Closure),
}

impl Sexpr {
    /// Convenience constructor for a fresh, independently-owned list.
    #[must_use]
    pub fn list(items: Vec<Sexpr>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// The canonical empty list.
    #[must_use]
    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    #[must_use]
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// True for every node that is not a `List` — the spec's definition of
    /// "atom" (spec.md §3 includes `BuiltinCell` values as atoms too, since
    /// a memoized cell only ever replaces an atomic slot).
    #[must_use]
    pub fn is_atom(&self) -> bool {
        !matches!(self, Self::List(_))
    }

    /// Deep-copies the tree: every `List` node gets a fresh `Rc<RefCell<_>>`
    /// backing, recursively, so slot rewrites performed while evaluating
    /// this copy never reach the original. Atoms are shallow-cloned —
    /// nothing ever mutates *inside* a `Closure`, `Str`, or `Opaque` value,
    /// only list slots are ever overwritten (spec.md §4.5).
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::List(list) => {
                let copied: Vec<Sexpr> = list.borrow().iter().map(Sexpr::deep_copy).collect();
                Self::list(copied)
            }
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Symbol(s) => write!(f, "{s:?}"),
            Self::Closure(_) => write!(f, "<closure>"),
            Self::Opaque(_) => write!(f, "<opaque>"),
            Self::BuiltinCell(_) => write!(f, "<builtin>"),
            Self::List(list) => {
                write!(f, "(")?;
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Symbol(s) => write!(f, "#{}", s.index()),
            Self::Closure(_) | Self::BuiltinCell(_) => write!(f, "<closure>"),
            Self::Opaque(_) => write!(f, "<opaque>"),
            Self::List(list) => {
                write!(f, "(")?;
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

type ClosureFn = dyn Fn(&Environment, &[Sexpr]) -> Sexpr;

/// A first-class, two-argument callable `(environment, args) -> value`
/// (spec.md §3). Created by `lambda` and by the evaluator when it wraps a
/// resolved builtin into a [`Sexpr::BuiltinCell`].
#[derive(Clone)]
pub struct Closure(Rc<ClosureFn>);

impl Closure {
    /// Wraps a plain Rust closure as a `Closure`.
    pub fn native(f: impl Fn(&Environment, &[Sexpr]) -> Sexpr + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the closure with the given environment and argument vector.
    /// For a memoized builtin cell the "args" are the entire list the cell
    /// lives in (spec.md §4.5); for an applicative call they are the
    /// already-evaluated trailing elements.
    pub fn call(&self, env: &Environment, args: &[Sexpr]) -> Sexpr {
        (self.0)(env, args)
    }

    /// True if `a` and `b` share the same underlying callable — used by
    /// the `this` self-reference identity test (spec.md §8 scenario 4).
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn downgrade(&self) -> WeakClosure {
        WeakClosure(Rc::downgrade(&self.0))
    }
}

/// A non-owning handle to a [`Closure`], used to let a lambda capture a
/// reference back to itself (for `this`) without creating a reference
/// cycle through the environment it also captures (spec.md §9).
#[derive(Clone)]
pub(crate) struct WeakClosure(Weak<ClosureFn>);

impl WeakClosure {
    pub(crate) fn upgrade(&self) -> Option<Closure> {
        self.0.upgrade().map(Closure)
    }
}
