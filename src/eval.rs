//! The evaluator: reduction rules over S-expression trees, the
//! prefix/infix builtin-memoization rewrite, and the `let`/`lambda`
//! builtins (spec.md §4.5).

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::environment::Environment;
use crate::intern::SymbolProvider;
use crate::parse::{ParseError, Parser, Tokenizer};
use crate::sexpr::{Closure, Sexpr, SexprList, WeakClosure};
use crate::symbol::Symbol;

/// The reduction engine, holding only what reduction needs: the shared
/// symbol provider. Kept separate from [`Evaluator`] (which additionally
/// owns a tokenizer) so that `let`/`lambda` builtin closures can capture a
/// cheap clone of a `Reducer` and call back into it recursively without
/// the closure having to reach back through an `Evaluator` it doesn't own.
#[derive(Clone)]
pub struct Reducer {
    provider: Rc<SymbolProvider>,
}

impl Reducer {
    #[must_use]
    pub fn new(provider: Rc<SymbolProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn provider(&self) -> &Rc<SymbolProvider> {
        &self.provider
    }

    /// Installs the `Let` and `Lambda` builtins into `env` if not already
    /// present. The base contract guarantees these two always exist;
    /// derived interpreters chain further `set` calls of their own
    /// (spec.md §6).
    pub fn install_core_builtins(&self, env: &Environment) {
        let let_symbol = self.provider.let_();
        if !env.contains_symbol(&let_symbol) {
            env.set(let_symbol, Sexpr::Closure(self.make_let_builtin()));
        }
        let lambda_symbol = self.provider.lambda();
        if !env.contains_symbol(&lambda_symbol) {
            env.set(lambda_symbol, Sexpr::Closure(self.make_lambda_builtin()));
        }
    }

    /// Reduces one S-expression node (spec.md §4.5).
    #[must_use]
    pub fn reduce(&self, env: &Environment, expr: &Sexpr) -> Sexpr {
        match expr {
            Sexpr::Symbol(symbol) => env
                .try_get_symbol(symbol)
                .unwrap_or_else(|| Sexpr::Symbol(self.provider.unknown())),
            Sexpr::List(list) => self.reduce_list(env, list),
            // Atoms other than symbols and lists are self-evaluating,
            // including an already-resolved Closure/BuiltinCell.
            other => other.clone(),
        }
    }

    fn reduce_list(&self, env: &Environment, list: &SexprList) -> Sexpr {
        let len = list.borrow().len();
        if len == 0 {
            return Sexpr::empty_list();
        }
        if len == 1 {
            return self.apply_singleton(env, list);
        }

        // Quote form: `(Quote inner)` returns `inner` unevaluated.
        if let Sexpr::Symbol(symbol) = &list.borrow()[0] {
            if symbol.index() == self.provider.quote().index() {
                return list.borrow()[1].clone();
            }
        }

        if let Some(position) = memoized_position(list) {
            let closure = extract_builtin(&list.borrow()[position]);
            let args = list.borrow().clone();
            return closure.call(env, &args);
        }

        if let Some(position) = self.dispatch_builtin_position(list) {
            let symbol = match &list.borrow()[position] {
                Sexpr::Symbol(s) => s.clone(),
                _ => unreachable!("dispatch_builtin_position only returns Symbol slots"),
            };
            let resolved = self.reduce(env, &Sexpr::Symbol(symbol));
            if let Sexpr::Closure(closure) = resolved {
                list.borrow_mut()[position] = Sexpr::BuiltinCell(closure.clone());
                let args = list.borrow().clone();
                return closure.call(env, &args);
            }
            // The symbol didn't resolve to a callable; fall through to the
            // remaining reduction rules rather than memoizing nothing.
        }

        if let Some((closure, needs_rewrite)) = self.resolve_applicative_head(env, list) {
            if needs_rewrite {
                list.borrow_mut()[0] = Sexpr::Closure(closure.clone());
            }
            let raw_args = list.borrow()[1..].to_vec();
            let args: Vec<Sexpr> = raw_args.iter().map(|arg| self.reduce(env, arg)).collect();
            return closure.call(env, &args);
        }

        // Sequence fallback: evaluate every element left-to-right, return
        // the last one's value.
        let items = list.borrow().clone();
        let mut last = Sexpr::Nil;
        for item in &items {
            last = self.reduce(env, item);
        }
        last
    }

    fn apply_singleton(&self, env: &Environment, list: &SexprList) -> Sexpr {
        let element = list.borrow()[0].clone();
        let symbol = match element {
            Sexpr::BuiltinCell(closure) | Sexpr::Closure(closure) => return closure.call(env, &[]),
            Sexpr::Symbol(symbol) => symbol,
            other => return other,
        };
        let is_dispatch_builtin = symbol.index() < self.provider.builtin_threshold();
        let resolved = self.reduce(env, &Sexpr::Symbol(symbol));
        let Sexpr::Closure(closure) = &resolved else {
            return resolved;
        };
        list.borrow_mut()[0] = if is_dispatch_builtin {
            Sexpr::BuiltinCell(closure.clone())
        } else {
            Sexpr::Closure(closure.clone())
        };
        closure.call(env, &[])
    }

    /// Checks whether `list[0]` or `list[1]` is a `Symbol` below the
    /// builtin threshold, preferring the prefix position (index 0).
    fn dispatch_builtin_position(&self, list: &SexprList) -> Option<usize> {
        let threshold = self.provider.builtin_threshold();
        let borrowed = list.borrow();
        if is_dispatch_symbol(&borrowed[0], threshold) {
            return Some(0);
        }
        if is_dispatch_symbol(&borrowed[1], threshold) {
            return Some(1);
        }
        None
    }

    /// Whether `list[0]` resolves to a closure directly, or by reducing it
    /// once — the "applicative call" rule (spec.md §4.5).
    fn resolve_applicative_head(&self, env: &Environment, list: &SexprList) -> Option<(Closure, bool)> {
        let head = list.borrow()[0].clone();
        if let Sexpr::Closure(closure) = head {
            return Some((closure, false));
        }
        let resolved = self.reduce(env, &head);
        if let Sexpr::Closure(closure) = resolved {
            return Some((closure, true));
        }
        None
    }

    fn make_let_builtin(&self) -> Closure {
        let reducer = self.clone();
        Closure::native(move |env, args| {
            let scope = env.child();
            if let Some(Sexpr::List(bindings)) = args.get(1) {
                for binding in bindings.borrow().iter() {
                    if let Sexpr::List(pair) = binding {
                        let pair = pair.borrow();
                        if pair.len() >= 2 {
                            if let Sexpr::Symbol(symbol) = &pair[0] {
                                let value = reducer.reduce(&scope, &pair[1]);
                                scope.set(symbol.clone(), value);
                            }
                        }
                    }
                }
            }
            let mut result = Sexpr::Nil;
            for body_expr in args.iter().skip(2) {
                result = reducer.reduce(&scope, body_expr);
            }
            result
        })
    }

    fn make_lambda_builtin(&self) -> Closure {
        let reducer = self.clone();
        Closure::native(move |env, args| {
            let formals_expr = args.get(1).cloned().unwrap_or(Sexpr::Nil);
            let body_expr = args.get(2).cloned().unwrap_or(Sexpr::Nil);
            let (positional, variadic) = parse_formals(&formals_expr);
            build_lambda_closure(reducer.clone(), env.clone(), positional, variadic, body_expr)
        })
    }
}

fn is_dispatch_symbol(slot: &Sexpr, threshold: i32) -> bool {
    matches!(slot, Sexpr::Symbol(symbol) if symbol.index() < threshold)
}

/// Returns the slot index (0 or 1) holding an already-memoized builtin
/// cell, if any.
fn memoized_position(list: &SexprList) -> Option<usize> {
    let borrowed = list.borrow();
    if matches!(borrowed[0], Sexpr::BuiltinCell(_)) {
        return Some(0);
    }
    if matches!(borrowed[1], Sexpr::BuiltinCell(_)) {
        return Some(1);
    }
    None
}

fn extract_builtin(slot: &Sexpr) -> Closure {
    match slot {
        Sexpr::BuiltinCell(closure) => closure.clone(),
        _ => unreachable!("memoized_position only returns BuiltinCell slots"),
    }
}

/// Parses a `lambda` formals expression: either a single `Symbol` (a
/// one-element parameter list) or a list of `Symbol`s whose final entry
/// may itself be wrapped in a one-element list to mark the variadic
/// parameter (spec.md §4.5).
fn parse_formals(expr: &Sexpr) -> (SmallVec<[Symbol; 4]>, Option<Symbol>) {
    match expr {
        Sexpr::Symbol(symbol) => {
            let mut positional = SmallVec::new();
            positional.push(symbol.clone());
            (positional, None)
        }
        Sexpr::List(list) => {
            let items = list.borrow();
            let mut positional = SmallVec::new();
            let mut variadic = None;
            let last_index = items.len().checked_sub(1);
            for (i, item) in items.iter().enumerate() {
                let is_last = last_index == Some(i);
                match item {
                    Sexpr::Symbol(symbol) => positional.push(symbol.clone()),
                    Sexpr::List(inner) if is_last && inner.borrow().len() == 1 => {
                        if let Sexpr::Symbol(symbol) = &inner.borrow()[0] {
                            variadic = Some(symbol.clone());
                        }
                    }
                    _ => {}
                }
            }
            (positional, variadic)
        }
        _ => (SmallVec::new(), None),
    }
}

/// Builds the closure `lambda` produces: a fresh scope parented by the
/// *defining* environment (lexical capture), positional formals bound in
/// order (missing ones default to `Unknown`), the variadic formal (if any)
/// collecting excess arguments (`Unknown` if there are none — spec.md §9's
/// chosen resolution of that ambiguity), `This` bound back to the closure
/// itself, and `Params` bound to the raw argument vector.
fn build_lambda_closure(
    reducer: Reducer,
    defining_env: Environment,
    positional: SmallVec<[Symbol; 4]>,
    variadic: Option<Symbol>,
    body: Sexpr,
) -> Sexpr {
    let self_ref: Rc<RefCell<Option<WeakClosure>>> = Rc::new(RefCell::new(None));
    let self_ref_for_body = self_ref.clone();
    let closure = Closure::native(move |_call_env, call_args| {
        let scope = defining_env.child();
        let unknown = Sexpr::Symbol(reducer.provider().unknown());

        for (i, formal) in positional.iter().enumerate() {
            let value = call_args.get(i).cloned().unwrap_or_else(|| unknown.clone());
            scope.set(formal.clone(), value);
        }

        if let Some(variadic_symbol) = &variadic {
            let value = if call_args.len() > positional.len() {
                Sexpr::list(call_args[positional.len()..].to_vec())
            } else {
                unknown.clone()
            };
            scope.set(variadic_symbol.clone(), value);
        }

        let this_closure = self_ref_for_body
            .borrow()
            .as_ref()
            .and_then(WeakClosure::upgrade)
            .expect("lambda self-reference installed before first call");
        scope.set(reducer.provider().this(), Sexpr::Closure(this_closure));
        scope.set(reducer.provider().params(), Sexpr::list(call_args.to_vec()));

        reducer.reduce(&scope, &body)
    });
    *self_ref.borrow_mut() = Some(closure.downgrade());
    Sexpr::Closure(closure)
}

/// Owns a tokenizer and the builtin-install hook, wiring [`Parser`] and
/// [`Reducer`] into the public `Parse`/`Evaluate` operations (spec.md §6).
pub struct Evaluator<T: Tokenizer> {
    reducer: Reducer,
    tokenizer: T,
    install_hook: Option<Box<dyn Fn(&Environment)>>,
}

impl<T: Tokenizer> Evaluator<T> {
    /// Builds an evaluator over a freshly strict-seeded `SymbolProvider`.
    #[must_use]
    pub fn new(tokenizer: T) -> Self {
        Self::with_provider(SymbolProvider::with_core_seed(), tokenizer)
    }

    #[must_use]
    pub fn with_provider(provider: Rc<SymbolProvider>, tokenizer: T) -> Self {
        Self {
            reducer: Reducer::new(provider),
            tokenizer,
            install_hook: None,
        }
    }

    /// Registers the builtin-install seam: run once per `evaluate` call,
    /// after the core `Let`/`Lambda` builtins are installed, so derived
    /// interpreters can chain in arithmetic, comparison, I/O, ... builtins
    /// of their own (spec.md §6).
    #[must_use]
    pub fn with_install_hook(mut self, hook: impl Fn(&Environment) + 'static) -> Self {
        self.install_hook = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn provider(&self) -> &Rc<SymbolProvider> {
        self.reducer.provider()
    }

    /// Creates a fresh root environment over this evaluator's provider,
    /// with only the core `Let`/`Lambda` builtins populated. The
    /// install-hook seam is deliberately *not* run here: it belongs to
    /// `Evaluate` alone (spec.md §6: "the hook runs once per `Evaluate`, at
    /// the scope of evaluation"), so a caller that only wants a root scope
    /// to parse against never pays for it.
    #[must_use]
    pub fn root_environment(&self) -> Environment {
        let env = Environment::root(self.reducer.provider().clone());
        self.reducer.install_core_builtins(&env);
        env
    }

    /// `Parse(input) -> sexpr`, parsing against a fresh root environment.
    /// Never runs the install hook — parsing never touches `Let`/`Lambda`
    /// or any user builtin, only the structural tokens the tokenizer
    /// resolves.
    pub fn parse(&self, input: &str) -> Result<Sexpr, ParseError> {
        let env = self.root_environment();
        self.parse_in(&env, input)
    }

    /// `Parse(context, input) -> sexpr`.
    pub fn parse_in(&self, env: &Environment, input: &str) -> Result<Sexpr, ParseError> {
        Parser::parse(&self.tokenizer, env, input)
    }

    /// `Evaluate(input) -> value`, against a fresh root environment.
    pub fn evaluate(&self, input: &str) -> Result<Sexpr, ParseError> {
        let env = self.root_environment();
        self.evaluate_in(&env, input)
    }

    /// `Evaluate(env, input) -> value`: parses `input` in `env`'s context,
    /// deep-copies the parsed tree, ensures the builtin-install hook has
    /// run at this scope, then reduces the copy. The parse artifact itself
    /// — what `parse_in` would have returned — is left untouched, so a
    /// caller may parse once and evaluate many times.
    pub fn evaluate_in(&self, env: &Environment, input: &str) -> Result<Sexpr, ParseError> {
        let parsed = self.parse_in(env, input)?;
        Ok(self.evaluate_sexpr(env, &parsed))
    }

    /// `Evaluate(env, sexpr) -> value`: installs the core builtins (a
    /// no-op if `env` already has them) and runs the derived-interpreter
    /// install hook exactly once, then deep-copies `sexpr` before reducing
    /// it, so the caller's own tree (e.g. one returned by `parse`) is never
    /// mutated by the reduction's memoization rewrites.
    #[must_use]
    pub fn evaluate_sexpr(&self, env: &Environment, sexpr: &Sexpr) -> Sexpr {
        self.reducer.install_core_builtins(env);
        if let Some(hook) = &self.install_hook {
            hook(env);
        }
        let copy = sexpr.deep_copy();
        self.reducer.reduce(env, &copy)
    }
}
