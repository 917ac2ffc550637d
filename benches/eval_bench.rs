//! Benchmarks the payoff of builtin-memoization (spec.md §4.5): a repeated
//! call through a dispatch-builtin form (`let`) should get cheaper after
//! its first reduction rewrites the symbol slot into a `BuiltinCell`,
//! compared to a reduction path that never gets to memoize.

use criterion::{black_box, criterion_group, criterion_main, Bencher, Criterion};
use wisp::{Environment, Evaluator, Sexpr, TokenOutcome, Tokenizer};

struct AsciiTokenizer;

impl Tokenizer for AsciiTokenizer {
    fn next_token(&self, root: &Environment, input: &str, offset: usize) -> TokenOutcome {
        let rest = &input[offset..];
        let skipped = rest.len() - rest.trim_start().len();
        let rest = rest.trim_start();
        if rest.is_empty() {
            return TokenOutcome::EndOfInput;
        }
        let first = rest.chars().next().expect("rest is non-empty");
        match first {
            '(' => TokenOutcome::Token(Sexpr::Symbol(root.provider().open()), skipped + 1),
            ')' => TokenOutcome::Token(Sexpr::Symbol(root.provider().close()), skipped + 1),
            '`' => TokenOutcome::Token(Sexpr::Symbol(root.provider().quote()), skipped + 1),
            c if c.is_ascii_digit() || (c == '-' && rest.chars().nth(1).is_some_and(|d| d.is_ascii_digit())) => {
                lex_number(rest, skipped)
            }
            c if !c.is_whitespace() && c != '(' && c != ')' && c != '`' => lex_symbol(root, rest, skipped),
            _ => TokenOutcome::Unknown,
        }
    }
}

fn lex_number(rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
        .count();
    match rest[..len].parse::<i64>() {
        Ok(i) => TokenOutcome::Token(Sexpr::Int(i), skipped + len),
        Err(_) => TokenOutcome::Unknown,
    }
}

fn lex_symbol(root: &Environment, rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest
        .char_indices()
        .take_while(|(_, c)| !c.is_whitespace() && *c != '(' && *c != ')' && *c != '`')
        .count();
    let symbol = root.provider().intern(&rest[..len], false);
    TokenOutcome::Token(Sexpr::Symbol(symbol), skipped + len)
}

fn install_plus(env: &Environment) {
    let symbol = env.provider().intern("+", false);
    env.set(
        symbol,
        Sexpr::Closure(wisp::Closure::native(|_env, args| {
            let mut acc = 0i64;
            for arg in args {
                if let Sexpr::Int(n) = arg {
                    acc += n;
                }
            }
            Sexpr::Int(acc)
        })),
    );
}

/// Runs `code` under a fresh root environment once to warm the memoization
/// rewrite, then repeatedly re-evaluates the same parsed artifact.
fn run_memoized(bench: &mut Bencher, code: &str, expected: i64) {
    let evaluator = Evaluator::new(AsciiTokenizer).with_install_hook(install_plus);
    let env = evaluator.root_environment();
    let parsed = evaluator.parse_in(&env, code).expect("benchmark source must parse");

    let warmup = evaluator.evaluate_sexpr(&env, &parsed);
    assert!(matches!(warmup, Sexpr::Int(n) if n == expected));

    bench.iter(|| {
        let result = evaluator.evaluate_sexpr(&env, &parsed);
        black_box(result);
    });
}

const LET_ADD_TWO_LOCALS: &str = "(let ((x 1) (y 2)) (+ x y))";

const NESTED_LET_CHAIN: &str = "
(let ((a 1))
  (let ((b (+ a 1)))
    (let ((c (+ b 1)))
      (+ a (+ b c)))))
";

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("let_add_two_locals", |b| run_memoized(b, LET_ADD_TWO_LOCALS, 3));
    c.bench_function("nested_let_chain", |b| run_memoized(b, NESTED_LET_CHAIN, 6));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
