//! Shared tokenizer for integration tests. Lives under `tests/support/` (not
//! directly in `tests/`) so cargo doesn't treat it as its own test binary.

use wisp::{Environment, Sexpr, TokenOutcome, Tokenizer};

pub struct AsciiTokenizer;

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
            c if is_symbol_start(c) => lex_symbol(root, rest, skipped),
            _ => TokenOutcome::Unknown,
        }
    }
}

fn is_symbol_start(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '`'
}

fn lex_number(rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
        .count();
    let text = &rest[..len];
    match text.parse::<i64>() {
        Ok(i) => TokenOutcome::Token(Sexpr::Int(i), skipped + len),
        Err(_) => TokenOutcome::Unknown,
    }
}

fn lex_symbol(root: &Environment, rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest.char_indices().take_while(|(_, c)| is_symbol_start(*c)).count();
    let text = &rest[..len];
    let symbol = root.provider().intern(text, false);
    TokenOutcome::Token(Sexpr::Symbol(symbol), skipped + len)
}

/// Installs `+` as an arithmetic builtin over already-reduced `Int`
/// arguments, the only builtin most evaluator tests need beyond the core
/// `let`/`lambda`. Reached only through the applicative-call rule (its
/// literal interns to a positive, non-builtin index), so `args` never
/// includes the leading `+` symbol itself.
pub fn install_plus(env: &Environment) {
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
