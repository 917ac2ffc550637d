//! A tiny worked-example interpreter built on the `wisp` core.
//!
//! This binary is the "derived interpreter" the library's spec treats as
//! an external collaborator: none of the tokenizing rules or arithmetic
//! builtins below live in the library itself, only in this file. It
//! recognizes integers, floats, double-quoted strings, bare symbols, and
//! the three structural tokens `(`, `)`, `` ` ``, plus whitespace.

use std::io::{self, Write};
use std::process::ExitCode;

use wisp::{Environment, Evaluator, ParseError, Sexpr, TokenOutcome, Tokenizer};

struct AsciiTokenizer;

impl Tokenizer for AsciiTokenizer {
    fn next_token(&self, root: &Environment, input: &str, offset: usize) -> TokenOutcome {
        let rest = &input[offset..];
        let skipped = rest.len() - rest.trim_start().len();
        let rest = rest.trim_start();
        if rest.is_empty() {
            return TokenOutcome::EndOfInput;
        }

        let mut chars = rest.char_indices();
        let (_, first) = chars.next().expect("rest is non-empty");

        match first {
            '(' => TokenOutcome::Token(Sexpr::Symbol(root.provider().open()), skipped + 1),
            ')' => TokenOutcome::Token(Sexpr::Symbol(root.provider().close()), skipped + 1),
            '`' => TokenOutcome::Token(Sexpr::Symbol(root.provider().quote()), skipped + 1),
            '"' => lex_string(rest, skipped),
            c if c.is_ascii_digit() || (c == '-' && rest.chars().nth(1).is_some_and(|d| d.is_ascii_digit())) => {
                lex_number(rest, skipped)
            }
            c if is_symbol_start(c) => lex_symbol(root, rest, skipped),
            _ => TokenOutcome::Unknown,
        }
    }
}

fn is_symbol_start(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '`' && c != '"'
}

fn lex_string(rest: &str, skipped: usize) -> TokenOutcome {
    let mut end = None;
    for (i, c) in rest.char_indices().skip(1) {
        if c == '"' {
            end = Some(i);
            break;
        }
    }
    match end {
        Some(end) => TokenOutcome::Token(Sexpr::str(&rest[1..end]), skipped + end + 1),
        None => TokenOutcome::Unknown,
    }
}

fn lex_number(rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
        .count();
    let text = &rest[..len];
    if let Ok(i) = text.parse::<i64>() {
        return TokenOutcome::Token(Sexpr::Int(i), skipped + len);
    }
    match text.parse::<f64>() {
        Ok(f) => TokenOutcome::Token(Sexpr::Float(f), skipped + len),
        Err(_) => TokenOutcome::Unknown,
    }
}

fn lex_symbol(root: &Environment, rest: &str, skipped: usize) -> TokenOutcome {
    let len = rest.char_indices().take_while(|(_, c)| is_symbol_start(*c)).count();
    let text = &rest[..len];
    let symbol = root.provider().intern(text, false);
    TokenOutcome::Token(Sexpr::Symbol(symbol), skipped + len)
}

/// Installs `+`, `-`, `*` as left-folding arithmetic builtins over `Int`
/// arguments, demonstrating the builtin-install hook.
fn install_arithmetic(env: &Environment) {
    install_fold(env, "+", 0, |a, b| a + b);
    install_fold(env, "-", 0, |a, b| a - b);
    install_fold(env, "*", 1, |a, b| a * b);
}

fn install_fold(env: &Environment, literal: &str, identity: i64, op: fn(i64, i64) -> i64) {
    let symbol = env.provider().intern(literal, false);
    env.set(
        symbol,
        Sexpr::Closure(wisp::Closure::native(move |_env, args| {
            let mut acc = identity;
            for (i, arg) in args.iter().enumerate() {
                let Sexpr::Int(n) = arg else { continue };
                acc = if i == 0 { *n } else { op(acc, *n) };
            }
            Sexpr::Int(acc)
        })),
    );
}

fn main() -> ExitCode {
    let evaluator = Evaluator::new(AsciiTokenizer).with_install_hook(install_arithmetic);
    let args: Vec<String> = std::env::args().collect();

    if let Some(path) = args.get(1) {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                eprintln!("error reading {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        return match evaluator.evaluate(&source) {
            Ok(value) => {
                println!("{value}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    let env = evaluator.root_environment();
    loop {
        print!(">>> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            println!();
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match evaluator.evaluate_in(&env, &line) {
            Ok(value) => println!("{value}"),
            Err(err) => report_parse_error(&err),
        }
    }
    ExitCode::SUCCESS
}

fn report_parse_error(err: &ParseError) {
    eprintln!("{err}");
}
