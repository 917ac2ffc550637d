#![doc = include_str!("../README.md")]
#![expect(clippy::module_name_repetitions, reason = "public names mirror module names on purpose")]

mod environment;
mod eval;
mod intern;
mod parse;
mod sexpr;
mod symbol;

pub use crate::environment::Environment;
pub use crate::eval::Evaluator;
pub use crate::intern::SymbolProvider;
pub use crate::parse::{ParseError, Parser, TokenOutcome, Tokenizer};
pub use crate::sexpr::{Closure, Sexpr, SexprList};
pub use crate::symbol::Symbol;
