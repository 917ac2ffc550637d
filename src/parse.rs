//! Recursive-descent S-expression parser driven by an externally supplied
//! tokenizer (spec.md §4.4, §6). The core parses *shapes*, not tokens: it
//! knows nothing about a concrete surface syntax, only how to assemble
//! whatever atoms a [`Tokenizer`] hands it into quoted forms, lists, and
//! bare atoms.

use std::fmt;

use crate::environment::Environment;
use crate::sexpr::Sexpr;

/// What a [`Tokenizer`] reports for one call at a given offset.
pub enum TokenOutcome {
    /// A recognized token, plus how many input characters it consumed.
    /// `matched_len` must be positive.
    Token(Sexpr, usize),
    /// An unrecognized character at the current offset (zero-width).
    Unknown,
    /// No more tokens.
    EndOfInput,
}

/// The lexing seam a derived interpreter plugs in. `root` carries the
/// ambient root environment (and thus the shared `SymbolProvider`) so the
/// tokenizer can intern identifiers as it recognizes them. Implementations
/// are responsible for silently skipping whitespace by bumping the offset
/// before reporting a token (spec.md §4.4).
pub trait Tokenizer {
    fn next_token(&self, root: &Environment, input: &str, offset: usize) -> TokenOutcome;
}

/// A parse failure: well-formedness is checked eagerly and reported with
/// the offending character/offset, distinct from the evaluator's "soft"
/// failures which become values instead (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The tokenizer reported an unrecognized character.
    UnexpectedChar { offset: usize, ch: char },
    /// Input ended before a well-formed S-expression (or a list's closing
    /// token) was seen.
    UnexpectedEndOfInput { offset: usize },
    /// A `)` appeared where an expression was expected, with no matching
    /// `(` having been opened.
    UnmatchedClose { offset: usize },
    /// Extra tokens followed a complete top-level expression.
    TrailingInput { offset: usize },
}

impl ParseError {
    fn unexpected_char(input: &str, offset: usize) -> Self {
        let ch = input[offset..].chars().next().unwrap_or('\u{0}');
        Self::UnexpectedChar { offset, ch }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { offset, ch } => {
                write!(f, "unexpected character {ch:?} at offset {offset}")
            }
            Self::UnexpectedEndOfInput { offset } => {
                write!(f, "unexpected end of input at offset {offset}")
            }
            Self::UnmatchedClose { offset } => {
                write!(f, "unmatched ')' at offset {offset}")
            }
            Self::TrailingInput { offset } => {
                write!(f, "trailing input at offset {offset}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent consumer of a token stream:
/// ```text
/// sexpr  := quoted | list | atom
/// quoted := QUOTE sexpr                ; yields (Quote, sexpr)
/// list   := OPEN sexpr* CLOSE          ; yields [sexpr, ...]
/// atom   := any non-structural token
/// ```
pub struct Parser<'a, T: Tokenizer> {
    tokenizer: &'a T,
    root: &'a Environment,
    input: &'a str,
    offset: usize,
}

impl<'a, T: Tokenizer> Parser<'a, T> {
    /// Parses exactly one S-expression from `input`, then requires
    /// end-of-input; trailing tokens are a parse error.
    pub fn parse(tokenizer: &'a T, root: &'a Environment, input: &'a str) -> Result<Sexpr, ParseError> {
        let mut parser = Self {
            tokenizer,
            root,
            input,
            offset: 0,
        };
        let expr = parser.parse_sexpr()?;
        parser.expect_end()?;
        Ok(expr)
    }

    fn next_token(&mut self) -> Result<Option<Sexpr>, ParseError> {
        match self.tokenizer.next_token(self.root, self.input, self.offset) {
            TokenOutcome::Token(token, matched_len) => {
                self.offset += matched_len;
                Ok(Some(token))
            }
            TokenOutcome::EndOfInput => Ok(None),
            TokenOutcome::Unknown => Err(ParseError::unexpected_char(self.input, self.offset)),
        }
    }

    fn parse_sexpr(&mut self) -> Result<Sexpr, ParseError> {
        let offset_before = self.offset;
        let token = self
            .next_token()?
            .ok_or(ParseError::UnexpectedEndOfInput { offset: offset_before })?;
        self.dispatch(token)
    }

    /// Routes one already-consumed token: `(` opens a list, `` ` `` quotes
    /// the following expression, `)` with nothing open is an error, and
    /// everything else is a bare atom.
    fn dispatch(&mut self, token: Sexpr) -> Result<Sexpr, ParseError> {
        if let Sexpr::Symbol(symbol) = &token {
            let provider = self.root.provider().clone();
            if symbol.index() == provider.quote().index() {
                let inner = self.parse_sexpr()?;
                return Ok(provider.quote_expr(inner));
            }
            if symbol.index() == provider.open().index() {
                return self.parse_list();
            }
            if symbol.index() == provider.close().index() {
                return Err(ParseError::UnmatchedClose { offset: self.offset });
            }
        }
        Ok(token)
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let close_index = self.root.provider().close().index();
        let mut items = Vec::new();
        loop {
            let offset_before = self.offset;
            let token = self
                .next_token()?
                .ok_or(ParseError::UnexpectedEndOfInput { offset: offset_before })?;
            if let Sexpr::Symbol(symbol) = &token {
                if symbol.index() == close_index {
                    return Ok(Sexpr::list(items));
                }
            }
            items.push(self.dispatch(token)?);
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.tokenizer.next_token(self.root, self.input, self.offset) {
            TokenOutcome::EndOfInput => Ok(()),
            TokenOutcome::Token(..) => Err(ParseError::TrailingInput { offset: self.offset }),
            TokenOutcome::Unknown => Err(ParseError::unexpected_char(self.input, self.offset)),
        }
    }
}
