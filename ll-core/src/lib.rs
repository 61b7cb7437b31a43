//! An LL(1) parser generator over bytes.
//!
//! A [grammar::Grammar] is turned into a predictive table by [ll::Ll1] and
//! executed by [parser::Parser], producing a [cst::Cst] whose nodes carry
//! byte spans into the input.
//!
//! ```
//! use ll_core::{generate_table_from_ruleset, parser, GeneratorKind};
//!
//! let (table, names) = generate_table_from_ruleset(
//!     GeneratorKind::Ll1,
//!     r#"<Expr> ::= "A" "::=" <T>
//!        <T> ::= "C""#,
//! )
//! .unwrap();
//!
//! let (cst, names) = parser::parse(&table, &names, "A::=C").unwrap();
//! assert_eq!(names.name_of(cst.kind(cst.root())), "Expr");
//! ```

/// Writes a trace line to stderr when the `debug` feature is enabled.
macro_rules! debug {
    ($($args:tt)*) => {
        if cfg!(feature = "debug") {
            eprintln!($($args)*);
        }
    };
}

pub mod bnf;
pub mod byteset;
pub mod cst;
pub mod grammar;
pub mod ll;
pub mod parser;

use thiserror::Error;

use cst::Cst;
use grammar::{Grammar, GrammarLoadError};
use ll::{GrammarError, LlTable, NameMap, NodeKind};
use parser::{ParseError, Parser, TableError};

/// Represents the kind of table that can be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// LL(1) with a single byte of lookahead.
    Ll1,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("grammar load error: {0}")]
    GrammarLoad(#[from] GrammarLoadError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("input error: {0}")]
    Input(#[from] std::io::Error),
}

impl Error {
    /// The input offset of a parse error, if this is one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Parse(err) => Some(err.position()),
            _ => None,
        }
    }
}

pub fn generate_table_from_grammar(
    kind: GeneratorKind,
    grammar: &Grammar,
) -> Result<(LlTable, NameMap), Error> {
    match kind {
        GeneratorKind::Ll1 => {
            use crate::ll::LlTableGenerator;

            crate::ll::Ll1::generate_table(grammar).map_err(Error::from)
        }
    }
}

/// Loads a grammar from BNF text and generates its table.
pub fn generate_table_from_ruleset<G: AsRef<str>>(
    kind: GeneratorKind,
    grammar: G,
) -> Result<(LlTable, NameMap), Error> {
    let grammar = grammar::load_grammar(grammar)?;

    generate_table_from_grammar(kind, &grammar)
}

/// Implemented by `#[derive(Ll1)]` for enums whose variants name the rules
/// of a grammar.
pub trait Ll1Parseable: Sized {
    /// The parser generated for the enum's grammar.
    fn parser() -> &'static Parser;

    /// Maps a CST node kind back to the variant of the rule it was produced
    /// by.
    fn from_node_kind(kind: NodeKind) -> Option<Self>;

    fn parse_input<I: AsRef<[u8]>>(input: I) -> Result<Cst, Error> {
        Self::parser().parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_surface_grammar_load_errors() {
        let err = generate_table_from_ruleset(GeneratorKind::Ll1, "<A> :: \"a\"").unwrap_err();

        assert!(matches!(err, Error::GrammarLoad(_)));
        assert_eq!(err.position(), None);
    }

    #[test]
    fn should_surface_generation_errors() {
        let err = generate_table_from_ruleset(GeneratorKind::Ll1, "<A> ::= <B>").unwrap_err();

        assert!(matches!(
            err,
            Error::Grammar(GrammarError::UndefinedNonTerminal(ref name)) if name == "B"
        ));
    }

    #[test]
    fn should_expose_position_of_parse_errors() {
        let (table, names) = generate_table_from_ruleset(GeneratorKind::Ll1, "<A> ::= \"ab\"").unwrap();
        let err = parser::parse(&table, &names, "ax").unwrap_err();

        assert_eq!(err.position(), Some(1));
    }
}
