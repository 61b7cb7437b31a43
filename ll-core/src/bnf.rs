//! The BNF notation grammars are written in, described in its own terms.
//!
//! ```text
//! <syntax>          ::= <line> <more-lines>
//! <more-lines>      ::= "" | <EOL> <line> <more-lines>
//! <line>            ::= <opt-whitespace> <opt-content>
//! <opt-content>     ::= <content> | ""
//! <content>         ::= "<" <rule-name> ">" <opt-whitespace> "::=" <opt-whitespace> <expression>
//! <expression>      ::= <list> <expression-tail>
//! <expression-tail> ::= "" | "|" <opt-whitespace> <list> <expression-tail>
//! <list>            ::= <term> <opt-whitespace> <list-tail>
//! <list-tail>       ::= "" | <term> <opt-whitespace> <list-tail>
//! <term>            ::= <literal> | "<" <rule-name> ">"
//! <literal>         ::= '"' <text1> '"' | "'" <text2> "'"
//! <text1>           ::= "" | <character1> <text1>
//! <text2>           ::= "" | <character2> <text2>
//! <character1>      ::= "'" | <character>
//! <character2>      ::= '"' | <character>
//! <character>       ::= <letter> | <digit> | <symbol> | <escape-sequence>
//! <escape-sequence> ::= "\\" <escaped-char>
//! <escaped-char>    ::= "t" | "n" | "r" | '"' | "'" | "\\"
//! <rule-name>       ::= <letter> <rule-name-tail>
//! <rule-name-tail>  ::= "" | <rule-char> <rule-name-tail>
//! <rule-char>       ::= <letter> | <digit> | "-" | "_"
//! <letter>          ::= "A" | ... | "Z" | "a" | ... | "z"
//! <digit>           ::= "0" | ... | "9"
//! <symbol>          ::= any printable ASCII byte that is not a letter, a
//!                       digit, a quote or a backslash
//! <opt-whitespace>  ::= " " <opt-whitespace> | ""
//! ```
//!
//! `EOL` is the parser's built-in line terminator.

use std::sync::OnceLock;

use crate::grammar::{Grammar, Rule, Sequence, Symbol, END_OF_LINE};
use crate::ll::GrammarError;
use crate::parser::Parser;

mod convert;

pub use convert::BnfBindings;

fn t<B: AsRef<[u8]>>(bytes: B) -> Symbol {
    Symbol::terminal(bytes)
}

fn nt(name: &str) -> Symbol {
    Symbol::non_terminal(name)
}

fn rule(head: &str, alternatives: Vec<Vec<Symbol>>) -> Rule {
    Rule::new(head, alternatives.into_iter().map(Sequence::new).collect())
}

/// A rule with one single-byte alternative per byte.
fn one_of<I: IntoIterator<Item = u8>>(head: &str, bytes: I) -> Rule {
    rule(head, bytes.into_iter().map(|byte| vec![t([byte])]).collect())
}

fn build_self_grammar() -> Grammar {
    let symbols = (b' '..=b'~').filter(|byte| {
        !byte.is_ascii_alphanumeric() && !matches!(*byte, b'"' | b'\'' | b'\\')
    });

    Grammar::new(vec![
        rule("syntax", vec![vec![nt("line"), nt("more-lines")]]),
        rule(
            "more-lines",
            vec![
                vec![Symbol::Empty],
                vec![nt(END_OF_LINE), nt("line"), nt("more-lines")],
            ],
        ),
        rule("line", vec![vec![nt("opt-whitespace"), nt("opt-content")]]),
        rule("opt-content", vec![vec![nt("content")], vec![Symbol::Empty]]),
        rule(
            "content",
            vec![vec![
                t("<"),
                nt("rule-name"),
                t(">"),
                nt("opt-whitespace"),
                t("::="),
                nt("opt-whitespace"),
                nt("expression"),
            ]],
        ),
        rule("expression", vec![vec![nt("list"), nt("expression-tail")]]),
        rule(
            "expression-tail",
            vec![
                vec![Symbol::Empty],
                vec![t("|"), nt("opt-whitespace"), nt("list"), nt("expression-tail")],
            ],
        ),
        rule("list", vec![vec![nt("term"), nt("opt-whitespace"), nt("list-tail")]]),
        rule(
            "list-tail",
            vec![
                vec![Symbol::Empty],
                vec![nt("term"), nt("opt-whitespace"), nt("list-tail")],
            ],
        ),
        rule(
            "term",
            vec![vec![nt("literal")], vec![t("<"), nt("rule-name"), t(">")]],
        ),
        rule(
            "literal",
            vec![
                vec![t("\""), nt("text1"), t("\"")],
                vec![t("'"), nt("text2"), t("'")],
            ],
        ),
        rule(
            "text1",
            vec![vec![Symbol::Empty], vec![nt("character1"), nt("text1")]],
        ),
        rule(
            "text2",
            vec![vec![Symbol::Empty], vec![nt("character2"), nt("text2")]],
        ),
        rule("character1", vec![vec![t("'")], vec![nt("character")]]),
        rule("character2", vec![vec![t("\"")], vec![nt("character")]]),
        rule(
            "character",
            vec![
                vec![nt("letter")],
                vec![nt("digit")],
                vec![nt("symbol")],
                vec![nt("escape-sequence")],
            ],
        ),
        rule("escape-sequence", vec![vec![t("\\"), nt("escaped-char")]]),
        one_of("escaped-char", *b"tnr\"'\\"),
        rule("rule-name", vec![vec![nt("letter"), nt("rule-name-tail")]]),
        rule(
            "rule-name-tail",
            vec![vec![Symbol::Empty], vec![nt("rule-char"), nt("rule-name-tail")]],
        ),
        rule(
            "rule-char",
            vec![vec![nt("letter")], vec![nt("digit")], vec![t("-")], vec![t("_")]],
        ),
        one_of("letter", (b'A'..=b'Z').chain(b'a'..=b'z')),
        one_of("digit", b'0'..=b'9'),
        one_of("symbol", symbols),
        rule(
            "opt-whitespace",
            vec![vec![t(" "), nt("opt-whitespace")], vec![Symbol::Empty]],
        ),
    ])
}

/// Returns the grammar of the BNF notation. It is built on first use and
/// never changes afterwards.
pub fn self_grammar() -> &'static Grammar {
    static SELF_GRAMMAR: OnceLock<Grammar> = OnceLock::new();

    SELF_GRAMMAR.get_or_init(build_self_grammar)
}

/// Returns the shared parser for BNF text, generating its table on first use.
pub fn bnf_parser() -> Result<&'static Parser, GrammarError> {
    static BNF_PARSER: OnceLock<Result<Parser, GrammarError>> = OnceLock::new();

    BNF_PARSER
        .get_or_init(|| Parser::from_grammar(self_grammar()))
        .as_ref()
        .map_err(Clone::clone)
}
