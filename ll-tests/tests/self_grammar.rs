use ll_core::bnf::{bnf_parser, self_grammar};
use ll_core::grammar::{load_grammar, GrammarLoadErrorKind, Rule, Sequence, Symbol};
use ll_core::ll::analyze;
use ll_core::byteset::EOS;
use pretty_assertions::assert_eq;

#[test]
fn should_round_trip_self_grammar_through_its_own_parser() {
    let grammar = self_grammar();
    let text = grammar.to_string();

    let reloaded = load_grammar(&text).unwrap();

    assert_eq!(&reloaded, grammar);
    assert_eq!(reloaded.to_string(), text);
}

#[test]
fn should_start_the_self_grammar_at_syntax() {
    let grammar = self_grammar();

    assert_eq!(grammar.start_rule().map(|rule| rule.head.as_str()), Some("syntax"));
    assert_eq!(grammar.rules[4].head, "content");
}

#[test]
fn should_follow_every_start_rule_with_end_of_input() {
    for text in [
        self_grammar().to_string(),
        include_str!("../../ll-core/examples/json.bnf").to_string(),
    ] {
        let grammar = load_grammar(&text).unwrap();
        let start = &grammar.rules[0].head;

        let analysis = analyze(&grammar).unwrap();
        assert!(analysis.follow(start).unwrap().contains(EOS));
    }
}

#[test]
fn should_load_multi_line_grammar_with_blank_lines() {
    let grammar = load_grammar(
        "\n<Expr> ::= \"A\" <T>\r\n\n  <T> ::= 'C' | <EOL> | \"\"\n",
    )
    .unwrap();

    assert_eq!(
        grammar.rules,
        vec![
            Rule::new(
                "Expr",
                vec![Sequence::new(vec![
                    Symbol::terminal("A"),
                    Symbol::non_terminal("T"),
                ])]
            ),
            Rule::new(
                "T",
                vec![
                    Sequence::new(vec![Symbol::terminal("C")]),
                    Sequence::new(vec![Symbol::non_terminal("EOL")]),
                    Sequence::new(vec![Symbol::Empty]),
                ]
            ),
        ]
    );
}

#[test]
fn should_report_line_number_of_invalid_bnf() {
    let err = load_grammar("<A> ::= \"a\"\n<B> ::= b").unwrap_err();

    assert_eq!(err.kind(), GrammarLoadErrorKind::Parse);
    assert!(err.to_string().contains("lineno 2"), "{}", err);
}

#[test]
fn should_reject_text_without_rules() {
    let err = load_grammar("  \n \n").unwrap_err();

    assert_eq!(err.kind(), GrammarLoadErrorKind::NoRules);
}

#[test]
fn should_share_one_bnf_parser() {
    let first = bnf_parser().unwrap();
    let second = bnf_parser().unwrap();

    assert!(std::ptr::eq(first, second));
}
