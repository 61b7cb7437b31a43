use ll_core::cst::Cst;
use ll_core::grammar::load_grammar;
use ll_core::ll::{GrammarError, NodeKind};
use ll_core::parser::{Expected, ParseError, Parser};
use ll_core::{generate_table_from_ruleset, Error, GeneratorKind};
use pretty_assertions::assert_eq;

fn parser_from(grammar: &str) -> Parser {
    let (table, names) = generate_table_from_ruleset(GeneratorKind::Ll1, grammar).unwrap();

    Parser::new(table, names)
}

fn assert_parse_error(result: Result<Cst, Error>, expected: ParseError) {
    match result {
        Err(Error::Parse(err)) => assert_eq!(err, expected),
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

const ASSIGNMENT: &str = r#"
<Expr> ::= "A" "::=" <T>
<T> ::= "C"
"#;

#[test]
fn should_parse_single_assignment() {
    let parser = parser_from(ASSIGNMENT);
    let input = "A::=C";
    let cst = parser.parse(input).unwrap();

    let expected = r#"Expr [0, 5)
  _literal "A" [0, 1)
  _literal "::=" [1, 4)
  T [4, 5)
    _literal "C" [4, 5)"#;

    assert_eq!(
        cst.human_readable_format(parser.names(), input.as_bytes()),
        expected
    );
}

#[test]
fn should_name_the_expected_rule_on_unexpected_byte() {
    let parser = parser_from(ASSIGNMENT);

    assert_parse_error(
        parser.parse("A::=!"),
        ParseError::UnexpectedByte {
            expected: Expected::Rule("T".to_string()),
            got: b'!',
            pos: 4,
        },
    );
}

#[test]
fn should_reject_trailing_input() {
    let parser = parser_from(ASSIGNMENT);

    assert_parse_error(
        parser.parse("A::=C!"),
        ParseError::TrailingInput { got: b'!', pos: 5 },
    );
}

#[test]
fn should_report_end_of_input_inside_a_literal() {
    let parser = parser_from(ASSIGNMENT);

    assert_parse_error(
        parser.parse("A::"),
        ParseError::UnexpectedEndOfInput {
            expected: Expected::Byte(b'='),
            pos: 3,
        },
    );
}

#[test]
fn should_reduce_empty_alternative_to_a_nothing_placeholder() {
    let parser = parser_from(
        r#"<A> ::= '"' <T> "^"
           <T> ::= "B" | "C" | """#,
    );
    let input = "\"^";
    let cst = parser.parse(input).unwrap();

    let root = cst.root();
    let t = cst.children(root)[1];
    assert_eq!(parser.names().name_of(cst.kind(t)), "T");
    assert_eq!(cst.span(t), 1..1);

    let children = cst.children(t);
    assert_eq!(children.len(), 1);
    assert_eq!(cst.kind(children[0]), NodeKind::Nothing);
    assert_eq!(cst.span(children[0]), 1..1);

    for input in ["\"B^", "\"C^"] {
        assert!(parser.parse(input).is_ok(), "failed on {:?}", input);
    }
}

#[test]
fn should_collapse_nullable_rule_on_follow_byte_to_one_nothing_child() {
    let parser = parser_from(
        r#"<S> ::= <A> "x"
           <A> ::= <O> <P>
           <O> ::= "o" | ""
           <P> ::= "p" | """#,
    );
    let input = "x";
    let cst = parser.parse(input).unwrap();

    let expected = r#"S [0, 1)
  A [0, 0)
    _nothing [0, 0)
  _literal "x" [0, 1)"#;

    assert_eq!(
        cst.human_readable_format(parser.names(), input.as_bytes()),
        expected
    );

    let cst = parser.parse("opx").unwrap();
    let a = cst.children(cst.root())[0];
    assert_eq!(cst.children(a).len(), 2);
}

#[test]
fn should_reject_left_recursion_during_generation() {
    let err = generate_table_from_ruleset(
        GeneratorKind::Ll1,
        r#"<S> ::= <T>
           <T> ::= <T> "B" | "_""#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Grammar(GrammarError::LeftRecursion(ref rule)) if rule == "T"
    ));
}

#[test]
fn should_reject_indirect_left_recursion() {
    let grammar = load_grammar(
        r#"<A> ::= <B> "a"
           <B> ::= <C> | "b"
           <C> ::= "" | <A>"#,
    )
    .unwrap();

    assert!(matches!(
        Parser::from_grammar(&grammar),
        Err(GrammarError::LeftRecursion(_))
    ));
}

#[test]
fn should_flag_conflicting_alternatives() {
    let err = generate_table_from_ruleset(
        GeneratorKind::Ll1,
        r#"<A> ::= "ab" | "ac""#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Grammar(GrammarError::AmbiguousCell { ref rule, byte: b'a' }) if rule == "A"
    ));
}

#[test]
fn should_flag_nullable_alternative_colliding_with_follow() {
    let err = generate_table_from_ruleset(
        GeneratorKind::Ll1,
        r#"<S> ::= <Opt> "x"
           <Opt> ::= "x" | """#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Grammar(GrammarError::AmbiguousCell { ref rule, byte: b'x' }) if rule == "Opt"
    ));
}

#[test]
fn should_generate_one_row_per_rule() {
    let grammar = load_grammar(include_str!("../../ll-core/examples/json.bnf")).unwrap();
    let parser = Parser::from_grammar(&grammar).unwrap();

    assert_eq!(parser.table().len(), grammar.rules.len());
    for rule in grammar.rules() {
        let kind = parser.names().kind_of(&rule.head).unwrap();
        match kind {
            NodeKind::Rule(id) => assert!(parser.table().row(id).is_some()),
            other => panic!("rule {} bound to {:?}", rule.head, other),
        }
    }
}

#[test]
fn should_parse_both_line_endings() {
    let parser = parser_from(
        r#"<Lines> ::= "x" <More>
           <More> ::= "" | <EOL> "x" <More>"#,
    );
    let input = "x\nx\r\nx";
    let cst = parser.parse(input).unwrap();

    let mut line_endings = vec![];
    cst.walk(&mut |cst: &Cst, id| {
        if cst.kind(id) == NodeKind::EndOfLine {
            line_endings.push((cst.span(id), cst.children(id).len()));
        }
        true
    });

    assert_eq!(line_endings, vec![(1..2, 1), (3..5, 2)]);
}

#[test]
fn should_require_line_feed_after_carriage_return() {
    let parser = parser_from(
        r#"<Lines> ::= "x" <More>
           <More> ::= "" | <EOL> "x" <More>"#,
    );

    assert_parse_error(
        parser.parse("x\rx"),
        ParseError::UnexpectedByte {
            expected: Expected::Byte(b'\n'),
            got: b'x',
            pos: 2,
        },
    );
}

#[test]
fn should_reject_input_holding_the_end_of_input_sentinel() {
    let parser = parser_from(ASSIGNMENT);

    assert_parse_error(parser.parse(b"A::=\0"), ParseError::ReservedByte { pos: 4 });
}

#[test]
fn should_parse_from_a_reader() {
    let parser = parser_from(ASSIGNMENT);
    let cst = parser.parse_reader(std::io::Cursor::new(b"A::=C".to_vec())).unwrap();

    assert_eq!(cst.span(cst.root()), 0..5);
}
