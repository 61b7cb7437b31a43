use ll_core::grammar::load_grammar;
use ll_core::ll::NodeKind;
use ll_core::parser::{Expected, ParseError, Parser};
use ll_core::{Error, Ll1Parseable};
use ll_derive::Ll1;
use pretty_assertions::assert_eq;

#[derive(Debug, Ll1, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    #[goal(r#""A" "::=" <T>"#)]
    Expr,
    #[production(r#""C""#)]
    #[production(r#""D" <EOL>"#)]
    T,
}

#[derive(Debug, Ll1, Clone, Copy, PartialEq, Eq)]
pub enum Quoted {
    // the goal is declared after another variant and still becomes rule 0.
    #[production(r#""B" | "C" | """#)]
    T,
    #[goal(r#"'"' <T> "^""#)]
    A,
}

#[test]
fn should_parse_with_derived_parser() {
    let cst = Assignment::parse_input("A::=C").unwrap();

    let root = cst.root();
    assert_eq!(Assignment::from_node_kind(cst.kind(root)), Some(Assignment::Expr));

    let children = cst.children(root);
    assert_eq!(children.len(), 3);
    assert_eq!(Assignment::from_node_kind(cst.kind(children[2])), Some(Assignment::T));
    assert_eq!(Assignment::from_node_kind(cst.kind(children[0])), None);
}

#[test]
fn should_use_end_of_line_in_derived_grammar() {
    assert!(Assignment::parse_input("A::=D\r\n").is_ok());
    assert!(Assignment::parse_input("A::=D\n").is_ok());
}

#[test]
fn should_surface_parse_errors_from_derived_parser() {
    match Assignment::parse_input("A::=!") {
        Err(Error::Parse(ParseError::UnexpectedByte { expected, got, pos })) => {
            assert_eq!(expected, Expected::Rule("T".to_string()));
            assert_eq!(got, b'!');
            assert_eq!(pos, 4);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn should_place_goal_first_regardless_of_declaration_order() {
    let cst = Quoted::parse_input("\"^").unwrap();

    assert_eq!(Quoted::from_node_kind(cst.kind(cst.root())), Some(Quoted::A));

    let t = cst.children(cst.root())[1];
    assert_eq!(Quoted::from_node_kind(cst.kind(t)), Some(Quoted::T));
    assert_eq!(cst.kind(cst.children(t)[0]), NodeKind::Nothing);
}

#[test]
fn should_name_derived_rules_after_variants() {
    let names = Quoted::parser().names();

    assert_eq!(names.kind_of("A").map(|kind| kind.as_index()), Some(0));
    assert_eq!(names.kind_of("T").map(|kind| kind.as_index()), Some(1));
    assert_eq!(names.kind_of("_nothing"), Some(NodeKind::Nothing));
}

#[test]
fn should_emit_the_same_table_as_runtime_generation() {
    let grammar = load_grammar(
        r#"<A> ::= '"' <T> "^"
           <T> ::= "B" | "C" | """#,
    )
    .unwrap();
    let runtime = Parser::from_grammar(&grammar).unwrap();

    assert_eq!(Quoted::parser(), &runtime);
}
