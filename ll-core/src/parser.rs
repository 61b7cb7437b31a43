//! A stack-driven executor for [LlTable]s.
//!
//! The engine keeps two explicit stacks instead of recursing: an operand
//! stack of pending operations and a production stack of completed nodes.
//! Each step pops one operand and either expands it, matches input against
//! it, or reduces completed nodes into a parent.

use std::io::Read;

use thiserror::Error;

use crate::byteset::{ByteRepr, EOS};
use crate::cst::{Cst, CstBuilder, NodeId};
use crate::grammar::{Grammar, END_OF_LINE};
use crate::ll::{self, Callee, GrammarError, LlTable, NameMap, NodeKind, ParserOp, RuleId};

/// Structural failures of a table, independent of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table has no rows")]
    EmptyTable,
    #[error("table has no row for the start rule")]
    NoStartRule,
    #[error("table has no row for rule <{0}>")]
    MissingRow(String),
    #[error("production stack is inconsistent with the table")]
    InconsistentReduction,
}

/// What the parser was looking for when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Rule(String),
    Byte(u8),
    EndOfLine,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule(name) => write!(f, "<{}>", name),
            Self::Byte(byte) => write!(f, "{}", ByteRepr(*byte)),
            Self::EndOfLine => write!(f, "<{}>", END_OF_LINE),
        }
    }
}

fn byte_repr(byte: &u8) -> ByteRepr {
    ByteRepr(*byte)
}

/// Input-dependent parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected byte {} at offset {pos}, expected {expected}", byte_repr(.got))]
    UnexpectedByte { expected: Expected, got: u8, pos: usize },
    #[error("unexpected end of input at offset {pos}, expected {expected}")]
    UnexpectedEndOfInput { expected: Expected, pos: usize },
    #[error("trailing input {} at offset {pos}", byte_repr(.got))]
    TrailingInput { got: u8, pos: usize },
    #[error("input contains the reserved byte 0 at offset {pos}")]
    ReservedByte { pos: usize },
}

impl ParseError {
    /// The input offset the error was raised at.
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedByte { pos, .. }
            | Self::UnexpectedEndOfInput { pos, .. }
            | Self::TrailingInput { pos, .. }
            | Self::ReservedByte { pos } => *pos,
        }
    }
}

/// Entries of the operand stack. Literals borrow from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand<'t> {
    Invoke(Callee),
    MatchLiteral(&'t [u8]),
    EndOfInput,
    Reduce {
        kind: NodeKind,
        pos: usize,
        count: usize,
    },
    MatchByte(u8),
}

impl<'t> From<&'t ParserOp> for Operand<'t> {
    fn from(op: &'t ParserOp) -> Self {
        match op {
            ParserOp::Invoke(callee) => Operand::Invoke(*callee),
            ParserOp::MatchLiteral(bytes) => Operand::MatchLiteral(bytes),
            ParserOp::EndOfInput => Operand::EndOfInput,
        }
    }
}

/// Entries of the production stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Production {
    /// A single matched byte awaiting collapse into a literal leaf.
    Byte,
    Node(NodeId),
}

/// A cursor over the input. Reading past the end yields [EOS].
struct Scanner<'i> {
    input: &'i [u8],
    pos: usize,
}

impl<'i> Scanner<'i> {
    fn new(input: &'i [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> u8 {
        self.input.get(self.pos).copied().unwrap_or(EOS)
    }

    fn advance_mut(&mut self) {
        self.pos += 1;
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Builds the error for a lookahead that matches nothing expected.
    fn unexpected(&self, expected: Expected) -> ParseError {
        if self.is_exhausted() {
            ParseError::UnexpectedEndOfInput {
                expected,
                pos: self.pos,
            }
        } else {
            ParseError::UnexpectedByte {
                expected,
                got: self.peek(),
                pos: self.pos,
            }
        }
    }
}

struct ParseContext<'t> {
    operands: Vec<Operand<'t>>,
    productions: Vec<Production>,
    builder: CstBuilder,
}

impl<'t> ParseContext<'t> {
    const DEFAULT_STACK_SIZE: usize = 128;

    fn new() -> Self {
        Self {
            operands: Vec::with_capacity(Self::DEFAULT_STACK_SIZE),
            productions: Vec::with_capacity(Self::DEFAULT_STACK_SIZE),
            builder: CstBuilder::with_capacity(Self::DEFAULT_STACK_SIZE),
        }
    }

    fn push_operand_mut(&mut self, operand: Operand<'t>) {
        self.operands.push(operand)
    }

    fn pop_operand_mut(&mut self) -> Option<Operand<'t>> {
        self.operands.pop()
    }

    fn push_production_mut(&mut self, production: Production) {
        self.productions.push(production)
    }

    /// Pops the top `count` productions, preserving their input order.
    fn pop_productions_mut(&mut self, count: usize) -> Result<Vec<Production>, TableError> {
        let start = self
            .productions
            .len()
            .checked_sub(count)
            .ok_or(TableError::InconsistentReduction)?;

        Ok(self.productions.split_off(start))
    }

    /// Schedules a reduction followed by `ops`, so that `ops` run in order
    /// before the reduction collects their results.
    fn push_expansion_mut<I>(&mut self, kind: NodeKind, pos: usize, ops: I)
    where
        I: DoubleEndedIterator<Item = Operand<'t>> + ExactSizeIterator,
    {
        self.push_operand_mut(Operand::Reduce {
            kind,
            pos,
            count: ops.len(),
        });
        for op in ops.rev() {
            self.push_operand_mut(op);
        }
    }
}

fn validate_table(table: &LlTable) -> Result<(), TableError> {
    if table.is_empty() {
        Err(TableError::EmptyTable)
    } else if table.row(RuleId::START).is_none() {
        Err(TableError::NoStartRule)
    } else {
        Ok(())
    }
}

const LINE_FEED: &[u8] = b"\n";
const CARRIAGE_RETURN: &[u8] = b"\r";

fn run(table: &LlTable, names: &NameMap, input: &[u8]) -> Result<Cst, crate::Error> {
    validate_table(table)?;
    if let Some(pos) = input.iter().position(|&byte| byte == EOS) {
        return Err(ParseError::ReservedByte { pos }.into());
    }

    let mut scanner = Scanner::new(input);
    let mut ctx = ParseContext::new();
    ctx.push_operand_mut(Operand::EndOfInput);
    ctx.push_operand_mut(Operand::Invoke(Callee::Rule(RuleId::START)));

    while let Some(operand) = ctx.pop_operand_mut() {
        let lookahead = scanner.peek();
        debug!("{: >6} | {: <12} | {:?}", scanner.pos(), ByteRepr(lookahead).to_string(), operand);

        match operand {
            Operand::Invoke(Callee::EndOfLine) => {
                let pos = scanner.pos();
                match lookahead {
                    b'\n' => ctx.push_expansion_mut(
                        NodeKind::EndOfLine,
                        pos,
                        [Operand::MatchLiteral(LINE_FEED)].into_iter(),
                    ),
                    b'\r' => ctx.push_expansion_mut(
                        NodeKind::EndOfLine,
                        pos,
                        [
                            Operand::MatchLiteral(CARRIAGE_RETURN),
                            Operand::MatchLiteral(LINE_FEED),
                        ]
                        .into_iter(),
                    ),
                    _ => return Err(scanner.unexpected(Expected::EndOfLine).into()),
                }
            }
            Operand::Invoke(Callee::Rule(rule)) => {
                let row = table
                    .row(rule)
                    .ok_or_else(|| TableError::MissingRow(names.name_of(NodeKind::Rule(rule))))?;
                let ops = row.get(lookahead).ok_or_else(|| {
                    scanner.unexpected(Expected::Rule(names.name_of(NodeKind::Rule(rule))))
                })?;

                ctx.push_expansion_mut(
                    NodeKind::Rule(rule),
                    scanner.pos(),
                    ops.iter().map(Operand::from),
                );
            }
            Operand::MatchLiteral(bytes) => ctx.push_expansion_mut(
                NodeKind::Literal,
                scanner.pos(),
                bytes.iter().map(|&byte| Operand::MatchByte(byte)),
            ),
            Operand::MatchByte(byte) => {
                if lookahead != byte {
                    return Err(scanner.unexpected(Expected::Byte(byte)).into());
                }
                ctx.push_production_mut(Production::Byte);
                scanner.advance_mut();
            }
            Operand::Reduce { kind, pos, count } => {
                let popped = ctx.pop_productions_mut(count)?;
                let span = pos..scanner.pos();

                let node = match kind {
                    // the matched bytes collapse into a single leaf.
                    NodeKind::Literal => {
                        if popped.iter().any(|production| *production != Production::Byte) {
                            return Err(TableError::InconsistentReduction.into());
                        }
                        ctx.builder.push_node_mut(kind, span, vec![])
                    }
                    _ if popped.is_empty() => {
                        let nothing = ctx.builder.push_node_mut(NodeKind::Nothing, pos..pos, vec![]);
                        ctx.builder.push_node_mut(kind, span, vec![nothing])
                    }
                    _ => {
                        let children = popped
                            .into_iter()
                            .map(|production| match production {
                                Production::Node(id) => Ok(id),
                                Production::Byte => Err(TableError::InconsistentReduction),
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        ctx.builder.push_node_mut(kind, span, children)
                    }
                };
                ctx.push_production_mut(Production::Node(node));
            }
            Operand::EndOfInput => {
                if lookahead != EOS {
                    return Err(ParseError::TrailingInput {
                        got: lookahead,
                        pos: scanner.pos(),
                    }
                    .into());
                }

                return match ctx.productions.as_slice() {
                    [Production::Node(root)] => {
                        let root = *root;
                        Ok(ctx.builder.finish(root))
                    }
                    _ => Err(TableError::InconsistentReduction.into()),
                };
            }
        }
    }

    Err(TableError::InconsistentReduction.into())
}

/// Executes a table against input bytes, returning the tree together with
/// the name map extended by the reserved node names.
pub fn parse<I: AsRef<[u8]>>(
    table: &LlTable,
    names: &NameMap,
    input: I,
) -> Result<(Cst, NameMap), crate::Error> {
    let cst = run(table, names, input.as_ref())?;

    Ok((cst, names.clone().with_builtins()))
}

/// An immutable table and name map, reusable across any number of parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    table: LlTable,
    names: NameMap,
}

impl Parser {
    pub fn new(table: LlTable, names: NameMap) -> Self {
        Self {
            table,
            names: names.with_builtins(),
        }
    }

    /// Generates the table for a grammar and wraps it in a parser.
    pub fn from_grammar(grammar: &Grammar) -> Result<Self, GrammarError> {
        let (table, names) = ll::generate(grammar)?;

        Ok(Self::new(table, names))
    }

    pub fn table(&self) -> &LlTable {
        &self.table
    }

    /// The rule names, including the reserved node names.
    pub fn names(&self) -> &NameMap {
        &self.names
    }

    pub fn parse<I: AsRef<[u8]>>(&self, input: I) -> Result<Cst, crate::Error> {
        run(&self.table, &self.names, input.as_ref())
    }

    /// Reads the whole stream into memory, then parses it.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<Cst, crate::Error> {
        let mut input = vec![];
        reader.read_to_end(&mut input)?;

        self.parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Rule, Sequence, Symbol};
    use crate::Error;

    fn t(text: &str) -> Symbol {
        Symbol::terminal(text)
    }

    fn nt(name: &str) -> Symbol {
        Symbol::non_terminal(name)
    }

    fn rule(head: &str, alternatives: Vec<Vec<Symbol>>) -> Rule {
        Rule::new(head, alternatives.into_iter().map(Sequence::new).collect())
    }

    fn lines_parser() -> Parser {
        // <Lines> ::= <Line> <More>, <More> ::= "" | <EOL> <Line> <More>
        let grammar = Grammar::new(vec![
            rule("Lines", vec![vec![nt("Line"), nt("More")]]),
            rule("More", vec![vec![Symbol::Empty], vec![nt("EOL"), nt("Line"), nt("More")]]),
            rule("Line", vec![vec![t("x")]]),
        ]);

        Parser::from_grammar(&grammar).unwrap()
    }

    #[test]
    fn should_collapse_literal_bytes_into_one_leaf() {
        let grammar = Grammar::new(vec![rule("A", vec![vec![t("abc")]])]);
        let parser = Parser::from_grammar(&grammar).unwrap();

        let cst = parser.parse("abc").unwrap();
        let root = cst.node(cst.root());

        assert_eq!(root.span(), 0..3);
        assert_eq!(root.children().len(), 1);

        let literal = cst.node(root.children()[0]);
        assert_eq!(literal.kind(), NodeKind::Literal);
        assert_eq!(literal.span(), 0..3);
        assert!(literal.is_leaf());
    }

    #[test]
    fn should_match_both_line_endings() {
        let parser = lines_parser();

        for input in ["x\nx", "x\r\nx\nx"] {
            let cst = parser.parse(input).unwrap();

            let mut end_of_lines = vec![];
            cst.walk(&mut |cst: &Cst, id| {
                if cst.kind(id) == NodeKind::EndOfLine {
                    end_of_lines.push(cst.children(id).len());
                }
                true
            });

            let expected = if input.contains('\r') { vec![2, 1] } else { vec![1] };
            assert_eq!(end_of_lines, expected);
        }
    }

    #[test]
    fn should_require_line_feed_after_carriage_return() {
        let parser = lines_parser();

        assert_eq!(
            parser.parse("x\rx").unwrap_err().to_string(),
            "parse error: unexpected byte 'x' (120) at offset 2, expected '\\n' (10)"
        );
        assert!(matches!(
            parser.parse("x\r"),
            Err(Error::Parse(ParseError::UnexpectedEndOfInput {
                expected: Expected::Byte(b'\n'),
                pos: 2
            }))
        ));
    }

    #[test]
    fn should_report_end_of_input_inside_rule() {
        let grammar = Grammar::new(vec![rule("A", vec![vec![t("a"), nt("B")]]), rule("B", vec![vec![t("b")]])]);
        let parser = Parser::from_grammar(&grammar).unwrap();

        assert!(matches!(
            parser.parse("a"),
            Err(Error::Parse(ParseError::UnexpectedEndOfInput {
                expected: Expected::Rule(name),
                pos: 1
            })) if name == "B"
        ));
    }

    #[test]
    fn should_reject_reserved_byte_in_input() {
        let parser = lines_parser();

        assert!(matches!(
            parser.parse(b"x\0"),
            Err(Error::Parse(ParseError::ReservedByte { pos: 1 }))
        ));
    }

    #[test]
    fn should_fail_on_empty_or_startless_tables() {
        let names = NameMap::new();

        assert!(matches!(
            parse(&LlTable::new(), &names, "x"),
            Err(Error::Table(TableError::EmptyTable))
        ));

        let mut table = LlTable::new();
        table.insert_row_mut(RuleId::unchecked_new(1), crate::ll::Row::new());
        assert!(matches!(
            parse(&table, &names, "x"),
            Err(Error::Table(TableError::NoStartRule))
        ));
    }

    #[test]
    fn should_fail_on_missing_row() {
        let mut row = crate::ll::Row::new();
        let alternative =
            row.push_alternative_mut(vec![ParserOp::Invoke(Callee::Rule(RuleId::unchecked_new(7)))]);
        row.assign_mut(b'x', alternative).unwrap();

        let mut table = LlTable::new();
        table.insert_row_mut(RuleId::START, row);

        assert!(matches!(
            parse(&table, &NameMap::new(), "x"),
            Err(Error::Table(TableError::MissingRow(name))) if name == "Unknown_7"
        ));
    }

    #[test]
    fn should_return_name_map_with_reserved_entries() {
        let grammar = Grammar::new(vec![rule("A", vec![vec![t("a")]])]);
        let (table, names) = ll::generate(&grammar).unwrap();

        let (_, names) = parse(&table, &names, "a").unwrap();

        assert_eq!(names.get(NodeKind::Rule(RuleId::START)), Some("A"));
        assert_eq!(names.get(NodeKind::Literal), Some("_literal"));
        assert_eq!(names.get(NodeKind::EndOfLine), Some("_endofline"));
        assert_eq!(names.get(NodeKind::Nothing), Some("_nothing"));
    }

    #[test]
    fn should_read_input_from_stream() {
        let parser = lines_parser();
        let cst = parser.parse_reader(std::io::Cursor::new(b"x\nx".to_vec())).unwrap();

        assert_eq!(cst.span(cst.root()), 0..3);
    }
}
