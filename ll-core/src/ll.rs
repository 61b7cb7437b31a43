use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::byteset::{ByteRepr, ByteSet, EOS};
use crate::grammar::{Grammar, Symbol, END_OF_LINE};

/// Errors that abort table generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("rule <{0}> is referenced but never defined")]
    UndefinedNonTerminal(String),
    #[error("rule <{rule}> has more than one alternative for lookahead {}", byte_repr(.byte))]
    AmbiguousCell { rule: String, byte: u8 },
    #[error("rule <{0}> is left recursive")]
    LeftRecursion(String),
    #[error("rule <{0}> mixes an empty symbol with other symbols in one alternative")]
    EmptySequenceInAlternation(String),
    #[error("rule <{0}> has an alternative without symbols")]
    EmptyAlternative(String),
    #[error("rule <{0}> contains a terminal that is empty or holds the reserved byte 0")]
    InvalidTerminal(String),
    #[error("rule <{0}> is defined more than once")]
    DuplicateRule(String),
}

fn byte_repr(byte: &u8) -> ByteRepr {
    ByteRepr(*byte)
}

/// A wrapper type for referencing a rule by its position in the grammar.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    /// The start rule is always the first rule of a grammar.
    pub const START: RuleId = RuleId(0);

    /// Instantiates a new [RuleId] from a rule index. The index is not
    /// checked against any grammar; a [RuleId] with no row in the table
    /// surfaces as a `MissingRow` error at parse time.
    pub const fn unchecked_new(id: usize) -> Self {
        RuleId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<RuleId> for usize {
    fn from(value: RuleId) -> Self {
        value.as_usize()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The target of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    Rule(RuleId),
    /// The built-in end-of-line matcher, accepting `\n` or `\r\n`.
    EndOfLine,
}

/// An operation stored in a table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParserOp {
    Invoke(Callee),
    MatchLiteral(Box<[u8]>),
    EndOfInput,
}

impl ParserOp {
    fn human_readable_format(&self, names: &NameMap) -> String {
        match self {
            ParserOp::Invoke(Callee::Rule(rule)) => {
                format!("<{}>", names.name_of(NodeKind::Rule(*rule)))
            }
            ParserOp::Invoke(Callee::EndOfLine) => format!("<{}>", END_OF_LINE),
            ParserOp::MatchLiteral(bytes) => Symbol::terminal(bytes).to_string(),
            ParserOp::EndOfInput => "$".to_string(),
        }
    }
}

/// The type tag of a CST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// A collapsed literal leaf.
    Literal,
    /// A match of the built-in `EOL` rule.
    EndOfLine,
    /// The placeholder child of an epsilon reduction.
    Nothing,
    Rule(RuleId),
}

impl NodeKind {
    pub const LITERAL_NAME: &'static str = "_literal";
    pub const END_OF_LINE_NAME: &'static str = "_endofline";
    pub const NOTHING_NAME: &'static str = "_nothing";

    /// Returns the signed index of the kind. Reserved kinds are negative.
    pub fn as_index(&self) -> isize {
        match self {
            Self::Literal => -1,
            Self::EndOfLine => -2,
            Self::Nothing => -3,
            Self::Rule(rule) => rule.as_usize() as isize,
        }
    }

    pub fn from_index(index: isize) -> Option<Self> {
        match index {
            -1 => Some(Self::Literal),
            -2 => Some(Self::EndOfLine),
            -3 => Some(Self::Nothing),
            idx if idx >= 0 => Some(Self::Rule(RuleId(idx as usize))),
            _ => None,
        }
    }
}

/// Pairs node kinds with human-readable names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    names: BTreeMap<NodeKind, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mut<S: Into<String>>(&mut self, kind: NodeKind, name: S) {
        self.names.insert(kind, name.into());
    }

    /// Adds the reserved entries for literal, end-of-line and epsilon nodes.
    pub fn with_builtins(mut self) -> Self {
        self.insert_mut(NodeKind::Literal, NodeKind::LITERAL_NAME);
        self.insert_mut(NodeKind::EndOfLine, NodeKind::END_OF_LINE_NAME);
        self.insert_mut(NodeKind::Nothing, NodeKind::NOTHING_NAME);
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<&str> {
        self.names.get(&kind).map(String::as_str)
    }

    /// Like [NameMap::get], falling back to a placeholder for unnamed kinds.
    pub fn name_of(&self, kind: NodeKind) -> String {
        self.get(kind)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown_{}", kind.as_index()))
    }

    pub fn kind_of<S: AsRef<str>>(&self, name: S) -> Option<NodeKind> {
        let name = name.as_ref();
        self.names
            .iter()
            .find(|(_, candidate)| candidate.as_str() == name)
            .map(|(kind, _)| *kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKind, &str)> {
        self.names.iter().map(|(kind, name)| (*kind, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

const LOOKAHEAD_VALUES: usize = 256;

/// The lookahead row of a single rule. Each alternative's operations are
/// stored once and cells point at them by alternative index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    alternatives: Vec<Vec<ParserOp>>,
    cells: Box<[Option<usize>; LOOKAHEAD_VALUES]>,
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

impl Row {
    pub fn new() -> Self {
        Self {
            alternatives: vec![],
            cells: Box::new([None; LOOKAHEAD_VALUES]),
        }
    }

    /// Appends an alternative, returning its index within the row.
    pub fn push_alternative_mut(&mut self, ops: Vec<ParserOp>) -> usize {
        self.alternatives.push(ops);
        self.alternatives.len() - 1
    }

    /// Points the cell for `byte` at an alternative. Returns the conflicting
    /// alternative if the cell already belongs to a different one.
    pub fn assign_mut(&mut self, byte: u8, alternative: usize) -> Result<(), usize> {
        let cell = &mut self.cells[byte as usize];
        match *cell {
            Some(existing) if existing != alternative => Err(existing),
            _ => {
                *cell = Some(alternative);
                Ok(())
            }
        }
    }

    pub fn get(&self, byte: u8) -> Option<&[ParserOp]> {
        self.cells[byte as usize]
            .and_then(|alternative| self.alternatives.get(alternative))
            .map(Vec::as_slice)
    }

    pub fn alternatives(&self) -> &[Vec<ParserOp>] {
        &self.alternatives
    }

    /// Iterates assigned cells as `(lookahead, alternative)` in byte order.
    pub fn cells(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(byte, cell)| cell.map(|alternative| (byte as u8, alternative)))
    }

    /// The set of bytes with an assigned cell.
    pub fn lookahead(&self) -> ByteSet {
        self.cells().map(|(byte, _)| byte).collect()
    }
}

/// The predictive parse table: one [Row] per rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlTable {
    rows: Vec<Option<Row>>,
}

impl LlTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_row_mut(&mut self, rule: RuleId, row: Row) {
        let idx = rule.as_usize();
        if self.rows.len() <= idx {
            self.rows.resize_with(idx + 1, || None);
        }
        self.rows[idx] = Some(row);
    }

    pub fn row(&self, rule: RuleId) -> Option<&Row> {
        self.rows.get(rule.as_usize()).and_then(Option::as_ref)
    }

    pub fn rows(&self) -> impl Iterator<Item = (RuleId, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| row.as_ref().map(|row| (RuleId(idx), row)))
    }

    /// The number of rows present in the table.
    pub fn len(&self) -> usize {
        self.rows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outputs a human-readable representation of the table, one line per
    /// alternative with the lookahead bytes that select it.
    pub fn human_readable_format(&self, names: &NameMap) -> String {
        let rule_names = self
            .rows()
            .map(|(rule, _)| format!("<{}>", names.name_of(NodeKind::Rule(rule))))
            .collect::<Vec<_>>();
        let left_side_padding = rule_names.iter().map(String::len).max().unwrap_or(0);

        self.rows()
            .zip(rule_names)
            .flat_map(|((_, row), rule_name)| {
                let mut lines = Vec::with_capacity(row.alternatives.len());
                for (alternative, ops) in row.alternatives.iter().enumerate() {
                    let lookahead = row
                        .cells()
                        .filter(|(_, cell)| *cell == alternative)
                        .map(|(byte, _)| byte)
                        .collect::<ByteSet>();
                    let ops = match ops.is_empty() {
                        true => "\"\"".to_string(),
                        false => ops
                            .iter()
                            .map(|op| op.human_readable_format(names))
                            .collect::<Vec<_>>()
                            .join(" "),
                    };

                    let header = if alternative == 0 { rule_name.as_str() } else { "" };
                    lines.push(format!(
                        "{: >width$} | {} => {}",
                        header,
                        lookahead,
                        ops,
                        width = left_side_padding
                    ));
                }
                lines
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A grammar symbol with rule references resolved to indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolRef<'a> {
    Terminal(&'a [u8]),
    Rule(RuleId),
    EndOfLine,
    Empty,
}

impl<'a> SymbolRef<'a> {
    fn to_parser_op(self) -> Option<ParserOp> {
        match self {
            SymbolRef::Terminal(bytes) => Some(ParserOp::MatchLiteral(Box::from(bytes))),
            SymbolRef::Rule(rule) => Some(ParserOp::Invoke(Callee::Rule(rule))),
            SymbolRef::EndOfLine => Some(ParserOp::Invoke(Callee::EndOfLine)),
            SymbolRef::Empty => None,
        }
    }
}

type SequenceRef<'a> = Vec<SymbolRef<'a>>;

/// A grammar validated and indexed for table generation.
struct ResolvedGrammar<'a> {
    names: Vec<&'a str>,
    rules: Vec<Vec<SequenceRef<'a>>>,
}

impl<'a> ResolvedGrammar<'a> {
    fn resolve(grammar: &'a Grammar) -> Result<Self, GrammarError> {
        let mut indices = HashMap::with_capacity(grammar.rules.len());
        for (idx, rule) in grammar.rules.iter().enumerate() {
            if indices.insert(rule.head.as_str(), RuleId(idx)).is_some() {
                return Err(GrammarError::DuplicateRule(rule.head.clone()));
            }
        }

        let mut rules = Vec::with_capacity(grammar.rules.len());
        for rule in grammar.rules.iter() {
            let head = || rule.head.clone();
            if rule.sequences().is_empty() {
                return Err(GrammarError::EmptyAlternative(head()));
            }

            let mut sequences = Vec::with_capacity(rule.sequences().len());
            for sequence in rule.sequences() {
                let symbols = sequence.symbols();
                if symbols.is_empty() {
                    return Err(GrammarError::EmptyAlternative(head()));
                }
                if symbols.len() > 1 && symbols.iter().any(Symbol::is_empty) {
                    return Err(GrammarError::EmptySequenceInAlternation(head()));
                }

                let resolved = symbols
                    .iter()
                    .map(|symbol| match symbol {
                        Symbol::Terminal(bytes) if bytes.is_empty() || bytes.contains(&EOS) => {
                            Err(GrammarError::InvalidTerminal(head()))
                        }
                        Symbol::Terminal(bytes) => Ok(SymbolRef::Terminal(bytes)),
                        Symbol::NonTerminal(name) => match indices.get(name.as_str()) {
                            Some(&rule) => Ok(SymbolRef::Rule(rule)),
                            None if name == END_OF_LINE => Ok(SymbolRef::EndOfLine),
                            None => Err(GrammarError::UndefinedNonTerminal(name.clone())),
                        },
                        Symbol::Empty => Ok(SymbolRef::Empty),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                sequences.push(resolved);
            }
            rules.push(sequences);
        }

        Ok(Self {
            names: grammar.rules.iter().map(|rule| rule.head.as_str()).collect(),
            rules,
        })
    }

    fn name(&self, rule: usize) -> String {
        self.names[rule].to_string()
    }

    fn sequences(&self) -> impl Iterator<Item = (usize, &SequenceRef<'a>)> {
        self.rules
            .iter()
            .enumerate()
            .flat_map(|(rule, sequences)| sequences.iter().map(move |sequence| (rule, sequence)))
    }
}

fn find_nullable_rules(grammar: &ResolvedGrammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.rules.len()];

    let mut changed = true;
    while changed {
        changed = false;
        for (rule, sequence) in grammar.sequences() {
            if nullable[rule] {
                continue;
            }

            let all_nullable = sequence.iter().all(|symbol| match symbol {
                SymbolRef::Empty => true,
                SymbolRef::Rule(other) => nullable[other.as_usize()],
                SymbolRef::Terminal(_) | SymbolRef::EndOfLine => false,
            });

            if all_nullable {
                nullable[rule] = true;
                changed = true;
            }
        }
    }

    nullable
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InChain,
    Done,
}

/// Follows every chain of rules that can be entered without consuming a
/// byte, failing on the first rule that reappears in its own chain.
fn detect_left_recursion(grammar: &ResolvedGrammar, nullable: &[bool]) -> Result<(), GrammarError> {
    fn enter(
        grammar: &ResolvedGrammar,
        nullable: &[bool],
        marks: &mut [Mark],
        rule: usize,
    ) -> Result<(), GrammarError> {
        let mark = marks[rule];
        match mark {
            Mark::Done => return Ok(()),
            Mark::InChain => return Err(GrammarError::LeftRecursion(grammar.name(rule))),
            Mark::Unvisited => marks[rule] = Mark::InChain,
        }

        for sequence in &grammar.rules[rule] {
            for symbol in sequence {
                match symbol {
                    SymbolRef::Rule(callee) => {
                        enter(grammar, nullable, marks, callee.as_usize())?;
                        if !nullable[callee.as_usize()] {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }

        marks[rule] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; grammar.rules.len()];
    for rule in 0..grammar.rules.len() {
        enter(grammar, nullable, &mut marks, rule)?;
    }

    Ok(())
}

/// Computes FIRST of a symbol string. [EOS] in the result marks that the
/// whole string can derive the empty string.
fn first_of_sequence(symbols: &[SymbolRef], first_sets: &[ByteSet]) -> ByteSet {
    let mut first = ByteSet::new();

    for symbol in symbols {
        match symbol {
            SymbolRef::Terminal(bytes) => {
                // resolution guarantees terminals are non-empty.
                if let Some(&byte) = bytes.first() {
                    first.add(byte);
                }
                return first;
            }
            SymbolRef::EndOfLine => {
                first.add(b'\r');
                first.add(b'\n');
                return first;
            }
            SymbolRef::Empty => {
                first.add(EOS);
                return first;
            }
            SymbolRef::Rule(rule) => {
                let rule_first = &first_sets[rule.as_usize()];
                first.union_with(&rule_first.without(EOS));
                if !rule_first.contains(EOS) {
                    return first;
                }
            }
        }
    }

    // every symbol was nullable.
    first.add(EOS);
    first
}

fn build_first_sets(grammar: &ResolvedGrammar, nullable: &[bool]) -> Vec<ByteSet> {
    let mut first_sets = vec![ByteSet::new(); grammar.rules.len()];

    // map nullable rules to epsilon
    for (rule, _) in nullable.iter().enumerate().filter(|(_, nullable)| **nullable) {
        first_sets[rule].add(EOS);
    }

    let mut passes = 0;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;

        for (rule, sequence) in grammar.sequences() {
            let first = first_of_sequence(sequence, &first_sets);
            if first_sets[rule].union_with(&first) {
                changed = true;
            }
        }
    }
    debug!("first sets converged after {} passes", passes);

    first_sets
}

fn build_follow_sets(grammar: &ResolvedGrammar, first_sets: &[ByteSet]) -> Vec<ByteSet> {
    let mut follow_sets = vec![ByteSet::new(); grammar.rules.len()];
    if let Some(start) = follow_sets.first_mut() {
        start.add(EOS);
    }

    let mut passes = 0;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;

        for (lhs, sequence) in grammar.sequences() {
            for (pos, symbol) in sequence.iter().enumerate() {
                let rule = match symbol {
                    SymbolRef::Rule(rule) => rule.as_usize(),
                    _ => continue,
                };

                // everything that can start the remainder follows the rule.
                let rest = first_of_sequence(&sequence[pos + 1..], first_sets);
                if follow_sets[rule].union_with(&rest.without(EOS)) {
                    changed = true;
                }

                // a nullable (or absent) remainder exposes FOLLOW of the lhs.
                if rest.contains(EOS) && rule != lhs {
                    let lhs_follow = follow_sets[lhs];
                    if follow_sets[rule].union_with(&lhs_follow) {
                        changed = true;
                    }
                }
            }
        }
    }
    debug!("follow sets converged after {} passes", passes);

    follow_sets
}

/// The FIRST and FOLLOW sets of every rule in a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarAnalysis {
    names: Vec<String>,
    first: Vec<ByteSet>,
    follow: Vec<ByteSet>,
}

impl GrammarAnalysis {
    fn position<S: AsRef<str>>(&self, rule: S) -> Option<usize> {
        let rule = rule.as_ref();
        self.names.iter().position(|name| name == rule)
    }

    pub fn first<S: AsRef<str>>(&self, rule: S) -> Option<&ByteSet> {
        self.position(rule).map(|idx| &self.first[idx])
    }

    pub fn follow<S: AsRef<str>>(&self, rule: S) -> Option<&ByteSet> {
        self.position(rule).map(|idx| &self.follow[idx])
    }

    pub fn first_by_id(&self, rule: RuleId) -> Option<&ByteSet> {
        self.first.get(rule.as_usize())
    }

    pub fn follow_by_id(&self, rule: RuleId) -> Option<&ByteSet> {
        self.follow.get(rule.as_usize())
    }
}

impl std::fmt::Display for GrammarAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self
            .names
            .iter()
            .zip(self.first.iter().zip(self.follow.iter()))
            .map(|(name, (first, follow))| format!("<{}>: FIRST {} FOLLOW {}", name, first, follow))
            .collect::<Vec<_>>();

        write!(f, "{}", lines.join("\n"))
    }
}

struct Analyzed<'a> {
    grammar: ResolvedGrammar<'a>,
    first: Vec<ByteSet>,
    follow: Vec<ByteSet>,
}

fn analyze_resolved(grammar: &Grammar) -> Result<Analyzed<'_>, GrammarError> {
    let grammar = ResolvedGrammar::resolve(grammar)?;
    let nullable = find_nullable_rules(&grammar);
    detect_left_recursion(&grammar, &nullable)?;

    let first = build_first_sets(&grammar, &nullable);
    let follow = build_follow_sets(&grammar, &first);

    Ok(Analyzed {
        grammar,
        first,
        follow,
    })
}

/// Computes the FIRST and FOLLOW sets of a grammar without building a table.
pub fn analyze(grammar: &Grammar) -> Result<GrammarAnalysis, GrammarError> {
    let analyzed = analyze_resolved(grammar)?;

    Ok(GrammarAnalysis {
        names: analyzed.grammar.names.iter().map(|name| name.to_string()).collect(),
        first: analyzed.first,
        follow: analyzed.follow,
    })
}

fn build_table(analyzed: &Analyzed<'_>) -> Result<LlTable, GrammarError> {
    let grammar = &analyzed.grammar;
    let mut table = LlTable::new();

    for (rule, sequences) in grammar.rules.iter().enumerate() {
        let mut row = Row::new();
        // the grammar alternative owning each cell, for conflict reporting.
        let mut owners = [None::<usize>; LOOKAHEAD_VALUES];
        // epsilon reductions of every alternative share one empty slot.
        let mut epsilon = None;

        let mut claim = |row: &mut Row, byte: u8, slot: usize, owner: usize| {
            let ambiguous = || GrammarError::AmbiguousCell {
                rule: grammar.name(rule),
                byte,
            };
            match owners[byte as usize] {
                Some(existing) if existing != owner => return Err(ambiguous()),
                _ => owners[byte as usize] = Some(owner),
            }
            row.assign_mut(byte, slot).map_err(|_| ambiguous())
        };

        for (owner, sequence) in sequences.iter().enumerate() {
            let first = first_of_sequence(sequence, &analyzed.first);

            let lookahead = first.without(EOS);
            if !lookahead.is_empty() {
                let ops = sequence.iter().filter_map(|symbol| symbol.to_parser_op()).collect();
                let slot = row.push_alternative_mut(ops);
                for byte in lookahead.bytes() {
                    claim(&mut row, byte, slot, owner)?;
                }
            }

            if first.contains(EOS) {
                let slot = *epsilon.get_or_insert_with(|| row.push_alternative_mut(vec![]));
                for byte in analyzed.follow[rule].bytes() {
                    claim(&mut row, byte, slot, owner)?;
                }
            }
        }

        table.insert_row_mut(RuleId(rule), row);
    }

    Ok(table)
}

fn build_name_map(grammar: &ResolvedGrammar) -> NameMap {
    let mut names = NameMap::new();
    for (idx, name) in grammar.names.iter().enumerate() {
        names.insert_mut(NodeKind::Rule(RuleId(idx)), *name);
    }
    names
}

/// Exposes a trait for generating a predictive table from a grammar.
pub trait LlTableGenerator {
    fn generate_table(grammar: &Grammar) -> Result<(LlTable, NameMap), GrammarError>;
}

/// A wrapper type for LL(1) parser tables with a single byte of lookahead.
pub struct Ll1;

impl LlTableGenerator for Ll1 {
    fn generate_table(grammar: &Grammar) -> Result<(LlTable, NameMap), GrammarError> {
        let analyzed = analyze_resolved(grammar)?;
        let table = build_table(&analyzed)?;
        let names = build_name_map(&analyzed.grammar);
        debug!("{}", table.human_readable_format(&names));

        Ok((table, names))
    }
}

/// Generates the LL(1) table and rule names for a grammar.
pub fn generate(grammar: &Grammar) -> Result<(LlTable, NameMap), GrammarError> {
    Ll1::generate_table(grammar)
}
