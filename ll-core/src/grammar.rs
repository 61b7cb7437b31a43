//! The grammar data model and its textual BNF form.

use crate::bnf;

/// The name under which the built-in end-of-line rule is referenced.
pub const END_OF_LINE: &str = "EOL";

/// A single grammar symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A literal byte string.
    Terminal(Vec<u8>),
    /// A reference to a rule by name, or to the built-in `EOL`.
    NonTerminal(String),
    /// Matches the empty string. It must be the only symbol of its sequence.
    Empty,
}

impl Symbol {
    /// Constructs a terminal, normalizing an empty byte string to
    /// [Symbol::Empty].
    pub fn terminal<B: AsRef<[u8]>>(bytes: B) -> Self {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            Self::Empty
        } else {
            Self::Terminal(bytes.to_vec())
        }
    }

    pub fn non_terminal<S: Into<String>>(name: S) -> Self {
        Self::NonTerminal(name.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Writes a terminal using the quoting the BNF front-end reads back:
/// double quotes unless the text holds a `"` and no `'`.
fn write_terminal(f: &mut std::fmt::Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    let single_quoted = bytes.contains(&b'"') && !bytes.contains(&b'\'');
    let quote = if single_quoted { b'\'' } else { b'"' };

    let mut escaped = Vec::with_capacity(bytes.len() + 2);
    escaped.push(quote);
    for &byte in bytes {
        match byte {
            b'\\' => escaped.extend_from_slice(b"\\\\"),
            b'\t' => escaped.extend_from_slice(b"\\t"),
            b'\n' => escaped.extend_from_slice(b"\\n"),
            b'\r' => escaped.extend_from_slice(b"\\r"),
            b'"' if !single_quoted => escaped.extend_from_slice(b"\\\""),
            byte => escaped.push(byte),
        }
    }
    escaped.push(quote);

    write!(f, "{}", String::from_utf8_lossy(&escaped))
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(bytes) => write_terminal(f, bytes),
            Self::NonTerminal(name) => write!(f, "<{}>", name),
            Self::Empty => write!(f, "\"\""),
        }
    }
}

/// One alternative of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence {
    pub symbols: Vec<Symbol>,
}

impl Sequence {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl From<Vec<Symbol>> for Sequence {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self::new(symbols)
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols = self
            .symbols
            .iter()
            .map(|symbol| symbol.to_string())
            .collect::<Vec<_>>();

        write!(f, "{}", symbols.join(" "))
    }
}

/// The ordered alternatives of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Substitution {
    pub sequences: Vec<Sequence>,
}

impl Substitution {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }
}

impl std::fmt::Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sequences = self
            .sequences
            .iter()
            .map(|sequence| sequence.to_string())
            .collect::<Vec<_>>();

        write!(f, "{}", sequences.join(" | "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: String,
    pub tail: Substitution,
}

impl Rule {
    pub fn new<S: Into<String>>(head: S, sequences: Vec<Sequence>) -> Self {
        Self {
            head: head.into(),
            tail: Substitution::new(sequences),
        }
    }

    pub fn sequences(&self) -> &[Sequence] {
        self.tail.sequences()
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> ::= {}", self.head, self.tail)
    }
}

/// An ordered list of rules. The first rule is the start rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Grammar {
    pub rules: Vec<Rule>,
}

impl Grammar {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn start_rule(&self) -> Option<&Rule> {
        self.rules.first()
    }

    pub fn rule<S: AsRef<str>>(&self, head: S) -> Option<&Rule> {
        let head = head.as_ref();
        self.rules.iter().find(|rule| rule.head == head)
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules = self
            .rules
            .iter()
            .map(|rule| rule.to_string())
            .collect::<Vec<_>>();

        write!(f, "{}", rules.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarLoadErrorKind {
    /// The BNF parser itself could not be generated.
    Generation,
    /// The text is not valid BNF.
    Parse,
    InvalidRule,
    InvalidEscape,
    NoRules,
    /// The BNF parser's name map lacks a rule the converter depends on.
    MissingBinding,
}

impl std::fmt::Display for GrammarLoadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation => write!(f, "unable to generate bnf parser"),
            Self::Parse => write!(f, "grammar text is not valid bnf"),
            Self::InvalidRule => write!(f, "provided rule is invalid"),
            Self::InvalidEscape => write!(f, "unknown escape sequence"),
            Self::NoRules => write!(f, "grammar does not define any rules"),
            Self::MissingBinding => write!(f, "bnf node kind is not bound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarLoadError {
    kind: GrammarLoadErrorKind,
    data: Option<String>,
}

impl GrammarLoadError {
    pub fn new(kind: GrammarLoadErrorKind) -> Self {
        Self { kind, data: None }
    }

    pub fn with_data_mut<S: AsRef<str>>(&mut self, data: S) {
        self.data = Some(data.as_ref().to_string())
    }

    pub fn with_data<S: AsRef<str>>(mut self, data: S) -> Self {
        self.with_data_mut(data);
        self
    }

    pub fn kind(&self) -> GrammarLoadErrorKind {
        self.kind
    }
}

impl std::fmt::Display for GrammarLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(ctx) => write!(f, "{}: {}", &self.kind, ctx),
            None => write!(f, "{}", &self.kind),
        }
    }
}

impl std::error::Error for GrammarLoadError {}

/// Parses BNF text into a [Grammar], one rule per line.
///
/// ```
/// use ll_core::grammar::{load_grammar, Symbol};
///
/// let grammar = load_grammar(r#"<greeting> ::= "hello" <EOL> | "hi""#).unwrap();
///
/// assert_eq!(grammar.rules.len(), 1);
/// assert_eq!(
///     grammar.rules[0].sequences()[1].symbols(),
///     &[Symbol::terminal("hi")]
/// );
/// ```
pub fn load_grammar<S: AsRef<str>>(input: S) -> Result<Grammar, GrammarLoadError> {
    let input = input.as_ref();

    let parser = bnf::bnf_parser().map_err(|e| {
        GrammarLoadError::new(GrammarLoadErrorKind::Generation).with_data(e.to_string())
    })?;

    let cst = parser.parse(input).map_err(|e| {
        let err = GrammarLoadError::new(GrammarLoadErrorKind::Parse);
        match e.position() {
            Some(pos) => {
                let lineno = input.as_bytes()[..pos]
                    .iter()
                    .filter(|&&byte| byte == b'\n')
                    .count()
                    + 1;
                err.with_data(format!("lineno {}: {}", lineno, e))
            }
            None => err.with_data(e.to_string()),
        }
    })?;

    let grammar = bnf::BnfBindings::from_names(parser.names())?.to_grammar(&cst, input.as_bytes())?;
    if grammar.rules.is_empty() {
        Err(GrammarLoadError::new(GrammarLoadErrorKind::NoRules))
    } else {
        Ok(grammar)
    }
}
