use crate::cst::{Cst, NodeId};
use crate::grammar::{Grammar, GrammarLoadError, GrammarLoadErrorKind, Rule, Sequence, Symbol};
use crate::ll::{NameMap, NodeKind};

/// Node kinds of the BNF grammar that carry meaning for conversion, resolved
/// by rule name from a parser's [NameMap].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BnfBindings {
    /// One `<head> ::= ...` line.
    content: NodeKind,
    rule_name: NodeKind,
    expression: NodeKind,
    /// One alternative of an expression.
    list: NodeKind,
    term: NodeKind,
    literal: NodeKind,
    /// The quoted text of a literal, for either quote style.
    text: [NodeKind; 2],
    escape_sequence: NodeKind,
    escaped_char: NodeKind,
}

fn bind(names: &NameMap, name: &str) -> Result<NodeKind, GrammarLoadError> {
    names.kind_of(name).ok_or_else(|| {
        GrammarLoadError::new(GrammarLoadErrorKind::MissingBinding).with_data(format!("<{}>", name))
    })
}

fn unescape(escaped: &[u8]) -> Option<u8> {
    match escaped {
        b"t" => Some(b'\t'),
        b"n" => Some(b'\n'),
        b"r" => Some(b'\r'),
        b"\"" => Some(b'"'),
        b"'" => Some(b'\''),
        b"\\" => Some(b'\\'),
        _ => None,
    }
}

/// Returns the outermost nodes under `start` that satisfy `is_match`, in
/// input order. Matching nodes are not descended into.
fn collect_outermost<F>(cst: &Cst, start: NodeId, is_match: F) -> Vec<NodeId>
where
    F: Fn(NodeKind) -> bool,
{
    let mut found = vec![];
    cst.walk_from(start, &mut |cst: &Cst, id| {
        if is_match(cst.kind(id)) {
            found.push(id);
            false
        } else {
            true
        }
    });

    found
}

/// Returns the first node of `kind` under `start` in depth-first order.
fn find_first(cst: &Cst, start: NodeId, kind: NodeKind) -> Option<NodeId> {
    let mut found = None;
    cst.walk_from(start, &mut |cst: &Cst, id| {
        if found.is_some() {
            return false;
        }
        if cst.kind(id) == kind {
            found = Some(id);
            return false;
        }
        true
    });

    found
}

impl BnfBindings {
    pub fn from_names(names: &NameMap) -> Result<Self, GrammarLoadError> {
        Ok(Self {
            content: bind(names, "content")?,
            rule_name: bind(names, "rule-name")?,
            expression: bind(names, "expression")?,
            list: bind(names, "list")?,
            term: bind(names, "term")?,
            literal: bind(names, "literal")?,
            text: [bind(names, "text1")?, bind(names, "text2")?],
            escape_sequence: bind(names, "escape-sequence")?,
            escaped_char: bind(names, "escaped-char")?,
        })
    }

    /// Converts the CST of parsed BNF text back into a [Grammar].
    pub fn to_grammar(&self, cst: &Cst, input: &[u8]) -> Result<Grammar, GrammarLoadError> {
        let content = self.content;
        let rules = collect_outermost(cst, cst.root(), |kind| kind == content)
            .into_iter()
            .map(|id| self.to_rule(cst, id, input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Grammar::new(rules))
    }

    fn invalid_rule(cst: &Cst, id: NodeId, input: &[u8], reason: &str) -> GrammarLoadError {
        GrammarLoadError::new(GrammarLoadErrorKind::InvalidRule).with_data(format!(
            "{} in `{}`",
            reason,
            String::from_utf8_lossy(cst.text(id, input))
        ))
    }

    fn to_rule(&self, cst: &Cst, content: NodeId, input: &[u8]) -> Result<Rule, GrammarLoadError> {
        let head = find_first(cst, content, self.rule_name)
            .ok_or_else(|| Self::invalid_rule(cst, content, input, "missing rule name"))?;
        let expression = find_first(cst, content, self.expression)
            .ok_or_else(|| Self::invalid_rule(cst, content, input, "missing expression"))?;

        let list = self.list;
        let sequences = collect_outermost(cst, expression, |kind| kind == list)
            .into_iter()
            .map(|id| self.to_sequence(cst, id, input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule::new(
            String::from_utf8_lossy(cst.text(head, input)),
            sequences,
        ))
    }

    fn to_sequence(&self, cst: &Cst, list: NodeId, input: &[u8]) -> Result<Sequence, GrammarLoadError> {
        let term = self.term;
        collect_outermost(cst, list, |kind| kind == term)
            .into_iter()
            .map(|id| self.to_symbol(cst, id, input))
            .collect::<Result<Vec<_>, _>>()
            .map(Sequence::new)
    }

    fn to_symbol(&self, cst: &Cst, term: NodeId, input: &[u8]) -> Result<Symbol, GrammarLoadError> {
        if let Some(literal) = find_first(cst, term, self.literal) {
            return self.to_terminal(cst, literal, input);
        }

        find_first(cst, term, self.rule_name)
            .map(|name| Symbol::non_terminal(String::from_utf8_lossy(cst.text(name, input))))
            .ok_or_else(|| Self::invalid_rule(cst, term, input, "unknown symbol"))
    }

    fn to_terminal(&self, cst: &Cst, literal: NodeId, input: &[u8]) -> Result<Symbol, GrammarLoadError> {
        let [text1, text2] = self.text;
        let text = collect_outermost(cst, literal, |kind| kind == text1 || kind == text2)
            .into_iter()
            .next()
            .ok_or_else(|| Self::invalid_rule(cst, literal, input, "missing literal text"))?;

        let escape_sequence = self.escape_sequence;
        let pieces = collect_outermost(cst, text, |kind| {
            kind == NodeKind::Literal || kind == escape_sequence
        });

        let mut bytes = Vec::with_capacity(cst.span(text).len());
        for piece in pieces {
            if cst.kind(piece) == NodeKind::Literal {
                bytes.extend_from_slice(cst.text(piece, input));
                continue;
            }

            let escaped = find_first(cst, piece, self.escaped_char)
                .map(|id| cst.text(id, input))
                .unwrap_or_default();
            let byte = unescape(escaped).ok_or_else(|| {
                GrammarLoadError::new(GrammarLoadErrorKind::InvalidEscape)
                    .with_data(String::from_utf8_lossy(cst.text(piece, input)))
            })?;
            bytes.push(byte);
        }

        // an empty literal denotes the empty symbol.
        Ok(Symbol::terminal(bytes))
    }
}
