use ll_core::cst::{Cst, NodeId, Visitor};
use ll_core::grammar::load_grammar;
use ll_core::ll::NodeKind;
use ll_core::parser::Parser;

const JSON_GRAMMAR: &str = include_str!("json.bnf");

const DOCUMENT: &str = r#"
{
  "name": "ll",
  "tags": ["parser", "bytes"],
  "version": 1.5,
  "nested": {"ok": true, "none": null}
}
"#;

/// Records the text of every object key, in document order.
struct KeyCollector<'i> {
    member: NodeKind,
    string: NodeKind,
    input: &'i [u8],
    keys: Vec<String>,
}

impl<'i> Visitor for KeyCollector<'i> {
    fn visit(&mut self, cst: &Cst, id: NodeId) -> bool {
        if cst.kind(id) != self.member {
            return true;
        }

        // a member's first child is its key.
        if let Some(&key) = cst
            .children(id)
            .first()
            .filter(|&&key| cst.kind(key) == self.string)
        {
            let text = cst.text(key, self.input);
            let unquoted = &text[1..text.len() - 1];
            self.keys.push(String::from_utf8_lossy(unquoted).into_owned());
        }

        true
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let grammar = load_grammar(JSON_GRAMMAR)?;
    let parser = Parser::from_grammar(&grammar)?;
    let cst = parser.parse(DOCUMENT)?;

    let names = parser.names();
    let (member, string) = match (names.kind_of("member"), names.kind_of("string")) {
        (Some(member), Some(string)) => (member, string),
        _ => return Err("json grammar lacks <member> or <string>".into()),
    };

    let mut collector = KeyCollector {
        member,
        string,
        input: DOCUMENT.as_bytes(),
        keys: vec![],
    };
    cst.walk(&mut collector);

    println!("{} nodes", cst.len());
    println!("keys: {}", collector.keys.join(", "));

    Ok(())
}
