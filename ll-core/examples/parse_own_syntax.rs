use ll_core::bnf::{bnf_parser, self_grammar};
use ll_core::grammar::load_grammar;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let grammar = self_grammar();
    let text = grammar.to_string();
    println!("{}\n", text);

    let parser = bnf_parser()?;
    let cst = parser.parse(&text)?;
    println!("parsed {} bytes into {} nodes", text.len(), cst.len());

    let reloaded = load_grammar(&text)?;
    if &reloaded == grammar {
        println!("round trip ok: {} rules", reloaded.rules.len());
    } else {
        return Err("reloaded grammar differs from the self grammar".into());
    }

    println!("\n{}", parser.table().human_readable_format(parser.names()));

    Ok(())
}
