use ll_core::Ll1Parseable;
use ll_derive::Ll1;

#[derive(Debug, Ll1, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    #[goal(r"<Term> <ExprTail>")]
    Expr,
    #[production(r#""""#)]
    #[production(r#""+" <Term> <ExprTail>"#)]
    #[production(r#""-" <Term> <ExprTail>"#)]
    ExprTail,
    #[production(r"<Factor> <TermTail>")]
    Term,
    #[production(r#""""#)]
    #[production(r#""*" <Factor> <TermTail>"#)]
    #[production(r#""/" <Factor> <TermTail>"#)]
    TermTail,
    #[production(r"<Number>")]
    #[production(r#""(" <Expr> ")""#)]
    Factor,
    #[production(r"<Digit> <Digits>")]
    Number,
    #[production(r#""""#)]
    #[production(r"<Digit> <Digits>")]
    Digits,
    #[production(r#""0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9""#)]
    Digit,
}

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "(1+23)*4".to_string());

    match Arithmetic::parse_input(&input) {
        Ok(cst) => {
            let names = Arithmetic::parser().names();
            println!("{}", cst.human_readable_format(names, input.as_bytes()));

            let literals = cst
                .leaves()
                .filter(|&id| cst.kind(id) == ll_core::ll::NodeKind::Literal)
                .count();
            println!("{} literal leaves", literals);
        }
        Err(e) => eprintln!("{}", e),
    }
}
