use ll_core::{
    grammar::Grammar,
    ll::{Callee, LlTable, NameMap, NodeKind, ParserOp, Row, RuleId},
};
use proc_macro2::{Literal, Span, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::{parse_macro_input, spanned::Spanned, Data, DataEnum, DeriveInput, Fields, Generics, Ident, LitStr};

/// The right-hand side of a rule as written in an attribute.
struct Production(LitStr);

impl Production {
    fn value(&self) -> String {
        self.0.value()
    }

    fn span(&self) -> Span {
        self.0.span()
    }
}

enum GrammarItemAttributeKind {
    Goal,
    Production,
}

/// Represents each variant in the grammar enum with it's associated
/// alternatives.
struct ProductionAnnotatedEnumVariant {
    non_terminal: Ident,
    is_goal: bool,
    /// The alternatives as sourced from attributes, in declaration order.
    productions: Vec<Production>,
}

/// Represents each variant of the enum representing the grammar.
struct GrammarAnnotatedEnum {
    span: Span,
    enum_ident: Ident,
    enum_generics: Generics,
    variant_metadata: Vec<ProductionAnnotatedEnumVariant>,
}

fn parse(input: DeriveInput) -> Result<GrammarAnnotatedEnum, syn::Error> {
    let input_span = input.span();
    let enum_ident = input.ident;
    let enum_generics = input.generics;

    let enum_variants = match input.data {
        Data::Enum(DataEnum { variants, .. }) => variants,
        _ => {
            return Err(syn::Error::new(
                input_span,
                "derive macro only works on enums",
            ))
        }
    };

    enum_variants
        .into_iter()
        .map(|variant| {
            let variant_span = variant.span();

            if !matches!(variant.fields, Fields::Unit) {
                return Err(syn::Error::new(
                    variant.fields.span(),
                    format!("variant({}) must not have fields", &variant.ident),
                ));
            }

            let grammar_attributes = variant.attrs.iter().filter_map(|attr| {
                if attr.path().is_ident("production") {
                    Some((GrammarItemAttributeKind::Production, attr))
                } else if attr.path().is_ident("goal") {
                    Some((GrammarItemAttributeKind::Goal, attr))
                } else {
                    None
                }
            });

            let mut is_goal = false;
            let mut goal_productions = vec![];
            let mut productions = vec![];
            for (kind, attr) in grammar_attributes {
                let production = attr.parse_args::<LitStr>().map(Production)?;
                // a line break would start a new rule in the rendered grammar.
                if production.value().contains(['\n', '\r']) {
                    return Err(syn::Error::new(
                        production.span(),
                        "a production must not contain line breaks",
                    ));
                }
                match kind {
                    GrammarItemAttributeKind::Goal if is_goal => {
                        return Err(syn::Error::new(
                            attr.span(),
                            "a variant may only be marked as goal once",
                        ))
                    }
                    GrammarItemAttributeKind::Goal => {
                        is_goal = true;
                        goal_productions.push(production);
                    }
                    GrammarItemAttributeKind::Production => productions.push(production),
                }
            }

            // the goal alternative is always listed first.
            goal_productions.append(&mut productions);
            if goal_productions.is_empty() {
                return Err(syn::Error::new(
                    variant_span,
                    "expected at least one goal or production attribute",
                ));
            }

            Ok(ProductionAnnotatedEnumVariant {
                non_terminal: variant.ident,
                is_goal,
                productions: goal_productions,
            })
        })
        .collect::<Result<_, _>>()
        .map(|variant_metadata| GrammarAnnotatedEnum {
            span: input_span,
            enum_ident,
            enum_generics,
            variant_metadata,
        })
}

/// Renders the annotated enum as BNF text with the goal rule first and loads
/// it into a [Grammar].
fn generate_grammar_from_annotated_enum(
    annotated_enum: &GrammarAnnotatedEnum,
) -> Result<Grammar, syn::Error> {
    let mut goals = annotated_enum
        .variant_metadata
        .iter()
        .filter(|variant| variant.is_goal);
    let goal = goals
        .next()
        .ok_or_else(|| syn::Error::new(annotated_enum.span, "No goal production defined"))?;
    if let Some(duplicate) = goals.next() {
        return Err(syn::Error::new(
            duplicate.non_terminal.span(),
            "multiple goals defined",
        ));
    }

    let ordered_variants = std::iter::once(goal).chain(
        annotated_enum
            .variant_metadata
            .iter()
            .filter(|variant| !variant.is_goal),
    );

    let mut lines = vec![];
    for variant in ordered_variants {
        // each alternative is checked alone so errors point at its attribute.
        for production in &variant.productions {
            let line = format!("<{}> ::= {}", variant.non_terminal, production.value());
            ll_core::grammar::load_grammar(&line)
                .map_err(|e| syn::Error::new(production.span(), e.to_string()))?;
        }

        let rhs = variant
            .productions
            .iter()
            .map(Production::value)
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(format!("<{}> ::= {}", variant.non_terminal, rhs));
    }

    ll_core::grammar::load_grammar(lines.join("\n"))
        .map_err(|e| syn::Error::new(annotated_enum.span, e.to_string()))
}

struct ParserOpCodeGen<'a>(&'a ParserOp);

impl<'a> ToTokens for ParserOpCodeGen<'a> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let stream = match self.0 {
            ParserOp::Invoke(Callee::Rule(rule)) => {
                let rule = rule.as_usize();
                quote!(ParserOp::Invoke(Callee::Rule(RuleId::unchecked_new(#rule))))
            }
            ParserOp::Invoke(Callee::EndOfLine) => quote!(ParserOp::Invoke(Callee::EndOfLine)),
            ParserOp::MatchLiteral(bytes) => {
                let bytes = Literal::byte_string(bytes);
                quote!(ParserOp::MatchLiteral(Box::from(&#bytes[..])))
            }
            ParserOp::EndOfInput => quote!(ParserOp::EndOfInput),
        };

        tokens.extend(stream)
    }
}

/// Generates the construction of a single table row.
struct RowCodeGen<'a> {
    rule: RuleId,
    row: &'a Row,
}

impl<'a> ToTokens for RowCodeGen<'a> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let rule = self.rule.as_usize();

        let alternatives = self.row.alternatives().iter().enumerate().map(|(idx, ops)| {
            let ops = ops.iter().map(ParserOpCodeGen);
            let lookahead = self
                .row
                .cells()
                .filter(|(_, alternative)| *alternative == idx)
                .map(|(byte, _)| byte);

            quote!(
                let alternative = row.push_alternative_mut(vec![#(#ops),*]);
                for byte in [#(#lookahead),*] {
                    row.assign_mut(byte, alternative)
                        .expect("derived table cells are checked for conflicts at compile time");
                }
            )
        });

        tokens.extend(quote!(
            {
                let mut row = Row::new();
                #(#alternatives)*
                table.insert_row_mut(RuleId::unchecked_new(#rule), row);
            }
        ))
    }
}

/// Generates a lazily initialized static parser holding the table.
struct ParserCodeGen<'a> {
    table: &'a LlTable,
    names: &'a NameMap,
}

impl<'a> ToTokens for ParserCodeGen<'a> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let rows = self.table.rows().map(|(rule, row)| RowCodeGen { rule, row });
        let names = self.names.iter().filter_map(|(kind, name)| match kind {
            NodeKind::Rule(rule) => {
                let rule = rule.as_usize();
                Some(quote!(names.insert_mut(NodeKind::Rule(RuleId::unchecked_new(#rule)), #name);))
            }
            _ => None,
        });

        tokens.extend(quote!(
            fn parser() -> &'static ::ll_core::parser::Parser {
                #[allow(unused_imports)]
                use ::ll_core::ll::{Callee, LlTable, NameMap, NodeKind, ParserOp, Row, RuleId};

                static PARSER: ::std::sync::OnceLock<::ll_core::parser::Parser> =
                    ::std::sync::OnceLock::new();

                PARSER.get_or_init(|| {
                    let mut table = LlTable::new();
                    #(#rows)*

                    let mut names = NameMap::new();
                    #(#names)*

                    ::ll_core::parser::Parser::new(table, names)
                })
            }
        ))
    }
}

/// Generates the mapping from rule kinds back to enum variants.
struct NodeKindMatcherCodeGen<'a> {
    names: &'a NameMap,
}

impl<'a> ToTokens for NodeKindMatcherCodeGen<'a> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variants = self.names.iter().filter_map(|(kind, name)| match kind {
            NodeKind::Rule(rule) => {
                let rule = rule.as_usize();
                let variant = format_ident!("{}", name);
                Some(quote!(#rule => ::core::option::Option::Some(Self::#variant),))
            }
            _ => None,
        });

        tokens.extend(quote!(
            fn from_node_kind(kind: ::ll_core::ll::NodeKind) -> ::core::option::Option<Self> {
                match kind {
                    ::ll_core::ll::NodeKind::Rule(rule) => match rule.as_usize() {
                        #(#variants)*
                        _ => ::core::option::Option::None,
                    },
                    _ => ::core::option::Option::None,
                }
            }
        ))
    }
}

fn codegen(annotated_enum: &GrammarAnnotatedEnum, table: &LlTable, names: &NameMap) -> TokenStream {
    let enum_ident = &annotated_enum.enum_ident;
    let (impl_generics, ty_generics, where_clause) = annotated_enum.enum_generics.split_for_impl();

    let parser_codegen = ParserCodeGen { table, names };
    let node_kind_codegen = NodeKindMatcherCodeGen { names };

    quote!(
        impl #impl_generics ::ll_core::Ll1Parseable for #enum_ident #ty_generics #where_clause {
            #parser_codegen
            #node_kind_codegen
        }
    )
}

fn build_ll1_parser_impl(input: DeriveInput) -> Result<TokenStream, syn::Error> {
    use ll_core::{generate_table_from_grammar, GeneratorKind};

    let annotated_enum = parse(input)?;
    let grammar = generate_grammar_from_annotated_enum(&annotated_enum)?;
    let (table, names) = generate_table_from_grammar(GeneratorKind::Ll1, &grammar)
        .map_err(|e| syn::Error::new(annotated_enum.span, e.to_string()))?;

    Ok(codegen(&annotated_enum, &table, &names))
}

/// The dispatcher method for enums annotated with the Ll1 derive.
#[proc_macro_derive(Ll1, attributes(goal, production))]
pub fn build_ll1_parser(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    build_ll1_parser_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
