use criterion::{criterion_group, criterion_main, Criterion};

fn ll1_table_generation_from_self_grammar(c: &mut Criterion) {
    let grammar = ll_core::bnf::self_grammar();

    c.bench_function("ll1 table generation from self grammar", |b| {
        b.iter(|| {
            let (table, _) =
                ll_core::generate_table_from_grammar(ll_core::GeneratorKind::Ll1, grammar)
                    .unwrap();

            assert_eq!(table.len(), 25)
        });
    });
}

fn ll1_table_generation_from_ruleset(c: &mut Criterion) {
    let ruleset = include_str!("../../ll-core/examples/json.bnf");

    c.bench_function("ll1 table generation from json ruleset", |b| {
        b.iter(|| {
            let (table, _) =
                ll_core::generate_table_from_ruleset(ll_core::GeneratorKind::Ll1, ruleset)
                    .unwrap();

            assert_eq!(table.len(), 21)
        });
    });
}

criterion_group!(
    benches,
    ll1_table_generation_from_self_grammar,
    ll1_table_generation_from_ruleset
);
criterion_main!(benches);
