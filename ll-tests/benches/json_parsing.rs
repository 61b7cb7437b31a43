use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ll_core::grammar::load_grammar;
use ll_core::parser::Parser;

/// Builds a document of `entries` members, each holding a small array and a
/// nested object.
fn document(entries: usize) -> String {
    let members = (0..entries)
        .map(|i| {
            format!(
                "  \"entry{}\": {{\"values\": [{}, -{}.5, true, null], \"label\": \"item {}\"}}",
                i, i, i, i
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!("{{\n{}\n}}\n", members)
}

fn json_parsing(c: &mut Criterion) {
    let grammar = load_grammar(include_str!("../../ll-core/examples/json.bnf")).unwrap();
    let parser = Parser::from_grammar(&grammar).unwrap();

    let mut group = c.benchmark_group("json parsing");
    for entries in [10, 100, 1000] {
        let input = document(entries);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &input, |b, input| {
            b.iter(|| {
                let cst = parser.parse(input).unwrap();
                assert_eq!(cst.span(cst.root()), 0..input.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, json_parsing);
criterion_main!(benches);
