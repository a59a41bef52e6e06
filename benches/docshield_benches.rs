use criterion::{criterion_group, criterion_main, Criterion};
use docshield::memory::{Document, MemoryIndex, MemoryIndexBuilder};
use docshield::{
    AccessControl, AccessControlConfig, Authorizations, Strategy, VisibilityExpr,
    VisibilityWriter,
};

fn labelled_index(docs: usize) -> MemoryIndex {
    let writer = VisibilityWriter::new();
    let mut builder = MemoryIndexBuilder::new();
    // 16 distinct labels shared across all documents
    for i in 0..docs {
        let label = format!("(g{}&team{})|admin", i % 16, i % 4);
        let doc = writer
            .add_read_label(Document::new().keyword("body", "text"), &label)
            .unwrap();
        builder.add_document(doc);
    }
    builder.build()
}

pub fn docshield_benchmark(c: &mut Criterion) {
    let expr = VisibilityExpr::parse("(a&b)|(c&d&e)|f").unwrap();
    let auths = Authorizations::new(["a", "b", "x", "y"]);
    c.bench_function("evaluate_label", |b| b.iter(|| auths.satisfies(&expr)));

    let index = labelled_index(10_000);
    let config = AccessControlConfig::new(
        Authorizations::new(["g3", "team1", "admin"]),
        Authorizations::empty(),
        Vec::<String>::new(),
    );

    let bitset_config = config.clone().with_strategy(Strategy::Bitset);
    c.bench_function("bind_bitset_policy", |b| {
        b.iter(|| bitset_config.bind(&index).unwrap())
    });

    let acl = config.bind(&index).unwrap();
    c.bench_function("value_cache_decision", |b| {
        b.iter(|| acl.read_access(4_321))
    });
}

criterion_group!(benches, docshield_benchmark);
criterion_main!(benches);
