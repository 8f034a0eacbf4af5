use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kuery::{parse_kql, parse_lucene, render_as_kql};

const KQL_QUERIES: &[(&str, &str)] = &[
    ("simple", "http.request.method: GET"),
    ("phrase", r#"http.request.body.content: "null pointer""#),
    (
        "boolean",
        "(http.request.method: GET AND http.response.status_code: 200) \
         OR (http.request.method: POST AND http.response.status_code: 400)",
    ),
    (
        "nested",
        r#"user: { first: "Alice" and last: "White" } and status: >= 400"#,
    ),
];

const LUCENE_QUERIES: &[(&str, &str)] = &[
    ("simple", "title:rust"),
    (
        "boolean",
        "title:rust AND (tags:tutorial OR tags:guide) AND year:[2020 TO 2024]",
    ),
    ("modifiers", "content:\"exact phrase\"~2 OR author:john~ OR speed^2.5"),
];

fn bench_parse_kql(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_kql");
    for (name, source) in KQL_QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| parse_kql(black_box(source)).unwrap());
        });
    }
    group.finish();
}

fn bench_parse_lucene(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_lucene");
    for (name, source) in LUCENE_QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| parse_lucene(black_box(source)).unwrap());
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let query = parse_kql(KQL_QUERIES[2].1).unwrap();
    c.bench_function("render_dsl", |b| b.iter(|| black_box(&query).render()));
    c.bench_function("render_kql", |b| {
        b.iter(|| render_as_kql(black_box(&query)).unwrap())
    });
}

criterion_group!(benches, bench_parse_kql, bench_parse_lucene, bench_render);
criterion_main!(benches);
