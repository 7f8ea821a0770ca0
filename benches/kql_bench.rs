use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kql::lexer::tokenize;
use kql::parser::Parser;
use kql::{parse, IndexCompiler, SqlCompiler};
use std::hint::black_box;

const TEST_CASES: &[(&str, &str)] = &[
    ("simple", "user:alice"),
    ("medium", "type:sql duration:>500 NOT status:fail"),
    (
        "complex",
        r#"(type:sql OR type:http) AND timestamp:>=2026-02-10T10:00:00+05:00 name:ab*cd "connection refused" NOT (user:bob OR duration:<=10)"#,
    ),
];

// 基准测试：词法分析性能
fn benchmark_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_performance");

    for &(name, query) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("tokenize", name), &query, |b, &query| {
            b.iter(|| black_box(tokenize(black_box(query)).expect("词法分析应该成功")))
        });
    }

    group.finish();
}

// 基准测试：语法分析性能
fn benchmark_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_performance");

    for &(name, query) in TEST_CASES {
        // 预先词法分析
        let tokens = tokenize(query).expect("词法分析应该成功");

        group.bench_with_input(BenchmarkId::new("parse", name), &tokens, |b, tokens| {
            b.iter(|| {
                let mut parser = Parser::new(black_box(tokens));
                black_box(parser.parse().expect("解析应该成功"))
            })
        });
    }

    group.finish();
}

// 基准测试：两个编译器的性能
fn benchmark_compilers(c: &mut Criterion) {
    let sql = SqlCompiler::new();
    let index = IndexCompiler::new();
    let mut group = c.benchmark_group("compiler_performance");

    for &(name, query) in TEST_CASES {
        let tree = parse(query).expect("解析应该成功");

        group.bench_with_input(BenchmarkId::new("sql", name), &tree, |b, tree| {
            b.iter(|| black_box(sql.compile(black_box(tree.as_ref()))))
        });
        group.bench_with_input(BenchmarkId::new("index", name), &tree, |b, tree| {
            b.iter(|| black_box(index.compile(black_box(tree.as_ref()))))
        });
    }

    group.finish();
}

// 基准测试：完整的端到端处理
fn benchmark_end_to_end(c: &mut Criterion) {
    let sql = SqlCompiler::new();
    let mut group = c.benchmark_group("end_to_end_performance");

    for &(name, query) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("full_pipeline", name), &query, |b, &query| {
            b.iter(|| {
                let tree = parse(black_box(query)).expect("解析应该成功");
                black_box(sql.compile(tree.as_ref()))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lexer,
    benchmark_parser,
    benchmark_compilers,
    benchmark_end_to_end
);
criterion_main!(benches);
