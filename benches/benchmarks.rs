//! Performance benchmarks for bitmask
//!
//! Run with: cargo bench

use bitmask::fs::MemoryFileSystem;
use bitmask::index::{IndexConfig, RepoIndex};
use bitmask::utils::{BloomFilter, extract_trigrams};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// In-memory repository of `files` small Rust sources
fn synthetic_repo(files: usize) -> MemoryFileSystem {
    (0..files)
        .map(|i| {
            let content = format!(
                r#"// File {i}
fn function_{i}() {{
    println!("Hello from function {i}");
    let x = {i} * 2;
    let y = x + 1;
}}

struct Struct{i} {{
    field: i32,
    name: String,
}}
"#,
                i = i
            );
            (format!("src/file_{}.rs", i), content)
        })
        .collect()
}

fn bench_trigram_extraction(c: &mut Criterion) {
    let small_content = b"fn main() { println!(\"hello\"); }";
    let medium_content = small_content.repeat(100);
    let large_content = small_content.repeat(1000);

    let mut group = c.benchmark_group("trigram_extraction");

    group.bench_function("small_32b", |b| {
        b.iter(|| extract_trigrams(black_box(small_content)))
    });

    group.bench_function("medium_3kb", |b| {
        b.iter(|| extract_trigrams(black_box(&medium_content)))
    });

    group.bench_function("large_32kb", |b| {
        b.iter(|| extract_trigrams(black_box(&large_content)))
    });

    group.finish();
}

fn bench_filter_probe(c: &mut Criterion) {
    let content = b"fn main() { println!(\"hello\"); }".repeat(100);
    let filter = BloomFilter::from_trigrams(&extract_trigrams(&content), 0.01);
    let present = extract_trigrams(b"println");
    let absent = extract_trigrams(b"zyxwvut");

    let mut group = c.benchmark_group("filter_probe");
    group.bench_function("present", |b| {
        b.iter(|| filter.might_contain_all(black_box(&present)))
    });
    group.bench_function("absent", |b| {
        b.iter(|| filter.might_contain_all(black_box(&absent)))
    });
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let fs = synthetic_repo(1000);
    let config = IndexConfig::default();

    c.bench_function("build_1k_files", |b| {
        b.iter(|| RepoIndex::build(black_box(&fs), &config))
    });
}

fn bench_query(c: &mut Criterion) {
    let fs = synthetic_repo(20_000);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).expect("Failed to build index");

    let mut group = c.benchmark_group("query");
    for batch_size in [500, 5000, 20_000] {
        let index = index.clone().with_batch_size(batch_size);
        group.bench_with_input(
            BenchmarkId::new("candidates", batch_size),
            &index,
            |b, index| b.iter(|| index.paths_matching_query(black_box(b"function_1234")).count()),
        );
    }
    group.finish();

    c.bench_function("grep_hits", |b| {
        b.iter(|| index.grep_hits(&fs, black_box(b"Hello from function 42")))
    });
}

fn bench_cache(c: &mut Criterion) {
    let fs = synthetic_repo(5000);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).expect("Failed to build index");
    let bytes = index.to_bytes();

    let mut group = c.benchmark_group("cache");
    group.bench_function("encode", |b| b.iter(|| black_box(&index).to_bytes()));
    group.bench_function("decode", |b| {
        b.iter(|| RepoIndex::from_bytes(black_box(&bytes)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_trigram_extraction,
    bench_filter_probe,
    bench_build,
    bench_query,
    bench_cache,
);

criterion_main!(benches);
