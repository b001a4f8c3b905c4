//! Benchmarks for the build pipeline and query-time searcher.
//!
//! Simulates small/medium crawl sizes through the full pipeline: tokenize
//! → accumulate postings → flush runs → k-way merge → partition → build
//! document vectors → query. Criterion configuration (tight confidence
//! interval, longer warm-up) is kept from the teacher's `search_bench.rs`.
//!
//! Run with: cargo bench

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::tempdir;
use webdex::builder::Builder;
use webdex::config::{BuildConfig, SearchConfig};
use webdex::merge::merge_runs;
use webdex::normalize::StemNormalizer;
use webdex::partition::partition_merged;
use webdex::pathmapper::PathMapper;
use webdex::searcher;
use webdex::vectors::VectorStore;

struct CorpusSize {
    name: &'static str,
    docs: usize,
    words_per_doc: usize,
}

const CORPUS_SIZES: &[CorpusSize] = &[
    CorpusSize { name: "small", docs: 20, words_per_doc: 200 },
    CorpusSize { name: "medium", docs: 100, words_per_doc: 400 },
];

const VOCAB: &[&str] = &[
    "rust", "programming", "systems", "engineering", "performance", "database",
    "indexing", "algorithm", "structure", "concurrency", "memory", "compiler",
    "webassembly", "framework", "architecture", "pattern", "the", "a", "is", "are",
];

fn generate_html(words: usize, seed: usize) -> String {
    let title: Vec<&str> = (0..4).map(|i| VOCAB[(seed * 3 + i) % VOCAB.len()]).collect();
    let body: Vec<&str> = (0..words).map(|i| VOCAB[(seed * 7 + i * 3) % VOCAB.len()]).collect();
    format!(
        "<title>{}</title><h1>{}</h1><p>{}</p>",
        title.join(" "),
        title.join(" "),
        body.join(" ")
    )
}

/// Write a synthetic corpus to a temp directory and return it (kept alive
/// for the benchmark's duration).
fn write_corpus(size: &CorpusSize) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    for i in 0..size.docs {
        let html = generate_html(size.words_per_doc, i);
        std::fs::write(
            dir.path().join(format!("doc{i}.json")),
            format!(
                r#"{{"url":"https://example.com/{i}","content":{html:?},"encoding":"utf-8"}}"#
            ),
        )
        .unwrap();
    }
    dir
}

fn build_index(
    corpus_dir: &std::path::Path,
    work_dir: &std::path::Path,
) -> (PathMapper, Vec<webdex::types::PartitionRoute>, VectorStore) {
    let mapper = PathMapper::build(corpus_dir).unwrap();
    let normalizer = StemNormalizer::english();
    let mut builder =
        Builder::new(BuildConfig::default(), &normalizer, work_dir.join("runs"), false).unwrap();

    for (doc_id, path) in mapper.paths() {
        builder.index_document(doc_id, path).unwrap();
    }
    let (runs, _) = builder.finish().unwrap();

    let merged = work_dir.join("merged.bin");
    merge_runs(&runs, &merged, BuildConfig::default().max_postings_per_run).unwrap();

    let partitions_dir = work_dir.join("partitions");
    let routes =
        partition_merged(&merged, &partitions_dir, BuildConfig::default().partition_posting_size)
            .unwrap();

    let vectors = VectorStore::build(&mapper, &normalizer).unwrap();
    (mapper, routes, vectors)
}

fn bench_build_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_pipeline");

    for size in CORPUS_SIZES {
        let corpus = write_corpus(size);
        group.bench_with_input(BenchmarkId::new("build", size.name), &(), |b, ()| {
            b.iter(|| {
                let work = tempdir().unwrap();
                black_box(build_index(corpus.path(), work.path()));
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_query");

    let size = &CORPUS_SIZES[1]; // medium
    let corpus = write_corpus(size);
    let work = tempdir().unwrap();
    let (mapper, routes, vectors) = build_index(corpus.path(), work.path());
    let normalizer = StemNormalizer::english();
    let config = SearchConfig::default();

    let queries = [
        ("single_term", "rust"),
        ("multi_term", "rust programming systems"),
        ("rare_term", "webassembly"),
        ("no_match", "xyznonexistent"),
    ];

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::new("query", name), &query, |b, query| {
            b.iter(|| {
                black_box(
                    searcher::search(
                        query,
                        &work.path().join("partitions"),
                        &routes,
                        &mapper,
                        &vectors,
                        mapper.len() as u64,
                        &normalizer,
                        None,
                        &config,
                    )
                    .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn tight_confidence() -> Criterion {
    Criterion::default()
        .confidence_level(0.99)
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2))
        .significance_level(0.01)
        .noise_threshold(0.02)
}

criterion_group!(
    name = benches;
    config = tight_confidence();
    targets = bench_build_pipeline, bench_search,
);
criterion_main!(benches);
