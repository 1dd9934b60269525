//! Criterion benchmarks for Pilum.
//!
//! Covers the build pipeline, dictionary lookups and the postings algebra.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pilum::config::IndexConfig;
use pilum::index::{Index, PersistentIndex};
use pilum::postings::PostingsList;
use pilum::postings::algebra::{intersection, phrase, union_merge};
use pilum::segment::record::{decode_payload, encode_payload};
use pilum::storage::{MemoryStorage, Storage};

/// Generate tokenized documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<Vec<String>> {
    let words = [
        "search", "engine", "full", "text", "index", "query", "document", "field", "term",
        "phrase", "boolean", "segment", "merge", "dictionary", "posting", "offset", "storage",
        "retrieval", "memory", "disk", "record", "probe", "slot", "table",
    ];

    (0..count)
        .map(|i| {
            let doc_length = 50 + (i % 100);
            (0..doc_length)
                .map(|j| {
                    let word_idx = (i * 7 + j * 13) % words.len();
                    // Numbered variants widen the vocabulary past one segment.
                    format!("{}{}", words[word_idx], (i + j) % 50)
                })
                .collect()
        })
        .collect()
}

fn build_index(documents: &[Vec<String>], segment_term_limit: usize) -> PersistentIndex {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let config = IndexConfig {
        segment_term_limit,
        table_size: 10_007,
        ..IndexConfig::default()
    };
    let mut index = PersistentIndex::create(storage, config).unwrap();

    for (doc, tokens) in documents.iter().enumerate() {
        let doc_id = index
            .add_document(&format!("doc{doc}"), tokens.len() as u64)
            .unwrap();
        for (offset, token) in tokens.iter().enumerate() {
            index.insert(token, doc_id, offset as u32).unwrap();
        }
    }
    index.cleanup().unwrap();
    index
}

fn postings(step: u64, count: u64) -> PostingsList {
    let mut list = PostingsList::new();
    for doc_id in (0..count).map(|i| i * step) {
        for offset in 0..4 {
            list.add_occurrence(doc_id, offset * 3 + (doc_id % 3) as u32);
        }
    }
    list
}

/// Benchmark the full build at different segment sizes.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    let documents = generate_test_documents(200);
    let tokens: usize = documents.iter().map(Vec::len).sum();
    group.throughput(Throughput::Elements(tokens as u64));

    for limit in [100, 1_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("segment_term_limit", limit), &limit, |b, &limit| {
            b.iter(|| black_box(build_index(black_box(&documents), limit)))
        });
    }

    group.finish();
}

/// Benchmark dictionary lookups on a built index.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    let documents = generate_test_documents(200);
    let index = build_index(&documents, 500);
    let terms: Vec<&str> = documents[0].iter().take(20).map(String::as_str).collect();

    group.throughput(Throughput::Elements(terms.len() as u64));
    group.bench_function("get_postings", |b| {
        b.iter(|| {
            for term in &terms {
                black_box(index.get_postings(black_box(term)).unwrap());
            }
        })
    });
    group.bench_function("missing_term", |b| {
        b.iter(|| black_box(index.get_postings(black_box("absent")).unwrap()))
    });

    group.finish();
}

/// Benchmark the postings algebra and record codec.
fn bench_postings(c: &mut Criterion) {
    let mut group = c.benchmark_group("postings");

    let a = postings(2, 5_000);
    let b = postings(3, 5_000);
    let c3 = postings(5, 5_000);

    group.bench_function("intersection", |bench| {
        bench.iter(|| black_box(intersection(black_box(&a), black_box(&b))))
    });
    group.bench_function("union_merge", |bench| {
        bench.iter(|| black_box(union_merge(black_box(&a), black_box(&b))))
    });
    group.bench_function("phrase_three_terms", |bench| {
        bench.iter(|| black_box(phrase(black_box(&[&a, &b, &c3]))))
    });

    let payload = encode_payload("posting", &a);
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("encode_payload", |bench| {
        bench.iter(|| black_box(encode_payload(black_box("posting"), black_box(&a))))
    });
    group.bench_function("decode_payload", |bench| {
        bench.iter(|| black_box(decode_payload(black_box(payload.as_bytes())).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_lookup, bench_postings);

criterion_main!(benches);
