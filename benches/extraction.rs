use std::fs;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use wordwin::{window, VocabularyConfig, VocabularyExtractor, WindowConfig};

const WORDS: [&str; 12] = [
    "river", "stone", "market", "lantern", "harbor", "meadow", "signal", "copper", "thread",
    "orchard", "winter", "canvas",
];

fn build_corpus() -> String {
    let mut text = String::with_capacity(1 << 20);
    let mut state = 0x2545_f491_u32;
    while text.len() < (1 << 20) {
        for _ in 0..16 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            text.push_str(WORDS[state as usize % WORDS.len()]);
            text.push(' ');
        }
        text.push('\n');
    }
    text
}

fn bench_extraction(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.txt");
    let corpus = build_corpus();
    fs::write(&path, &corpus).expect("write corpus");

    let mut group = c.benchmark_group("extract_vocabulary");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    for workers in [1usize, 4] {
        let cfg = VocabularyConfig::builder()
            .num_workers(workers)
            .show_progress(false)
            .build()
            .expect("configuration");
        group.bench_function(BenchmarkId::new("MiB_1", workers), |b| {
            b.iter(|| {
                let artifacts = VocabularyExtractor::new(cfg.clone())
                    .extract_from_paths(&[&path])
                    .expect("extraction");
                let _ = black_box(artifacts);
            });
        });
    }
    group.finish();
}

fn bench_windows(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.txt");
    let corpus = build_corpus();
    fs::write(&path, &corpus).expect("write corpus");
    let cfg = VocabularyConfig::builder()
        .show_progress(false)
        .build()
        .expect("configuration");
    let vocabulary = VocabularyExtractor::new(cfg)
        .extract_from_paths(&[&path])
        .expect("extraction")
        .vocabulary;
    let tokens: Vec<String> = corpus
        .split(' ')
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();
    let window_cfg = WindowConfig::builder()
        .window_sizes([5])
        .skips([0, 1])
        .build()
        .expect("window configuration");

    let mut group = c.benchmark_group("windows");
    group.throughput(Throughput::Elements(tokens.len() as u64));
    group.bench_function("size_5_skips_0_1", |b| {
        b.iter(|| {
            let count = window(tokens.iter(), &vocabulary, window_cfg.clone())
                .expect("windows")
                .count();
            black_box(count)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_extraction, bench_windows);
criterion_main!(benches);
