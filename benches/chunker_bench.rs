// ABOUTME: Criterion benchmarks for the streaming engine hot path
// ABOUTME: Measures chunking, pacing annotation and frame compression on generated answers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Criterion benchmarks for chunking and pacing.
//!
//! Answers mix prose, lists, inline and fenced code, and formulas so every
//! classifier branch is exercised.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use cadence_server::streaming::{Codec, Compressor, PacingEngine, SemanticChunker};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const PARAGRAPH: &str = "The scheduler hands each session its own task. \
Sessions never block each other, and pauses wait on a channel! \
Call `resume()` to continue. The cost is roughly $O(n)$ in the output size.\n\n\
## Details\n\
- chunks keep their order\n\
- pauses are clamped\n\n\
```rust\nfn main() {\n    println!(\"a. b\");\n}\n```\n";

fn answer(paragraphs: usize) -> String {
    PARAGRAPH.repeat(paragraphs)
}

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk");

    for (name, paragraphs) in [("short", 1), ("medium", 20), ("long", 200)] {
        let text = answer(paragraphs);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_function(format!("semantic_{name}"), |b| {
            let chunker = SemanticChunker::default();
            b.iter(|| chunker.chunk(black_box(&text)));
        });
        group.bench_function(format!("fixed_{name}"), |b| {
            let chunker = SemanticChunker::fixed(200);
            b.iter(|| chunker.chunk(black_box(&text)));
        });
    }

    group.finish();
}

fn bench_pacing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pacing");
    let chunks = SemanticChunker::default().chunk(&answer(20));
    let pacing = PacingEngine::default();

    group.bench_function("annotate", |b| {
        b.iter(|| {
            let mut chunks = chunks.clone();
            pacing.annotate(black_box(&mut chunks));
            chunks
        });
    });
    group.bench_function("estimate_variable_speed", |b| {
        b.iter(|| pacing.estimate_duration(black_box(&chunks), true));
    });

    group.finish();
}

fn bench_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_chunk");
    let chunk = answer(1);
    group.throughput(Throughput::Bytes(chunk.len() as u64));

    for codec in Codec::PREFERENCE {
        group.bench_function(codec.token(), |b| {
            let mut compressor = Compressor::new(codec, 100);
            b.iter(|| compressor.encode(black_box(chunk.as_bytes())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunking, bench_pacing, bench_compression);
criterion_main!(benches);
