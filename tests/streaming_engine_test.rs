// ABOUTME: Integration tests for the transport-agnostic streaming engine
// ABOUTME: Covers chunking, classification, pacing bounds, progress and codec negotiation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use cadence_server::config::streaming::{ChunkSize, StreamingConfig};
use cadence_server::streaming::{
    compression::{compress, decompress, Compressor},
    negotiate, parse_accept_encoding, Codec, ContentType, PacingEngine, ProgressTracker,
    SemanticChunker,
};

const SAMPLES: &[&str] = &[
    "Hello. This is `code()`. Done.",
    "Plain prose without any punctuation at the end",
    "# Title\n\nSome intro text. Then a list:\n- one\n- two\n\n```python\nprint('a. b')\n```\nBye!",
    "Formula $a^2 + b^2 = c^2$ holds. The algorithm terminates.\n\nNew paragraph?  Yes.",
    "Unicode works too: héllo wörld. ✓ done! 日本語のテキスト。",
    "   leading whitespace and trailing   ",
];

// ============================================================================
// Chunking
// ============================================================================

#[test]
fn test_code_scenario_with_default_config() {
    let config = StreamingConfig::default();
    let mut chunks =
        SemanticChunker::from_config(&config).chunk("Hello. This is `code()`. Done.");

    assert!(chunks.len() >= 2, "expected at least two chunks, got {chunks:?}");
    let code_index = chunks
        .iter()
        .position(|chunk| chunk.content.contains("`code()`"))
        .expect("a chunk holds the inline code");
    assert_eq!(chunks[code_index].content_type, ContentType::Code);
    assert_eq!(chunks[0].content_type, ContentType::Simple);

    let pacing = PacingEngine::from_config(&config);
    pacing.annotate(&mut chunks);
    let after_code = pacing.boundary_pause(&chunks[code_index], chunks.get(code_index + 1));
    // code boundary (100ms) plus the 80ms code-exit bonus
    assert_eq!(after_code, 180);
    assert_eq!(chunks[code_index].timing_profile.boundary_delay_ms, 180);
}

#[test]
fn test_chunks_reconstruct_input() {
    for cap in [20, 50, 200, 5000] {
        for text in SAMPLES {
            for chunker in [SemanticChunker::new(cap), SemanticChunker::fixed(cap)] {
                let joined: String = chunker
                    .chunk(text)
                    .iter()
                    .map(|chunk| chunk.content.as_str())
                    .collect();
                assert_eq!(&joined, text, "cap {cap} lost characters");
            }
        }
    }
}

#[test]
fn test_chunking_is_deterministic() {
    let chunker = SemanticChunker::default();
    for text in SAMPLES {
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }
}

#[test]
fn test_sequence_indices_are_contiguous() {
    let chunks = SemanticChunker::new(20).chunk(SAMPLES[2]);
    for (expected, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.sequence_index, expected);
    }
}

#[test]
fn test_fenced_block_is_single_code_chunk() {
    let chunks = SemanticChunker::new(20).chunk(SAMPLES[2]);
    let code: Vec<_> = chunks
        .iter()
        .filter(|chunk| chunk.content_type == ContentType::Code)
        .collect();
    assert_eq!(code.len(), 1);
    assert!(code[0].content.starts_with("```python"));
    assert_eq!(code[0].language.as_deref(), Some("python"));
}

#[test]
fn test_soft_cap_groups_same_type_fragments() {
    let text = "One. Two. Three. Four. ";
    let merged = SemanticChunker::new(200).chunk(text);
    assert_eq!(merged.len(), 1);

    let split = SemanticChunker::new(5).chunk(text);
    assert_eq!(split.len(), 4);
}

#[test]
fn test_empty_text_yields_no_chunks() {
    assert!(SemanticChunker::default().chunk("").is_empty());
}

#[test]
fn test_chunk_size_option_controls_cap() {
    let config = StreamingConfig {
        chunk_size: ChunkSize::Chars(25),
        ..StreamingConfig::default()
    };
    assert_eq!(SemanticChunker::from_config(&config).cap(), 25);
}

// ============================================================================
// Pacing
// ============================================================================

#[test]
fn test_boundary_pause_is_clamped() {
    for multiplier in [0.5, 1.0, 2.5] {
        let pacing = PacingEngine::new(true, multiplier, 1.0);
        for text in SAMPLES {
            let chunks = SemanticChunker::new(20).chunk(text);
            for (index, chunk) in chunks.iter().enumerate() {
                let pause = pacing.boundary_pause(chunk, chunks.get(index + 1));
                assert!(
                    pause as f64 <= 500.0 * multiplier,
                    "pause {pause} exceeds clamp for multiplier {multiplier}"
                );
            }
        }
    }
}

#[test]
fn test_formula_followed_by_paragraph_hits_clamp() {
    let chunks = SemanticChunker::default().chunk("$x$ is it.\n\nNext.");
    let pacing = PacingEngine::default();
    // formula boundary 200 + formula bonus 150 + paragraph bonus 200 > 500
    assert_eq!(pacing.boundary_pause(&chunks[0], chunks.get(1)), 500);
}

#[test]
fn test_contextual_pauses_disabled_uses_base_delay() {
    let chunks = SemanticChunker::default().chunk("Hello. This is `code()`. Done.");
    let pacing = PacingEngine::new(false, 1.0, 1.0);
    assert_eq!(pacing.boundary_pause(&chunks[1], chunks.get(2)), 100);
}

#[test]
fn test_speed_multiplier_divides_char_delay() {
    let chunks = SemanticChunker::default().chunk("Plain words");
    let normal = PacingEngine::new(true, 1.0, 1.0).per_char_delay(&chunks[0]);
    let fast = PacingEngine::new(true, 1.0, 3.0).per_char_delay(&chunks[0]);
    assert_eq!(normal, 15);
    assert_eq!(fast, 5);
}

#[test]
fn test_estimate_skips_char_delays_without_variable_speed() {
    let chunks = SemanticChunker::default().chunk("Hello. This is `code()`. Done.");
    let pacing = PacingEngine::default();
    let burst = pacing.estimate_duration(&chunks, false);
    let typed = pacing.estimate_duration(&chunks, true);
    assert_eq!(burst, 50 + 180);
    assert!(typed > burst);
}

// ============================================================================
// Progress
// ============================================================================

#[test]
fn test_progress_percentage_is_monotonic_and_capped() {
    let mut tracker = ProgressTracker::new(7);
    let mut last = 0;
    for step in [0, 1, 1, 3, 5, 7, 9, 12] {
        tracker.update(step);
        let percentage = tracker.percentage();
        assert!(percentage >= last);
        assert!(percentage <= 100);
        last = percentage;
    }
    assert_eq!(last, 100);
}

#[test]
fn test_progress_history_is_bounded() {
    let mut tracker = ProgressTracker::new(100);
    for step in 0..50 {
        tracker.update(step);
    }
    assert_eq!(tracker.history_len(), 10);
}

#[test]
fn test_zero_total_reports_zero_percent() {
    let mut tracker = ProgressTracker::new(0);
    tracker.complete();
    assert_eq!(tracker.percentage(), 0);
}

// ============================================================================
// Compression
// ============================================================================

#[test]
fn test_compression_preference() {
    assert_eq!(negotiate(&[Codec::Gzip, Codec::Deflate]), Codec::Gzip);
    assert_eq!(negotiate(&[Codec::Deflate, Codec::Brotli]), Codec::Brotli);
    assert_eq!(negotiate(&[]), Codec::None);
}

#[test]
fn test_accept_encoding_parsing() {
    assert_eq!(
        parse_accept_encoding("gzip, deflate;q=0.5, br;q=0, zstd"),
        vec![Codec::Gzip, Codec::Deflate]
    );
    assert_eq!(parse_accept_encoding("*"), Codec::PREFERENCE.to_vec());
    assert!(parse_accept_encoding("identity").is_empty());
}

#[test]
fn test_every_codec_decompresses_to_input() {
    let payload = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    for codec in Codec::PREFERENCE {
        let compressed = compress(payload.as_bytes(), codec).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(decompress(&compressed, codec).unwrap(), payload.as_bytes());
    }
}

#[test]
fn test_compressor_respects_threshold() {
    let mut compressor = Compressor::new(Codec::Gzip, 100);
    let small = compressor.encode(b"short text");
    assert!(!small.is_compressed());
    assert_eq!(small.codec, Codec::None);

    let large = compressor.encode("repeat me ".repeat(50).as_bytes());
    assert!(large.is_compressed());
    assert!(compressor.average_ratio().unwrap() < 1.0);
}
