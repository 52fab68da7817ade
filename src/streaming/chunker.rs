// ABOUTME: Semantic chunker grouping sentence-like fragments into typed, bounded chunks
// ABOUTME: Treats code spans as opaque and preserves every character of the input
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Semantic chunking
//!
//! Text is split into sentence-like fragments (sentence-terminal punctuation
//! followed by whitespace, or a line break). Fenced and inline code spans are
//! never split. Each fragment is classified, and consecutive fragments of the
//! same type are merged up to a soft character cap. A fragment that alone
//! exceeds the cap becomes its own chunk.
//!
//! Fragments keep their trailing whitespace, so concatenating the chunk
//! contents in order yields the original text byte for byte.

use super::classifier::{classify, ContentType};
use super::pacing::TimingProfile;
use crate::config::streaming::StreamingConfig;
use serde::{Deserialize, Serialize};

/// A classified unit of output emitted as one streaming frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Text of the chunk, including trailing whitespace
    pub content: String,
    /// Semantic type of the chunk
    pub content_type: ContentType,
    /// Position of the chunk in the session output
    pub sequence_index: usize,
    /// Pacing assigned by the pacing engine
    pub timing_profile: TimingProfile,
    /// Fence language for code chunks (```` ```rust ```` → `rust`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Chunk {
    fn new(content: String, content_type: ContentType, sequence_index: usize) -> Self {
        let language = if content_type == ContentType::Code {
            fence_language(&content)
        } else {
            None
        };
        Self {
            content,
            content_type,
            sequence_index,
            timing_profile: TimingProfile::default(),
            language,
        }
    }

    /// Number of characters in the chunk
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Whether the chunk contains a blank line
    #[must_use]
    pub fn has_paragraph_break(&self) -> bool {
        self.content.contains("\n\n") || self.content.contains("\r\n\r\n")
    }
}

/// Splits text into typed chunks
#[derive(Debug, Clone, Copy)]
pub struct SemanticChunker {
    cap: usize,
    semantic: bool,
}

impl SemanticChunker {
    /// Semantic chunker with the given soft cap (characters)
    #[must_use]
    pub const fn new(cap: usize) -> Self {
        Self {
            cap,
            semantic: true,
        }
    }

    /// Fixed-window chunker used when semantic chunking is disabled
    #[must_use]
    pub const fn fixed(cap: usize) -> Self {
        Self {
            cap,
            semantic: false,
        }
    }

    /// Chunker matching a session configuration
    #[must_use]
    pub fn from_config(config: &StreamingConfig) -> Self {
        let cap = config.chunk_size.cap();
        if config.semantic_chunking {
            Self::new(cap)
        } else {
            Self::fixed(cap)
        }
    }

    /// Soft cap in characters
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// Chunk a complete text
    ///
    /// Recomputed on every call; the same text always yields the same chunks.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.semantic {
            self.chunk_semantic(text)
        } else {
            self.chunk_fixed(text)
        }
    }

    fn chunk_semantic(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Option<(String, ContentType, usize)> = None;

        for fragment in split_fragments(text) {
            let fragment_type = classify(fragment);
            let fragment_chars = fragment.chars().count();

            match current.as_mut() {
                Some((content, content_type, chars))
                    if *content_type == fragment_type && *chars + fragment_chars <= self.cap =>
                {
                    content.push_str(fragment);
                    *chars += fragment_chars;
                }
                _ => {
                    if let Some((content, content_type, _)) = current.take() {
                        chunks.push(Chunk::new(content, content_type, chunks.len()));
                    }
                    current = Some((fragment.to_owned(), fragment_type, fragment_chars));
                }
            }
        }

        if let Some((content, content_type, _)) = current {
            chunks.push(Chunk::new(content, content_type, chunks.len()));
        }
        chunks
    }

    fn chunk_fixed(&self, text: &str) -> Vec<Chunk> {
        let cap = self.cap.max(1);
        let mut chunks = Vec::new();
        let mut window_start = 0;

        for (count, (byte_index, _)) in text.char_indices().enumerate() {
            if count > 0 && count % cap == 0 {
                let window = &text[window_start..byte_index];
                chunks.push(Chunk::new(window.to_owned(), classify(window), chunks.len()));
                window_start = byte_index;
            }
        }
        let window = &text[window_start..];
        chunks.push(Chunk::new(window.to_owned(), classify(window), chunks.len()));
        chunks
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new(cadence_core::constants::chunking::DEFAULT_CHUNK_CAP)
    }
}

const FENCE: &[u8] = b"```";

const fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn skip_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && is_space(bytes[index]) {
        index += 1;
    }
    index
}

/// Split text into sentence-like fragments without breaking code spans
///
/// All cut points sit right after an ASCII byte, so every slice lands on a
/// char boundary.
fn split_fragments(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut index = 0;
    let mut in_fence = false;
    let mut in_inline = false;

    while index < bytes.len() {
        if bytes[index..].starts_with(FENCE) {
            index += FENCE.len();
            in_fence = !in_fence;
            in_inline = false;
            if !in_fence {
                index = skip_whitespace(bytes, index);
                fragments.push(&text[start..index]);
                start = index;
            }
            continue;
        }
        if in_fence {
            index += 1;
            continue;
        }

        let byte = bytes[index];
        if byte == b'`' {
            in_inline = !in_inline;
            index += 1;
            continue;
        }
        if in_inline && byte != b'\n' {
            index += 1;
            continue;
        }
        in_inline = false;

        let ends_sentence = matches!(byte, b'.' | b'!' | b'?')
            && bytes.get(index + 1).is_some_and(|next| is_space(*next));
        if byte == b'\n' || ends_sentence {
            index = skip_whitespace(bytes, index + 1);
            fragments.push(&text[start..index]);
            start = index;
            continue;
        }
        index += 1;
    }

    if start < bytes.len() {
        fragments.push(&text[start..]);
    }
    fragments
}

fn fence_language(content: &str) -> Option<String> {
    let after_fence = &content[content.find("```")? + 3..];
    let language: String = after_fence
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '_'))
        .collect();
    (!language.is_empty()).then_some(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_fragments_keep_trailing_whitespace() {
        let fragments = split_fragments("One. Two!  Three?\nFour");
        assert_eq!(fragments, vec!["One. ", "Two!  ", "Three?\n", "Four"]);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        assert_eq!(split_fragments("Pi is 3.14 roughly."), vec!["Pi is 3.14 roughly."]);
    }

    #[test]
    fn test_fenced_code_is_opaque() {
        let text = "Look:\n```rust\nlet x = 1. ;\nprintln!(\"a. b\");\n```\nAfter.";
        let fragments = split_fragments(text);
        assert_eq!(
            fragments,
            vec![
                "Look:\n",
                "```rust\nlet x = 1. ;\nprintln!(\"a. b\");\n```\n",
                "After."
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let text = "Start. ```python\nprint(1). x\n";
        let chunks = SemanticChunker::default().chunk(text);
        assert_eq!(joined(&chunks), text);
        assert_eq!(chunks.last().map(|c| c.content_type), Some(ContentType::Code));
    }

    #[test]
    fn test_code_chunk_language() {
        let chunks = SemanticChunker::default().chunk("```rust\nfn main() {}\n```\n");
        assert_eq!(chunks[0].language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_fixed_windows() {
        let chunks = SemanticChunker::fixed(4).chunk("abcdefghij");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunks[2].sequence_index, 2);
    }

    #[test]
    fn test_fixed_windows_respect_multibyte_chars() {
        let text = "héllo wörld ✓✓";
        let chunks = SemanticChunker::fixed(3).chunk(text);
        assert_eq!(joined(&chunks), text);
    }
}
