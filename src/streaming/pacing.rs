// ABOUTME: Pacing engine assigning per-character and boundary delays to chunks
// ABOUTME: Applies contextual pause bonuses, the 500ms clamp and session multipliers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Pacing
//!
//! Every content type has a base profile (per-character delay and boundary
//! delay). Boundary pauses pick up contextual bonuses when leaving complex or
//! code content, after formulas and after paragraph breaks; the sum is clamped
//! to [`MAX_BOUNDARY_PAUSE_MS`] and then scaled by the pause multiplier.
//! Character delays are divided by the speed multiplier.

use super::chunker::Chunk;
use super::classifier::ContentType;
use crate::config::streaming::StreamingConfig;
use cadence_core::constants::pacing::{
    CLAUSE_PUNCTUATION_FACTOR, CODE_BOUNDARY_MS, CODE_CHAR_MS, CODE_EXIT_BONUS_MS,
    COMPLEX_BOUNDARY_MS, COMPLEX_CHAR_MS, COMPLEX_EXIT_BONUS_MS, FORMULA_BONUS_MS,
    FORMULA_BOUNDARY_MS, FORMULA_CHAR_MS, HEADER_BOUNDARY_MS, HEADER_CHAR_MS, LIST_BOUNDARY_MS,
    LIST_CHAR_MS, MAX_BOUNDARY_PAUSE_MS, PARAGRAPH_BONUS_MS, SENTENCE_PUNCTUATION_FACTOR,
    SIMPLE_BOUNDARY_MS, SIMPLE_CHAR_MS,
};
use serde::{Deserialize, Serialize};

/// Delays attached to a chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingProfile {
    /// Delay between characters in variable-speed mode
    pub per_char_delay_ms: u64,
    /// Pause after the chunk before the next one
    pub boundary_delay_ms: u64,
}

/// Base (char, boundary) delays for a content type
#[must_use]
pub const fn base_profile(content_type: ContentType) -> (u64, u64) {
    match content_type {
        ContentType::Simple => (SIMPLE_CHAR_MS, SIMPLE_BOUNDARY_MS),
        ContentType::Complex => (COMPLEX_CHAR_MS, COMPLEX_BOUNDARY_MS),
        ContentType::Code => (CODE_CHAR_MS, CODE_BOUNDARY_MS),
        ContentType::Formula => (FORMULA_CHAR_MS, FORMULA_BOUNDARY_MS),
        ContentType::List => (LIST_CHAR_MS, LIST_BOUNDARY_MS),
        ContentType::Header => (HEADER_CHAR_MS, HEADER_BOUNDARY_MS),
    }
}

fn scale(value_ms: f64) -> u64 {
    if value_ms.is_finite() && value_ms > 0.0 {
        value_ms.round() as u64
    } else {
        0
    }
}

/// Computes delays from a session's pacing options
#[derive(Debug, Clone, Copy)]
pub struct PacingEngine {
    contextual_pauses: bool,
    pause_multiplier: f64,
    speed_multiplier: f64,
}

impl PacingEngine {
    /// Engine with explicit options
    #[must_use]
    pub const fn new(contextual_pauses: bool, pause_multiplier: f64, speed_multiplier: f64) -> Self {
        Self {
            contextual_pauses,
            pause_multiplier,
            speed_multiplier,
        }
    }

    /// Engine matching a session configuration
    #[must_use]
    pub const fn from_config(config: &StreamingConfig) -> Self {
        Self::new(
            config.contextual_pauses,
            config.pause_multiplier,
            config.speed_multiplier,
        )
    }

    /// Delay between characters of a chunk
    #[must_use]
    pub fn per_char_delay(&self, chunk: &Chunk) -> u64 {
        let (char_ms, _) = base_profile(chunk.content_type);
        scale(char_ms as f64 / self.speed_multiplier)
    }

    /// Pause after `chunk`, given the chunk that follows it
    #[must_use]
    pub fn boundary_pause(&self, chunk: &Chunk, next: Option<&Chunk>) -> u64 {
        let (_, boundary_ms) = base_profile(chunk.content_type);
        let mut pause = boundary_ms;

        if self.contextual_pauses {
            let type_changes = next.is_some_and(|n| n.content_type != chunk.content_type);
            if type_changes && chunk.content_type == ContentType::Complex {
                pause += COMPLEX_EXIT_BONUS_MS;
            }
            if type_changes && chunk.content_type == ContentType::Code {
                pause += CODE_EXIT_BONUS_MS;
            }
            if chunk.content_type == ContentType::Formula {
                pause += FORMULA_BONUS_MS;
            }
            if chunk.has_paragraph_break() {
                pause += PARAGRAPH_BONUS_MS;
            }
        }

        scale(pause.min(MAX_BOUNDARY_PAUSE_MS) as f64 * self.pause_multiplier)
    }

    /// Delay after emitting `ch` in character-by-character mode
    ///
    /// Sentence punctuation adds a share of the scaled base boundary delay and
    /// clause punctuation adds half a character delay.
    #[must_use]
    pub fn char_delay(&self, chunk: &Chunk, ch: char) -> u64 {
        let char_delay = self.per_char_delay(chunk);
        match ch {
            '.' | '!' | '?' => {
                let (_, boundary_ms) = base_profile(chunk.content_type);
                let scaled_boundary = boundary_ms as f64 * self.pause_multiplier;
                char_delay + scale(scaled_boundary * SENTENCE_PUNCTUATION_FACTOR)
            }
            ',' | ';' | ':' => char_delay + scale(char_delay as f64 * CLAUSE_PUNCTUATION_FACTOR),
            _ => char_delay,
        }
    }

    /// Fill in the timing profile of every chunk
    pub fn annotate(&self, chunks: &mut [Chunk]) {
        for index in 0..chunks.len() {
            let profile = TimingProfile {
                per_char_delay_ms: self.per_char_delay(&chunks[index]),
                boundary_delay_ms: self.boundary_pause(&chunks[index], chunks.get(index + 1)),
            };
            chunks[index].timing_profile = profile;
        }
    }

    /// Expected wall-clock duration of emitting `chunks`
    ///
    /// Counts character delays only when `variable_speed` is set; the last
    /// chunk has no boundary pause.
    #[must_use]
    pub fn estimate_duration(&self, chunks: &[Chunk], variable_speed: bool) -> u64 {
        let mut total = 0u64;
        for (index, chunk) in chunks.iter().enumerate() {
            if variable_speed {
                total += chunk.content.chars().map(|ch| self.char_delay(chunk, ch)).sum::<u64>();
            }
            if index + 1 < chunks.len() {
                total += self.boundary_pause(chunk, chunks.get(index + 1));
            }
        }
        total
    }
}

impl Default for PacingEngine {
    fn default() -> Self {
        Self::new(true, 1.0, 1.0)
    }
}
