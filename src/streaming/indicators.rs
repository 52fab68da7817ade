// ABOUTME: Typing and progress indicators tracked per streaming session
// ABOUTME: Produces snapshot payloads with animation frames, percentages, ETA and throughput
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

use cadence_core::constants::indicators::{PROGRESS_HISTORY_CAPACITY, THROUGHPUT_WINDOW};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::time::Instant;

/// What the assistant is visibly doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingPhase {
    /// Waiting for the first increment
    Thinking,
    /// Emitting character by character
    Typing,
    /// Increments are arriving and being chunked
    Processing,
    /// Emitting whole chunks
    Streaming,
    /// Emission is paused
    Paused,
    /// Session finished
    Complete,
}

/// Snapshot of the typing indicator sent to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSnapshot {
    /// Current phase
    pub phase: TypingPhase,
    /// Animation frame, increases on every snapshot
    pub frame: u64,
    /// Whether the indicator should be shown
    pub active: bool,
}

/// Typing indicator state holder
#[derive(Debug)]
pub struct TypingIndicator {
    phase: TypingPhase,
    frame: u64,
}

impl TypingIndicator {
    /// Indicator starting in the `thinking` phase
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: TypingPhase::Thinking,
            frame: 0,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> TypingPhase {
        self.phase
    }

    /// Switch phase; returns whether it changed
    pub fn set_phase(&mut self, phase: TypingPhase) -> bool {
        let changed = self.phase != phase;
        self.phase = phase;
        changed
    }

    /// Advance the animation frame and describe the current state
    pub fn snapshot(&mut self) -> TypingSnapshot {
        self.frame += 1;
        TypingSnapshot {
            phase: self.phase,
            frame: self.frame,
            active: self.phase != TypingPhase::Complete,
        }
    }
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress snapshot sent to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Chunks emitted so far
    pub current_step: u64,
    /// Total chunks
    pub total_steps: u64,
    /// Rounded completion percentage, 0..=100
    pub percentage: u8,
    /// Estimated remaining time once at least one step completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_ms: Option<u64>,
    /// Steps per millisecond over the recent history
    pub throughput: f64,
}

/// Tracks emission progress with a bounded history of updates
#[derive(Debug)]
pub struct ProgressTracker {
    current_step: u64,
    total_steps: u64,
    started_at: Instant,
    history: VecDeque<(u64, Instant)>,
}

impl ProgressTracker {
    /// Tracker starting now
    #[must_use]
    pub fn new(total_steps: u64) -> Self {
        Self {
            current_step: 0,
            total_steps,
            started_at: Instant::now(),
            history: VecDeque::with_capacity(PROGRESS_HISTORY_CAPACITY),
        }
    }

    /// Record that `step` steps are done
    pub fn update(&mut self, step: u64) {
        self.current_step = step;
        if self.history.len() == PROGRESS_HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back((step, Instant::now()));
    }

    /// Force completion
    pub fn complete(&mut self) {
        self.update(self.total_steps);
    }

    /// Number of retained history entries
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Completion percentage, capped at 100
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total_steps == 0 {
            return 0;
        }
        let raw = (100.0 * self.current_step as f64 / self.total_steps as f64).round();
        raw.min(100.0) as u8
    }

    /// Remaining time estimated from the average step duration so far
    #[must_use]
    pub fn eta_ms(&self) -> Option<u64> {
        if self.current_step == 0 {
            return None;
        }
        let elapsed = self.started_at.elapsed().as_millis() as f64;
        let remaining = self.total_steps.saturating_sub(self.current_step) as f64;
        Some((elapsed / self.current_step as f64 * remaining).round() as u64)
    }

    /// Steps per millisecond over the most recent history entries
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let window: Vec<&(u64, Instant)> =
            self.history.iter().rev().take(THROUGHPUT_WINDOW).collect();
        let (Some(newest), Some(oldest)) = (window.first(), window.last()) else {
            return 0.0;
        };
        let span_ms = newest.1.duration_since(oldest.1).as_secs_f64() * 1000.0;
        if span_ms <= 0.0 {
            return 0.0;
        }
        newest.0.saturating_sub(oldest.0) as f64 / span_ms
    }

    /// Current state for a progress frame
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            current_step: self.current_step,
            total_steps: self.total_steps,
            percentage: self.percentage(),
            eta_ms: self.eta_ms(),
            throughput: self.throughput(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_frame_increments_per_snapshot() {
        let mut typing = TypingIndicator::new();
        assert_eq!(typing.snapshot().frame, 1);
        assert!(typing.set_phase(TypingPhase::Streaming));
        assert!(!typing.set_phase(TypingPhase::Streaming));
        let snapshot = typing.snapshot();
        assert_eq!(snapshot.frame, 2);
        assert_eq!(snapshot.phase, TypingPhase::Streaming);
    }

    #[test]
    fn test_complete_indicator_is_inactive() {
        let mut typing = TypingIndicator::new();
        typing.set_phase(TypingPhase::Complete);
        assert!(!typing.snapshot().active);
    }

    #[tokio::test]
    async fn test_zero_total_is_zero_percent() {
        let progress = ProgressTracker::new(0);
        assert_eq!(progress.percentage(), 0);
        assert_eq!(progress.eta_ms(), None);
    }

    #[tokio::test]
    async fn test_percentage_is_capped() {
        let mut progress = ProgressTracker::new(3);
        progress.update(1);
        assert_eq!(progress.percentage(), 33);
        progress.update(5);
        assert_eq!(progress.percentage(), 100);
    }
}
