// ABOUTME: Content classifier mapping text fragments onto semantic content types
// ABOUTME: Pattern precedence: code > formula > header > list > complex vocabulary > simple
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Cadence Streaming

//! Content classification
//!
//! A pure, deterministic function from a text fragment to a [`ContentType`].
//! When several patterns match, the first in this order wins: fenced or inline
//! code, mathematical formula delimiters, heading markers, list markers, the
//! complex-concept vocabulary, and finally `simple`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Semantic type of a chunk of generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain prose
    Simple,
    /// Fenced or inline code
    Code,
    /// Mathematical notation
    Formula,
    /// Bulleted or numbered list items
    List,
    /// Markdown heading
    Header,
    /// Prose dense with technical concepts
    Complex,
}

impl ContentType {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Code => "code",
            Self::Formula => "formula",
            Self::List => "list",
            Self::Header => "header",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Words that mark a fragment as conceptually dense
const COMPLEX_VOCABULARY: &[&str] = &[
    "algorithm",
    "architecture",
    "abstraction",
    "asynchronous",
    "complexity",
    "concurrency",
    "distributed",
    "hypothesis",
    "implementation",
    "infrastructure",
    "methodology",
    "optimization",
    "paradigm",
    "polymorphism",
    "recursion",
    "synchronization",
    "theorem",
];

struct ClassifierPatterns {
    code: Option<Regex>,
    formula: Option<Regex>,
    header: Option<Regex>,
    list: Option<Regex>,
    complex: Option<Regex>,
}

static PATTERNS: OnceLock<ClassifierPatterns> = OnceLock::new();

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Classifier pattern failed to compile");
            None
        }
    }
}

fn patterns() -> &'static ClassifierPatterns {
    PATTERNS.get_or_init(|| ClassifierPatterns {
        code: compile(r"```|`[^`\n]+`"),
        formula: compile(r"\$\$[\s\S]+?\$\$|\$[^$\n]+\$|\\\[[\s\S]+?\\\]|\\\([\s\S]+?\\\)"),
        header: compile(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+\S"),
        list: compile(r"(?m)^[ \t]*(?:[-*+]|\d{1,3}[.)])[ \t]+\S"),
        complex: compile(&format!(r"(?i)\b(?:{})\b", COMPLEX_VOCABULARY.join("|"))),
    })
}

fn matches(pattern: Option<&Regex>, fragment: &str) -> bool {
    pattern.is_some_and(|re| re.is_match(fragment))
}

/// Classify a fragment of generated text
#[must_use]
pub fn classify(fragment: &str) -> ContentType {
    let patterns = patterns();

    if matches(patterns.code.as_ref(), fragment) {
        ContentType::Code
    } else if matches(patterns.formula.as_ref(), fragment) {
        ContentType::Formula
    } else if matches(patterns.header.as_ref(), fragment) {
        ContentType::Header
    } else if matches(patterns.list.as_ref(), fragment) {
        ContentType::List
    } else if matches(patterns.complex.as_ref(), fragment) {
        ContentType::Complex
    } else {
        ContentType::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_code_wins_over_everything() {
        assert_eq!(classify("- call `optimize()` with $x$"), ContentType::Code);
    }

    #[test]
    fn test_formula_delimiters() {
        assert_eq!(classify("Euler: $e^{i\\pi} + 1 = 0$."), ContentType::Formula);
        assert_eq!(classify("$$\\sum_{i=0}^n i$$"), ContentType::Formula);
        assert_eq!(classify("where \\(a^2 + b^2\\) holds"), ContentType::Formula);
    }

    #[test]
    fn test_header_before_list() {
        assert_eq!(classify("## Installation\n"), ContentType::Header);
        assert_eq!(classify("#hashtag is not a header"), ContentType::Simple);
    }

    #[test]
    fn test_list_markers() {
        assert_eq!(classify("- first item\n"), ContentType::List);
        assert_eq!(classify("2) second item\n"), ContentType::List);
        assert_eq!(classify("3.14 is pi."), ContentType::Simple);
    }

    #[test]
    fn test_complex_vocabulary_is_whole_word_and_case_insensitive() {
        assert_eq!(classify("The Algorithm runs in O(n)."), ContentType::Complex);
        assert_eq!(classify("Algorithmic art is fun."), ContentType::Simple);
    }

    #[test]
    fn test_default_simple() {
        assert_eq!(classify("Hello there. "), ContentType::Simple);
        assert_eq!(classify(""), ContentType::Simple);
    }
}
