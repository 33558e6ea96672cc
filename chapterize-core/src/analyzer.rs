//! Structural candidate generation
//!
//! A pure heuristic scan that produces weak boundary hypotheses from
//! structural cues alone: line length shifts, blank-line runs, marker tokens,
//! and context. It does not depend on any particular title convention and
//! never calls the oracle.

use crate::config::EngineConfig;
use crate::types::{Candidate, CandidateFeatures};
use regex::Regex;
use tracing::debug;

/// Lines shorter than this (in chars) are potential titles
const SHORT_LINE_THRESHOLD: usize = 50;
/// Lines shorter than this are very likely titles
const VERY_SHORT_LINE_THRESHOLD: usize = 30;
/// Lines longer than this are treated as body prose
const LONG_LINE_THRESHOLD: usize = 200;
/// Maximum char length for the short-exclamation dialogue check
const MAX_DIALOGUE_LENGTH: usize = 40;

const CHAPTER_INDICATORS: &[&str] = &[
    r"^[第章]",
    r"^\s*[IVX]+\.",
    r"(?i)^\s*chapter",
    r"(?i)^\s*part\s+\d+",
    r"^\s*제?\s*\d+\s*화",
    r"^\s*===+",
    r"^\s*---+",
    r"^\s*\*\*\*+",
];

const TIME_PLACE_MARKERS: &[&str] = &[
    r"^\s*\d{4}년",
    r"^\s*\d+월\s+\d+일",
    r"^\s*[一二三四五六七八九十]+年",
    r"(?i)^\s*\[.*?(년|월|일|time|place|location)\]",
    r"^\s*(서울|도쿄|뉴욕|런던|파리)",
];

/// Detects potential chapter boundaries using structural cues.
#[derive(Debug)]
pub struct StructuralAnalyzer {
    indicators: Vec<Regex>,
    time_place: Vec<Regex>,
    dialogue: Option<Regex>,
}

impl StructuralAnalyzer {
    /// Compile the built-in marker patterns.
    pub fn new() -> Self {
        Self {
            indicators: CHAPTER_INDICATORS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
            time_place: TIME_PLACE_MARKERS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
            dialogue: Regex::new(r#"^["'「『“].+["'」』”]$"#).ok(),
        }
    }

    /// Scan the text and return candidates above the confidence threshold,
    /// thinned to the configured minimum line distance.
    ///
    /// The very first line is skipped: it is usually the book title, not a
    /// chapter title. Deterministic and single-pass.
    pub fn candidates(&self, text: &str, cfg: &EngineConfig) -> Vec<Candidate> {
        let lines: Vec<&str> = text.lines().collect();
        let mut raw = Vec::new();
        let mut blank_before = 0usize;

        for (i, line) in lines.iter().enumerate() {
            let stripped = line.trim();
            if i == 0 {
                continue;
            }
            if stripped.is_empty() {
                blank_before += 1;
                continue;
            }

            let features = self.line_features(stripped, i, &lines, blank_before);
            let confidence = confidence_from(&features);
            if confidence > cfg.candidate_threshold {
                raw.push(Candidate {
                    line_num: i,
                    text: stripped.to_string(),
                    confidence,
                    features,
                    oracle_score: None,
                });
            }

            blank_before = 0;
            if raw.len() >= cfg.max_candidates {
                break;
            }
        }

        // Thin out near-duplicate candidates, keeping the earliest per
        // cluster: two title lines ten lines apart are almost never both
        // real chapter starts.
        let mut filtered = Vec::new();
        let mut last_line = None::<usize>;
        for cand in raw.into_iter() {
            let far_enough = last_line
                .map(|l| cand.line_num - l >= cfg.min_candidate_distance)
                .unwrap_or(true);
            if far_enough {
                last_line = Some(cand.line_num);
                filtered.push(cand);
            }
        }

        debug!(
            candidates = filtered.len(),
            "structural analysis complete"
        );
        filtered
    }

    fn line_features(
        &self,
        line: &str,
        line_num: usize,
        all_lines: &[&str],
        blank_before: usize,
    ) -> CandidateFeatures {
        let char_len = line.chars().count();
        let mut features = CandidateFeatures {
            is_short: char_len < SHORT_LINE_THRESHOLD,
            is_very_short: char_len < VERY_SHORT_LINE_THRESHOLD,
            blank_before,
            has_number: line.chars().any(|c| c.is_ascii_digit()),
            has_brackets: line.chars().any(|c| matches!(c, '[' | ']' | '【' | '】')),
            ends_with_punctuation: line
                .chars()
                .last()
                .map(|c| matches!(c, '.' | '!' | '?' | '。' | '！' | '？'))
                .unwrap_or(false),
            is_all_caps: line.chars().any(|c| c.is_uppercase())
                && !line.chars().any(|c| c.is_lowercase()),
            word_count: line.split_whitespace().count(),
            ..CandidateFeatures::default()
        };

        features.has_chapter_indicator = self.indicators.iter().any(|p| p.is_match(line));
        features.has_time_place = self.time_place.iter().any(|p| p.is_match(line));

        // Quoted text, or a short exclamation/question, reads as dialogue
        let quoted = self
            .dialogue
            .as_ref()
            .map(|p| p.is_match(line))
            .unwrap_or(false);
        let short_exclaim = char_len <= MAX_DIALOGUE_LENGTH
            && line
                .chars()
                .last()
                .map(|c| matches!(c, '?' | '!' | '？' | '！'))
                .unwrap_or(false);
        features.is_dialogue = quoted || short_exclaim;

        features.is_sentence = line
            .chars()
            .last()
            .map(|c| matches!(c, '.' | '。' | '다' | '요' | '죠' | '습'))
            .unwrap_or(false)
            && !features.has_chapter_indicator;

        if let Some(next) = all_lines.get(line_num + 1) {
            let next = next.trim();
            features.longer_line_after =
                !next.is_empty() && next.chars().count() * 2 > char_len * 3;
        }
        if line_num > 0 {
            if let Some(prev) = all_lines.get(line_num - 1) {
                let prev = prev.trim();
                features.long_line_before =
                    !prev.is_empty() && prev.chars().count() > LONG_LINE_THRESHOLD;
            }
        }

        features
    }
}

impl Default for StructuralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted sum of positive signals minus dialogue/sentence penalties,
/// clamped to [0, 1].
fn confidence_from(features: &CandidateFeatures) -> f64 {
    let mut score: f64 = 0.0;

    if features.is_short {
        score += 0.3;
    }
    if features.is_very_short {
        score += 0.2;
    }
    if features.blank_before >= 1 {
        score += 0.2;
    }
    if features.blank_before >= 2 {
        score += 0.1;
    }
    if features.has_chapter_indicator {
        score += 0.4;
    }
    if features.has_number {
        score += 0.15;
    }
    if features.has_brackets {
        score += 0.1;
    }
    if features.has_time_place {
        score += 0.2;
    }
    if features.longer_line_after {
        score += 0.15;
    }
    if features.long_line_before {
        score += 0.1;
    }
    if features.is_all_caps && features.word_count > 5 && features.word_count < 15 {
        score += 0.15;
    }

    // Penalties may drive the raw score negative before clamping
    if features.is_dialogue {
        score -= 0.4;
    }
    if features.is_sentence {
        score -= 0.3;
    }

    score.clamp(0.0, 1.0)
}
