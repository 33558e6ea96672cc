//! Topic-change supplementation
//!
//! When structural candidates are sparse, paragraph breaks are probed for
//! semantic discontinuity. Purely additive: detected shifts enter the
//! candidate pool and compete in the optimizer like any other candidate.

use crate::oracle::{ScoringOracle, TOPIC_WINDOW_CHARS};
use crate::types::{Candidate, CandidateFeatures};
use tracing::debug;

/// Minimum oracle confidence for a topic shift to become a candidate
const MIN_TOPIC_CONFIDENCE: f64 = 0.6;

/// No probe within this many bytes of an existing candidate
const EXCLUSION_RADIUS: usize = 5_000;

/// Minimum byte stride between consecutive probes
const PROBE_STRIDE: usize = 2_000;

/// Hard cap on oracle probes per file
const MAX_PROBES: usize = 40;

/// Probes paragraph breaks for semantic topic shifts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicDetector;

impl TopicDetector {
    /// Create a detector.
    pub fn new() -> Self {
        Self
    }

    /// Probe paragraph breaks far from existing candidates and return new
    /// candidates for confident topic shifts.
    pub fn supplement(
        &self,
        text: &str,
        existing: &[Candidate],
        oracle: &mut dyn ScoringOracle,
    ) -> Vec<Candidate> {
        let line_starts = line_offsets(text);
        let taken: Vec<usize> = existing
            .iter()
            .filter_map(|c| line_starts.get(c.line_num).copied())
            .collect();

        let mut found = Vec::new();
        let mut last_probe = 0usize;
        let mut probes = 0usize;

        for (pos, _) in text.match_indices("\n\n") {
            if probes >= MAX_PROBES {
                break;
            }
            let break_end = pos + 2;
            if break_end >= text.len() || break_end < last_probe + PROBE_STRIDE {
                continue;
            }
            if taken.iter().any(|&t| break_end.abs_diff(t) < EXCLUSION_RADIUS) {
                continue;
            }

            let before = window_before(text, pos);
            let after = window_after(text, break_end);
            if before.chars().count() < TOPIC_WINDOW_CHARS / 4
                || after.chars().count() < TOPIC_WINDOW_CHARS / 4
            {
                continue;
            }

            last_probe = break_end;
            probes += 1;
            let Some(score) = oracle.score_topic_change(before, after) else {
                continue;
            };
            if score < MIN_TOPIC_CONFIDENCE {
                continue;
            }

            let line_num = line_starts.partition_point(|&s| s <= break_end).saturating_sub(1);
            let first_line = after.lines().next().unwrap_or("").trim().to_string();
            if first_line.is_empty() {
                continue;
            }
            found.push(Candidate {
                line_num,
                text: first_line,
                confidence: score,
                features: CandidateFeatures {
                    blank_before: 1,
                    ..CandidateFeatures::default()
                },
                oracle_score: Some(score),
            });
        }

        debug!(probes, found = found.len(), "topic supplement complete");
        found
    }
}

fn window_before(text: &str, pos: usize) -> &str {
    let mut start = pos.saturating_sub(TOPIC_WINDOW_CHARS * 4);
    while start > 0 && !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..pos]
}

fn window_after(text: &str, pos: usize) -> &str {
    let mut end = (pos + TOPIC_WINDOW_CHARS * 4).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[pos..end]
}

fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{NullOracle, ScoreContext};

    struct ShiftOracle(f64);

    impl ScoringOracle for ShiftOracle {
        fn score_candidate(&mut self, _: &str, _: &ScoreContext) -> Option<f64> {
            None
        }
        fn score_topic_change(&mut self, _: &str, _: &str) -> Option<f64> {
            Some(self.0)
        }
        fn propose_pattern(&mut self, _: &str) -> Option<String> {
            None
        }
        fn enumerate_titles(&mut self, _: &str, _: &[String]) -> Vec<String> {
            Vec::new()
        }
    }

    fn two_part_text() -> String {
        let mut text = String::new();
        for _ in 0..60 {
            text.push_str("학교에서의 하루가 이어집니다. 교실과 친구들 이야기입니다.\n");
        }
        text.push('\n');
        for _ in 0..60 {
            text.push_str("전쟁터의 포성이 울립니다. 전혀 다른 장면의 이야기입니다.\n");
        }
        text
    }

    #[test]
    fn confident_shift_becomes_candidate() {
        let text = two_part_text();
        let detector = TopicDetector::new();
        let found = detector.supplement(&text, &[], &mut ShiftOracle(0.9));
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.oracle_score == Some(0.9)));
        assert!(found.iter().all(|c| !c.text.is_empty()));
    }

    #[test]
    fn low_confidence_is_dropped() {
        let text = two_part_text();
        let detector = TopicDetector::new();
        assert!(detector.supplement(&text, &[], &mut ShiftOracle(0.4)).is_empty());
    }

    #[test]
    fn absent_oracle_yields_nothing() {
        let text = two_part_text();
        let detector = TopicDetector::new();
        assert!(detector.supplement(&text, &[], &mut NullOracle).is_empty());
    }
}
