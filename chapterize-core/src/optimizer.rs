//! Global boundary selection
//!
//! Selects exactly K boundaries from a scored candidate pool under a minimum
//! spacing constraint, relaxing the spacing in bounded rounds when the pool
//! is too sparse to satisfy it.

use crate::types::{Boundary, Candidate};
use tracing::debug;

/// Spacing floor used on the final relaxation round
const MIN_SPACING_FLOOR: usize = 500;

/// Divisor for deriving the initial spacing from file size and target count
const SPACING_FRACTION: f64 = 0.3;

/// Picks an exact number of boundaries out of a candidate pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptimizer;

impl GlobalOptimizer {
    /// Create an optimizer.
    pub fn new() -> Self {
        Self
    }

    /// Select up to `expected` boundaries, greedily by combined score with a
    /// byte-distance spacing constraint.
    ///
    /// `anchors` are boundaries already confirmed by other means (for example
    /// partial pattern matches); they count toward the target and repel
    /// nearby candidates, but are never dropped. The result is sorted by
    /// position and contains at most `expected` entries. It may contain
    /// fewer when the pool is exhausted even at the floor spacing.
    pub fn select_boundaries(
        &self,
        text: &str,
        candidates: &[Candidate],
        expected: usize,
        anchors: &[Boundary],
    ) -> Vec<Boundary> {
        if expected == 0 {
            return Vec::new();
        }
        let wanted = expected.saturating_sub(anchors.len());
        if wanted == 0 {
            let mut out = anchors.to_vec();
            out.sort_by_key(|b| b.byte_pos);
            out.truncate(expected);
            return out;
        }

        let offsets = line_offsets(text);
        let mut pool: Vec<(usize, Boundary)> = candidates
            .iter()
            .filter_map(|c| {
                let byte_pos = *offsets.get(c.line_num)?;
                Some((
                    c.line_num,
                    Boundary {
                        line_num: c.line_num,
                        byte_pos,
                        text: c.text.clone(),
                        score: c.combined_score(),
                    },
                ))
            })
            .collect();

        // Highest combined score first; original position breaks ties so the
        // result is deterministic across runs.
        pool.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let base_spacing = initial_spacing(text.len(), expected);
        let mut selected: Vec<Boundary> = Vec::new();

        // Three rounds: full spacing, halved, then the hard floor. Each round
        // keeps what earlier rounds selected and fills remaining slots.
        for spacing in [base_spacing, base_spacing / 2, MIN_SPACING_FLOOR] {
            let spacing = spacing.max(MIN_SPACING_FLOOR);
            for (_, boundary) in &pool {
                if selected.len() >= wanted {
                    break;
                }
                let too_close = selected
                    .iter()
                    .map(|b| &b.byte_pos)
                    .chain(anchors.iter().map(|a| &a.byte_pos))
                    .any(|&pos| boundary.byte_pos.abs_diff(pos) < spacing);
                if !too_close {
                    selected.push(boundary.clone());
                }
            }
            if selected.len() >= wanted {
                break;
            }
        }

        debug!(
            selected = selected.len(),
            anchors = anchors.len(),
            expected,
            spacing = base_spacing,
            "boundary selection complete"
        );

        selected.extend(anchors.iter().cloned());
        selected.sort_by_key(|b| b.byte_pos);
        selected.dedup_by_key(|b| b.byte_pos);
        selected.truncate(expected);
        selected
    }
}

/// Initial spacing: a fraction of the average chapter size, floored at 1000
/// bytes so tiny files do not demand adjacent boundaries.
fn initial_spacing(file_size: usize, expected: usize) -> usize {
    let per_chapter = file_size as f64 / expected.max(1) as f64;
    ((per_chapter * SPACING_FRACTION) as usize).max(1000)
}

/// Byte offset of the start of each line.
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
    use crate::types::CandidateFeatures;

    fn candidate(line_num: usize, confidence: f64) -> Candidate {
        Candidate {
            line_num,
            text: format!("후보 {line_num}"),
            confidence,
            features: CandidateFeatures::default(),
            oracle_score: None,
        }
    }

    fn spread_text(lines: usize) -> String {
        // Each line is long enough that ten lines exceed the spacing floor
        let filler = "본문 ".repeat(30);
        (0..lines)
            .map(|i| format!("{i} {filler}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn selects_exactly_expected_from_rich_pool() {
        let text = spread_text(500);
        let candidates: Vec<_> = (0..50).map(|i| candidate(i * 10, 0.8)).collect();
        let opt = GlobalOptimizer::new();
        let boundaries = opt.select_boundaries(&text, &candidates, 10, &[]);
        assert_eq!(boundaries.len(), 10);
        for pair in boundaries.windows(2) {
            assert!(pair[0].byte_pos < pair[1].byte_pos);
        }
    }

    #[test]
    fn sparse_pool_yields_fewer_boundaries() {
        let text = spread_text(30);
        let candidates = vec![candidate(5, 0.9), candidate(20, 0.7)];
        let opt = GlobalOptimizer::new();
        let boundaries = opt.select_boundaries(&text, &candidates, 10, &[]);
        assert!(boundaries.len() <= 2);
    }

    #[test]
    fn anchors_count_toward_target() {
        let text = spread_text(500);
        let candidates: Vec<_> = (0..50).map(|i| candidate(i * 10, 0.6)).collect();
        let anchors = vec![Boundary {
            line_num: 100,
            byte_pos: 9000,
            text: "제 3 화".into(),
            score: 1.0,
        }];
        let opt = GlobalOptimizer::new();
        let boundaries = opt.select_boundaries(&text, &candidates, 5, &anchors);
        assert_eq!(boundaries.len(), 5);
        assert!(boundaries.iter().any(|b| b.byte_pos == 9000));
    }

    #[test]
    fn spacing_relaxes_before_giving_up() {
        // Candidates cluster so tightly that only the floor spacing admits
        // more than one of them.
        let text = spread_text(100);
        let candidates: Vec<_> = (0..20).map(|i| candidate(i * 4 + 1, 0.8)).collect();
        let opt = GlobalOptimizer::new();
        let strict = opt.select_boundaries(&text, &candidates, 2, &[]);
        assert_eq!(strict.len(), 2);
    }

    #[test]
    fn zero_expected_is_empty() {
        let opt = GlobalOptimizer::new();
        assert!(opt
            .select_boundaries("본문", &[candidate(0, 0.9)], 0, &[])
            .is_empty());
    }

    #[test]
    fn higher_scores_win_slots() {
        let text = spread_text(400);
        let mut candidates: Vec<_> = (0..20).map(|i| candidate(i * 20, 0.4)).collect();
        candidates.push(candidate(210, 0.95));
        let opt = GlobalOptimizer::new();
        let boundaries = opt.select_boundaries(&text, &candidates, 1, &[]);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].line_num, 210);
    }
}
