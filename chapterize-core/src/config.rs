//! Engine configuration

/// Tuning knobs for sampling, escalation, and splitting.
///
/// The defaults reproduce the behaviour the escalation ladder was calibrated
/// with; they are safe for novels from a few hundred KB up to tens of MB.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bytes read at each sampling point
    pub sample_chunk_size: usize,
    /// Number of evenly spaced sampling points
    pub sample_points: usize,
    /// Structural confidence below this never becomes a candidate
    pub candidate_threshold: f64,
    /// Minimum line distance between structural candidates
    pub min_candidate_distance: usize,
    /// Hard cap on generated candidates
    pub max_candidates: usize,
    /// Candidates above this count skip per-candidate oracle scoring
    pub max_scored_candidates: usize,
    /// Adaptive pattern retry rounds
    pub max_adaptive_retries: usize,
    /// Exact-count reconciliation rounds
    pub max_reconcile_retries: usize,
    /// Gap regions consulted per reconciliation round
    pub max_gaps: usize,
    /// Consecutive near-identical chapter counts that trigger escalation
    pub stagnation_window: usize,
    /// Terminal keywords that mark a paired end line, not a chapter start
    pub end_keywords: Vec<String>,
    /// Minimum byte gap below which a later paired match is dropped
    pub min_marker_gap: usize,
    /// Bodies shorter than this count as empty for the quality gate
    pub min_chapter_length: usize,
    /// Boundary-pipeline output is rejected below this average body length
    pub min_avg_chapter_length: usize,
    /// Boundary-pipeline output is rejected above this short-chapter ratio
    pub max_short_chapter_ratio: f64,
    /// Fraction of the expected count below which the boundary pipeline runs
    pub coverage_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_chunk_size: 32 * 1024,
            sample_points: 30,
            candidate_threshold: 0.3,
            min_candidate_distance: 10,
            max_candidates: 1000,
            max_scored_candidates: 200,
            max_adaptive_retries: 10,
            max_reconcile_retries: 5,
            max_gaps: 3,
            stagnation_window: 3,
            end_keywords: default_end_keywords(),
            min_marker_gap: 500,
            min_chapter_length: 100,
            min_avg_chapter_length: 500,
            max_short_chapter_ratio: 0.3,
            coverage_floor: 0.95,
        }
    }
}

impl EngineConfig {
    /// Configuration for tests and small fixtures: tighter sampling caps.
    pub fn compact() -> Self {
        Self {
            sample_chunk_size: 4 * 1024,
            sample_points: 10,
            ..Self::default()
        }
    }
}

fn default_end_keywords() -> Vec<String> {
    ["끝", "완", "END", "end", "fin", "Fin", "종료", "끗", "完"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
