//! Scoring oracle seam
//!
//! The engine consumes an externally supplied semantic-scoring capability
//! through the [`ScoringOracle`] trait. Every operation signals absence
//! explicitly; nothing an oracle does can fail into engine control flow.
//! Implementations that receive a response without a parsable score report
//! [`NEUTRAL_SCORE`] rather than absence: the oracle answered, the answer
//! just carried no judgement.

use std::time::{Duration, Instant};

/// Neutral likelihood substituted when the oracle is absent or unparsable
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Lines of context passed on each side for candidate scoring
pub const CONTEXT_LINES: usize = 5;

/// Characters per side for topic-change scoring
pub const TOPIC_WINDOW_CHARS: usize = 1000;

/// Context around a candidate line
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    /// Up to [`CONTEXT_LINES`] non-blank lines before the candidate
    pub before: String,
    /// Up to [`CONTEXT_LINES`] non-blank lines after the candidate
    pub after: String,
}

impl ScoreContext {
    /// Build a context window from the surrounding lines.
    pub fn around(lines: &[&str], line_num: usize) -> Self {
        let start = line_num.saturating_sub(CONTEXT_LINES * 2);
        let before: Vec<&str> = lines[start..line_num.min(lines.len())]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        let after_end = (line_num + 1 + CONTEXT_LINES * 2).min(lines.len());
        let after: Vec<&str> = lines[(line_num + 1).min(lines.len())..after_end]
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        Self {
            before: before
                .iter()
                .rev()
                .take(CONTEXT_LINES)
                .rev()
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
            after: after
                .iter()
                .take(CONTEXT_LINES)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Externally supplied semantic scoring and proposal capability.
///
/// Implementations must never panic or block indefinitely on failure; they
/// return `None` (or an empty list) to signal absence and let the engine
/// degrade to structural heuristics.
pub trait ScoringOracle {
    /// Likelihood in [0, 1] that `text` is a chapter title, given context.
    fn score_candidate(&mut self, text: &str, context: &ScoreContext) -> Option<f64>;

    /// Likelihood in [0, 1] of a semantic discontinuity between two windows.
    fn score_topic_change(&mut self, before: &str, after: &str) -> Option<f64>;

    /// Propose a title-matching regular expression from sample text.
    /// The engine sanitizes and verifies every proposal.
    fn propose_pattern(&mut self, sample: &str) -> Option<String>;

    /// Extract literal title lines from sample text, guided by previously
    /// confirmed examples.
    fn enumerate_titles(&mut self, sample: &str, known_examples: &[String]) -> Vec<String>;
}

/// Oracle that is always absent. Exercises the engine's degradation paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl ScoringOracle for NullOracle {
    fn score_candidate(&mut self, _text: &str, _context: &ScoreContext) -> Option<f64> {
        None
    }

    fn score_topic_change(&mut self, _before: &str, _after: &str) -> Option<f64> {
        None
    }

    fn propose_pattern(&mut self, _sample: &str) -> Option<String> {
        None
    }

    fn enumerate_titles(&mut self, _sample: &str, _known: &[String]) -> Vec<String> {
        Vec::new()
    }
}

/// Wrapper enforcing a minimum interval between consecutive oracle calls.
///
/// The engine issues oracle calls one at a time from inside its escalation
/// loops; this wrapper is the only throughput control. It never fans out.
#[derive(Debug)]
pub struct Paced<O> {
    inner: O,
    interval: Duration,
    last_call: Option<Instant>,
}

impl<O> Paced<O> {
    /// Wrap `inner`, spacing calls at least `interval` apart.
    pub fn new(inner: O, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_call: None,
        }
    }

    /// Unwrap the inner oracle.
    pub fn into_inner(self) -> O {
        self.inner
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}

impl<O: ScoringOracle> ScoringOracle for Paced<O> {
    fn score_candidate(&mut self, text: &str, context: &ScoreContext) -> Option<f64> {
        self.pace();
        self.inner.score_candidate(text, context)
    }

    fn score_topic_change(&mut self, before: &str, after: &str) -> Option<f64> {
        self.pace();
        self.inner.score_topic_change(before, after)
    }

    fn propose_pattern(&mut self, sample: &str) -> Option<String> {
        self.pace();
        self.inner.propose_pattern(sample)
    }

    fn enumerate_titles(&mut self, sample: &str, known: &[String]) -> Vec<String> {
        self.pace();
        self.inner.enumerate_titles(sample, known)
    }
}

/// Parse a likelihood out of a free-form oracle response.
///
/// Takes the first number-like token and clamps it to [0, 1]; returns `None`
/// when no numeric token exists. Callers substitute [`NEUTRAL_SCORE`].
pub fn parse_score(response: &str) -> Option<f64> {
    let mut token = String::new();
    let mut seen_digit = false;

    for c in response.chars() {
        if c.is_ascii_digit() {
            token.push(c);
            seen_digit = true;
        } else if c == '.' && seen_digit && !token.contains('.') {
            token.push(c);
        } else if c == '.' && !seen_digit && token.is_empty() {
            // Leading ".8" style responses
            token.push('0');
            token.push(c);
        } else if seen_digit {
            break;
        } else {
            token.clear();
        }
    }

    if !seen_digit {
        return None;
    }
    token
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_score_takes_first_number() {
        assert_eq!(parse_score("0.8"), Some(0.8));
        assert_eq!(parse_score("score: 0.75 (high)"), Some(0.75));
        assert_eq!(parse_score("1"), Some(1.0));
        assert_eq!(parse_score(".9 maybe"), Some(0.9));
    }

    #[test]
    fn parse_score_clamps_range() {
        assert_eq!(parse_score("7.5"), Some(1.0));
    }

    #[test]
    fn parse_score_absent_for_prose() {
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("definitely a title"), None);
    }

    #[test]
    fn null_oracle_is_always_absent() {
        let mut oracle = NullOracle;
        assert!(oracle.propose_pattern("sample").is_none());
        assert!(oracle
            .score_candidate("1화", &ScoreContext::default())
            .is_none());
        assert!(oracle.enumerate_titles("sample", &[]).is_empty());
    }

    #[test]
    fn paced_oracle_delegates() {
        let mut oracle = Paced::new(NullOracle, Duration::ZERO);
        assert!(oracle.propose_pattern("x").is_none());
        assert!(oracle.score_topic_change("a", "b").is_none());
    }

    #[test]
    fn context_window_is_bounded() {
        let lines: Vec<&str> = (0..40).map(|_| "본문 줄입니다").collect();
        let ctx = ScoreContext::around(&lines, 20);
        assert_eq!(ctx.before.lines().count(), CONTEXT_LINES);
        assert_eq!(ctx.after.lines().count(), CONTEXT_LINES);
    }

    #[test]
    fn context_skips_blank_lines() {
        let lines = vec!["가", "", "나", "후보", "", "다"];
        let ctx = ScoreContext::around(&lines, 3);
        assert_eq!(ctx.before, "가\n나");
        assert_eq!(ctx.after, "다");
    }
}
