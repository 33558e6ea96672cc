//! Title pattern management
//!
//! Everything the engine does with title regexes lives here: sanitizing
//! oracle proposals, compiling them with terminal-keyword exclusion, the
//! adaptive retry loop that extends a partially covering pattern, and the
//! exact-count reconciliation transforms.
//!
//! The regex crate has no lookaround, so "a title line not followed by an
//! end keyword" cannot be one expression. [`TitlePattern`] instead pairs the
//! compiled regex with a suffix filter applied at match time.

use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::oracle::ScoringOracle;
use crate::sampler::Sampler;
use crate::splitter::{PatternMatch, PatternStats, Splitter};
use crate::types::{Boundary, ReconciliationLog};
use regex::Regex;
use tracing::{debug, info, warn};

/// Patterns that match any line and carry no selectivity of their own
pub const PERMISSIVE_PATTERNS: &[&str] = &[".+", ".", ".*"];

/// Ordered fallbacks tried when a proposed pattern over-matches
const CANONICAL_PATTERNS: &[&str] = &[
    r"제\s*\d+\s*화",
    r"\d+\s*화",
    r"제\s*\d+\s*장",
    r"(?i)^\s*chapter\s*\d+",
    r"第\s*\d+\s*[章话回]",
];

/// Cap on alternation branches in a reverse-synthesized pattern
const MAX_SYNTHESIZED_BRANCHES: usize = 12;

/// A compiled title pattern with terminal-keyword exclusion.
#[derive(Debug, Clone)]
pub struct TitlePattern {
    regex: Regex,
    source: String,
    excluded_suffixes: Vec<String>,
}

impl TitlePattern {
    /// Compile `source`, rejecting matches whose line continues into one of
    /// `excluded` keywords.
    pub fn compile(source: &str, excluded: &[String]) -> Result<Self> {
        let regex = Regex::new(source).map_err(|e| CoreError::InvalidPattern {
            reason: format!("{source:?}: {e}"),
        })?;
        Ok(Self {
            regex,
            source: source.to_string(),
            excluded_suffixes: excluded.to_vec(),
        })
    }

    /// The original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this pattern matches any non-empty line.
    pub fn is_permissive(&self) -> bool {
        PERMISSIVE_PATTERNS.contains(&self.source.as_str())
    }

    /// Find the pattern in `line`, unless the rest of the line carries a
    /// terminal keyword ("제 3 화 끝" closes a chapter, it does not open one).
    pub fn find<'t>(&self, line: &'t str) -> Option<regex::Match<'t>> {
        let m = self.regex.find(line)?;
        let tail = line[m.end()..].trim();
        if !tail.is_empty()
            && self
                .excluded_suffixes
                .iter()
                .any(|kw| tail == kw || tail.ends_with(kw.as_str()))
        {
            return None;
        }
        Some(m)
    }
}

/// Clean up a free-form oracle proposal into a compilable pattern.
///
/// Rejects dangling leading quantifiers or alternation, unbalanced groups or
/// classes, and anything the regex crate refuses to compile. Absence, not an
/// error: a bad proposal just means the ladder continues.
pub fn sanitize(proposal: &str) -> Option<String> {
    let trimmed = proposal.trim().trim_matches('`').trim();
    if trimmed.is_empty() {
        return None;
    }
    if matches!(trimmed.chars().next(), Some('?' | '*' | '+' | '|')) {
        return None;
    }
    if trimmed.ends_with('|') && !trimmed.ends_with(r"\|") {
        return None;
    }
    if !balanced(trimmed) {
        return None;
    }
    if Regex::new(trimmed).is_err() {
        warn!(pattern = trimmed, "proposed pattern does not compile");
        return None;
    }
    Some(trimmed.to_string())
}

/// Check `()` nesting and `[]` class delimiters, honouring escapes.
fn balanced(pattern: &str) -> bool {
    let mut depth = 0i32;
    let mut in_class = false;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_class && !escaped
}

/// Loosen every required digit run to an optional one.
///
/// "제1화" conventions sometimes drop the number on special chapters
/// (외전, 후기); `\d+` → `\d*` admits those lines. Idempotent.
pub fn relax_numbers(pattern: &str) -> String {
    pattern.replace(r"\d+", r"\d*")
}

/// Drop the later of any two matches closer than `min_gap` bytes.
///
/// Paired start/end markers ("제 3 화" ... "제 3 화 끝" a few lines later)
/// survive keyword exclusion when the end line rephrases the title; byte
/// distance catches what the suffix filter cannot.
pub fn remove_close_duplicates(matches: &[PatternMatch], min_gap: usize) -> Vec<PatternMatch> {
    let mut kept: Vec<PatternMatch> = Vec::with_capacity(matches.len());
    for m in matches {
        let close = kept
            .last()
            .map(|prev| m.byte_pos - prev.byte_pos < min_gap)
            .unwrap_or(false);
        if !close {
            kept.push(m.clone());
        }
    }
    kept
}

/// Partition matches into chapter starts and terminal-keyword end lines.
pub fn separate_end_matches<'m>(
    matches: &'m [PatternMatch],
    end_keywords: &[String],
) -> (Vec<&'m PatternMatch>, Vec<&'m PatternMatch>) {
    matches.iter().partition(|m| {
        !end_keywords
            .iter()
            .any(|kw| m.text.trim_end().ends_with(kw.as_str()))
    })
}

/// Synthesize a reusable pattern from confirmed title examples.
///
/// Each title is escaped, digit runs are generalized to `\d+`, duplicates
/// collapse, and the branches join into one alternation. Returns `None` when
/// no usable example exists.
pub fn build_pattern_from_examples(titles: &[String]) -> Option<String> {
    let mut branches: Vec<String> = Vec::new();
    for title in titles {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            continue;
        }
        let branch = generalize_digits(&regex::escape(trimmed));
        if !branches.contains(&branch) {
            branches.push(branch);
        }
        if branches.len() >= MAX_SYNTHESIZED_BRANCHES {
            break;
        }
    }
    if branches.is_empty() {
        return None;
    }
    Some(format!("(?:{})", branches.join("|")))
}

fn generalize_digits(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut in_run = false;
    for c in escaped.chars() {
        if c.is_ascii_digit() {
            if !in_run {
                out.push_str(r"\d+");
                in_run = true;
            }
        } else {
            in_run = false;
            out.push(c);
        }
    }
    out
}

/// Result of exact-count reconciliation.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// A pattern (possibly transformed) remains the best representation
    Pattern {
        /// The pattern source text
        source: String,
        /// Its coverage stats
        stats: PatternStats,
    },
    /// The exact count was only reachable as an explicit boundary list
    Boundaries(Vec<Boundary>),
}

/// Drives pattern proposal, adaptive retry, and reconciliation.
#[derive(Debug)]
pub struct PatternManager {
    cfg: EngineConfig,
    sampler: Sampler,
    splitter: Splitter,
}

impl PatternManager {
    /// Build a manager over the given configuration.
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            sampler: Sampler::new(cfg.sample_chunk_size, cfg.sample_points),
            splitter: Splitter::new(),
        }
    }

    /// Ask the oracle for an initial pattern and verify it over the text.
    pub fn propose(
        &self,
        text: &str,
        oracle: &mut dyn ScoringOracle,
    ) -> Option<(String, PatternStats)> {
        let sample = self.sampler.sample(text);
        let proposal = oracle.propose_pattern(&sample)?;
        let source = sanitize(&proposal)?;
        let pattern = TitlePattern::compile(&source, &[]).ok()?;
        let stats = self.splitter.verify(text, &pattern);
        info!(
            pattern = %source,
            matches = stats.match_count,
            coverage_ok = stats.coverage_ok,
            "initial pattern proposed"
        );
        Some((source, stats))
    }

    /// Extend a partially covering pattern until it reaches the end of file.
    ///
    /// Each round resamples from the last match position, asks for a pattern
    /// for the unseen region, and tries `old|new`. The union is adopted iff
    /// the coverage ratio improves or the unmatched tail shrinks; both
    /// criteria are checked so a union that finds later matches without
    /// moving the ratio still counts. Bounded by the retry cap.
    pub fn adaptive_retry(
        &self,
        text: &str,
        source: String,
        stats: PatternStats,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> (String, PatternStats) {
        let mut best_source = source;
        let mut best = stats;

        for round in 1..=self.cfg.max_adaptive_retries {
            if best.coverage_ok {
                break;
            }
            let sample = self.sampler.sample_from(text, best.last_match_pos, None);
            if sample.is_empty() {
                break;
            }
            let Some(proposal) = oracle.propose_pattern(&sample) else {
                log.push("adaptive_retry", format!("round {round}: no proposal"));
                break;
            };
            let Some(partial) = sanitize(&proposal) else {
                log.push("adaptive_retry", format!("round {round}: proposal rejected"));
                continue;
            };

            let union = format!("{best_source}|{partial}");
            let Ok(pattern) = TitlePattern::compile(&union, &[]) else {
                log.push("adaptive_retry", format!("round {round}: union does not compile"));
                continue;
            };
            let candidate = self.splitter.verify(text, &pattern);

            let improved = candidate.last_match_ratio > best.last_match_ratio
                || candidate.tail_size < best.tail_size;
            if improved {
                debug!(
                    round,
                    ratio = candidate.last_match_ratio,
                    tail = candidate.tail_size,
                    "adaptive retry adopted union"
                );
                log.push(
                    "adaptive_retry",
                    format!(
                        "round {round}: adopted, ratio {:.3}, tail {}",
                        candidate.last_match_ratio, candidate.tail_size
                    ),
                );
                best_source = union;
                best = candidate;
            } else {
                log.push("adaptive_retry", format!("round {round}: union not better"));
            }
        }

        (best_source, best)
    }

    /// Drive the match count toward `expected` exactly.
    pub fn reconcile(
        &self,
        text: &str,
        source: String,
        stats: PatternStats,
        expected: usize,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> ReconcileOutcome {
        let mut best_source = source;
        let mut best = stats;

        for _ in 0..self.cfg.max_reconcile_retries {
            if best.match_count == expected {
                break;
            }
            if best.match_count > expected {
                match self.reduce(text, &best_source, expected, log) {
                    Some(ReconcileOutcome::Pattern { source, stats }) => {
                        best_source = source;
                        best = stats;
                    }
                    Some(other) => return other,
                    None => break,
                }
            } else {
                match self.extend(text, &best_source, &best, expected, oracle, log) {
                    Some((source, stats)) if stats.match_count > best.match_count => {
                        best_source = source;
                        best = stats;
                    }
                    _ => break,
                }
            }
        }

        ReconcileOutcome::Pattern {
            source: best_source,
            stats: best,
        }
    }

    /// Over-match path: keyword exclusion, close-duplicate removal, then
    /// canonical fallbacks.
    fn reduce(
        &self,
        text: &str,
        source: &str,
        expected: usize,
        log: &mut ReconciliationLog,
    ) -> Option<ReconcileOutcome> {
        if let Ok(excluded) = TitlePattern::compile(source, &self.cfg.end_keywords) {
            let stats = self.splitter.verify(text, &excluded);
            log.push(
                "end_marker_exclusion",
                format!("{} matches", stats.match_count),
            );
            if stats.match_count == expected {
                return Some(ReconcileOutcome::Pattern {
                    source: source.to_string(),
                    stats,
                });
            }
            if stats.match_count > expected {
                let matches = self.splitter.find_matches(text, &excluded);
                let kept = remove_close_duplicates(&matches, self.cfg.min_marker_gap);
                log.push(
                    "close_duplicate_removal",
                    format!("{} matches", kept.len()),
                );
                if kept.len() == expected {
                    return Some(ReconcileOutcome::Boundaries(to_boundaries(&kept)));
                }
            }
        }

        for fallback in CANONICAL_PATTERNS {
            let Ok(pattern) = TitlePattern::compile(fallback, &self.cfg.end_keywords) else {
                continue;
            };
            let stats = self.splitter.verify(text, &pattern);
            log.push("canonical_fallback", format!("{fallback}: {}", stats.match_count));
            if stats.match_count == expected {
                info!(pattern = fallback, "canonical fallback reached exact count");
                return Some(ReconcileOutcome::Pattern {
                    source: fallback.to_string(),
                    stats,
                });
            }
        }
        None
    }

    /// Under-match path: number relaxation, then gap-targeted pattern union.
    fn extend(
        &self,
        text: &str,
        source: &str,
        current: &PatternStats,
        expected: usize,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> Option<(String, PatternStats)> {
        let relaxed = relax_numbers(source);
        if relaxed != source {
            if let Ok(pattern) = TitlePattern::compile(&relaxed, &[]) {
                let stats = self.splitter.verify(text, &pattern);
                log.push("number_relaxation", format!("{} matches", stats.match_count));
                if stats.match_count > current.match_count && stats.match_count <= expected {
                    return Some((relaxed, stats));
                }
            }
        }

        let pattern = TitlePattern::compile(source, &[]).ok()?;
        let matches = self.splitter.find_matches(text, &pattern);
        let gaps = self.splitter.find_gaps(text, &matches);

        let mut best_source = source.to_string();
        let mut best = current.clone();
        for gap in gaps.iter().take(self.cfg.max_gaps) {
            let sample = self.sampler.sample_from(text, gap.start, Some(gap.size));
            let Some(proposal) = oracle.propose_pattern(&sample) else {
                continue;
            };
            let Some(partial) = sanitize(&proposal) else {
                continue;
            };
            let union = format!("{best_source}|{partial}");
            let Ok(candidate) = TitlePattern::compile(&union, &[]) else {
                continue;
            };
            let stats = self.splitter.verify(text, &candidate);
            log.push(
                "gap_pattern_union",
                format!("gap at {}: {} matches", gap.start, stats.match_count),
            );
            if stats.match_count > best.match_count && stats.match_count <= expected {
                best_source = union;
                best = stats;
                if best.match_count == expected {
                    break;
                }
            }
        }

        if best.match_count > current.match_count {
            Some((best_source, best))
        } else {
            None
        }
    }

    /// Ask the oracle for literal title lines inside the largest unmatched
    /// regions, guided by already-confirmed examples.
    pub fn enumerate_titles_in_gaps(
        &self,
        text: &str,
        matches: &[PatternMatch],
        known: &[String],
        oracle: &mut dyn ScoringOracle,
    ) -> Vec<String> {
        let gaps = self.splitter.find_gaps(text, matches);
        let regions: Vec<String> = if gaps.is_empty() {
            vec![self.sampler.sample(text)]
        } else {
            gaps.iter()
                .take(self.cfg.max_gaps)
                .map(|g| self.sampler.sample_from(text, g.start, Some(g.size)))
                .collect()
        };

        let mut titles: Vec<String> = Vec::new();
        for region in regions {
            for title in oracle.enumerate_titles(&region, known) {
                let title = title.trim().to_string();
                if !title.is_empty() && !titles.contains(&title) {
                    titles.push(title);
                }
            }
        }
        titles
    }

    /// Access to the shared splitter.
    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }
}

fn to_boundaries(matches: &[PatternMatch]) -> Vec<Boundary> {
    matches
        .iter()
        .map(|m| Boundary {
            line_num: m.line_num,
            byte_pos: m.byte_pos,
            text: m.text.clone(),
            score: 1.0,
        })
        .collect()
}
