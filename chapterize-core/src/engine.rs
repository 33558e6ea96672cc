//! Discovery engine
//!
//! Orchestrates the escalation ladder: pattern proposal and verification,
//! adaptive retry, exact-count reconciliation, the boundary pipeline, and
//! direct title enumeration, in that order. Cheaper levels always run first;
//! a level that reaches the target short-circuits the rest. When every level
//! falls short the best available segmentation is returned with the shortfall
//! recorded in the reconciliation log, never an error.

use crate::analyzer::StructuralAnalyzer;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::input::Input;
use crate::optimizer::GlobalOptimizer;
use crate::oracle::{ScoreContext, ScoringOracle};
use crate::pattern::{
    build_pattern_from_examples, PatternManager, ReconcileOutcome, TitlePattern,
};
use crate::splitter::{PatternStats, Splitter};
use crate::topics::TopicDetector;
use crate::types::{Boundary, Chapter, ChapterKind, ReconciliationLog, SplitPlan};
use tracing::{debug, info, warn};

/// Result of one discovery run.
#[derive(Debug)]
pub struct Discovery {
    /// The recovered chapters, in file order
    pub chapters: Vec<Chapter>,
    /// Which representation produced them
    pub plan: SplitPlan,
    /// Coverage stats of the final pattern, when a pattern won
    pub stats: Option<PatternStats>,
    /// Every escalation attempt, in order
    pub log: ReconciliationLog,
}

/// Chapter boundary discovery over a single text.
#[derive(Debug)]
pub struct ChapterEngine {
    cfg: EngineConfig,
    analyzer: StructuralAnalyzer,
    optimizer: GlobalOptimizer,
    patterns: PatternManager,
    topics: TopicDetector,
    splitter: Splitter,
}

impl ChapterEngine {
    /// Engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with explicit configuration.
    pub fn with_config(cfg: EngineConfig) -> Self {
        Self {
            patterns: PatternManager::new(&cfg),
            analyzer: StructuralAnalyzer::new(),
            optimizer: GlobalOptimizer::new(),
            topics: TopicDetector::new(),
            splitter: Splitter::new(),
            cfg,
        }
    }

    /// Recover chapter structure from `input`.
    ///
    /// `expected` is the target chapter count when known (from the caller or
    /// a file name); without it the first pattern with end-to-end coverage
    /// wins. The oracle may be offline; the engine then degrades to
    /// structural discovery.
    pub fn discover(
        &self,
        input: Input,
        expected: Option<usize>,
        oracle: &mut dyn ScoringOracle,
    ) -> Result<Discovery> {
        let text = input.to_text()?;
        let mut log = ReconciliationLog::new();

        if text.trim().is_empty() {
            log.push("input", "empty text, nothing to discover");
            return Ok(Discovery {
                chapters: Vec::new(),
                plan: SplitPlan::Boundaries(Vec::new()),
                stats: None,
                log,
            });
        }

        let mut best: Option<Discovery> = None;

        // Level 1: pattern proposal, retry, reconciliation.
        if let Some(discovery) = self.pattern_level(&text, expected, oracle, &mut log)? {
            if is_exact(&discovery, expected) || self.covers(&discovery, expected) {
                return Ok(finish(discovery, log, expected));
            }
            best = pick_best(best, discovery, expected);
        }

        // Level 2: structural candidates through the optimizer.
        if let Some(k) = expected {
            if let Some(discovery) = self.boundary_level(&text, k, &best, oracle, &mut log)? {
                if is_exact(&discovery, expected) {
                    return Ok(finish(discovery, log, expected));
                }
                best = pick_best(best, discovery, expected);
            }

            // Level 3: direct title enumeration.
            if let Some(discovery) = self.enumeration_level(&text, k, &best, oracle, &mut log) {
                if is_exact(&discovery, expected) {
                    return Ok(finish(discovery, log, expected));
                }
                best = pick_best(best, discovery, expected);
            }
        }

        let discovery = best.unwrap_or_else(|| {
            log.push("fallback", "no level produced chapters, emitting whole text");
            Discovery {
                chapters: vec![Chapter::new(1, "전체".to_string(), None, text.trim().to_string())],
                plan: SplitPlan::Boundaries(Vec::new()),
                stats: None,
                log: ReconciliationLog::new(),
            }
        });
        Ok(finish(discovery, log, expected))
    }

    /// Propose, extend, and reconcile a title pattern.
    ///
    /// Re-proposes from scratch when the count stays far from the target,
    /// with stagnation detection so near-identical counts stop the loop
    /// before the attempt budget runs out.
    fn pattern_level(
        &self,
        text: &str,
        expected: Option<usize>,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> Result<Option<Discovery>> {
        let mut counts: Vec<usize> = Vec::new();
        let mut best: Option<Discovery> = None;

        for attempt in 1..=self.cfg.stagnation_window {
            let Some((source, stats)) = self.patterns.propose(text, oracle) else {
                log.push("pattern_proposal", format!("attempt {attempt}: no proposal"));
                break;
            };
            log.push(
                "pattern_proposal",
                format!("attempt {attempt}: {} matches", stats.match_count),
            );

            let (source, stats) = if stats.coverage_ok {
                (source, stats)
            } else {
                self.patterns.adaptive_retry(text, source, stats, oracle, log)
            };

            let outcome = match expected {
                Some(k) if stats.match_count != k => {
                    self.patterns.reconcile(text, source, stats, k, oracle, log)
                }
                _ => ReconcileOutcome::Pattern { source, stats },
            };

            let discovery = match outcome {
                ReconcileOutcome::Pattern { source, stats } => {
                    if stats.match_count == 0 {
                        counts.push(0);
                        continue;
                    }
                    let pattern = self.pattern_for_split(text, &source, &stats)?;
                    let chapters = self.splitter.split(text, &pattern, &[]);
                    Discovery {
                        chapters,
                        plan: SplitPlan::Pattern(source),
                        stats: Some(stats),
                        log: ReconciliationLog::new(),
                    }
                }
                ReconcileOutcome::Boundaries(boundaries) => {
                    let chapters = self.splitter.split_by_boundaries(text, &boundaries)?;
                    Discovery {
                        chapters,
                        plan: SplitPlan::Boundaries(boundaries),
                        stats: None,
                        log: ReconciliationLog::new(),
                    }
                }
            };

            counts.push(discovery.chapters.len());
            let exact = is_exact(&discovery, expected);
            best = pick_best(best, discovery, expected);
            if exact || expected.is_none() {
                break;
            }
            if is_stagnant(&counts, self.cfg.stagnation_window) {
                log.push("stagnation", format!("counts {counts:?}, escalating"));
                break;
            }
        }

        Ok(best)
    }

    /// Compile the winning pattern the same way it was verified.
    ///
    /// Reconciliation may have reached its count with or without terminal
    /// keyword exclusion; the split must use whichever variant reproduces
    /// the verified count.
    fn pattern_for_split(
        &self,
        text: &str,
        source: &str,
        stats: &PatternStats,
    ) -> Result<TitlePattern> {
        let plain = TitlePattern::compile(source, &[])?;
        if self.splitter.verify(text, &plain).match_count == stats.match_count {
            return Ok(plain);
        }
        TitlePattern::compile(source, &self.cfg.end_keywords)
    }

    /// Structural candidates, oracle scoring, topic supplement, optimizer.
    fn boundary_level(
        &self,
        text: &str,
        expected: usize,
        prior: &Option<Discovery>,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> Result<Option<Discovery>> {
        let anchors = self.anchors_from(text, prior);
        let anchor_lines: Vec<usize> = anchors.iter().map(|a| a.line_num).collect();

        let mut candidates = self.analyzer.candidates(text, &self.cfg);
        candidates.retain(|c| !anchor_lines.contains(&c.line_num));
        log.push(
            "structural_analysis",
            format!("{} candidates, {} anchors", candidates.len(), anchors.len()),
        );

        if candidates.len() <= self.cfg.max_scored_candidates {
            let lines: Vec<&str> = text.lines().collect();
            for cand in candidates.iter_mut() {
                let ctx = ScoreContext::around(&lines, cand.line_num);
                cand.oracle_score = oracle.score_candidate(&cand.text, &ctx);
            }
        } else {
            debug!(
                candidates = candidates.len(),
                "too many candidates, skipping oracle scoring"
            );
        }

        if candidates.len() + anchors.len() < expected * 2 {
            let extra = self.topics.supplement(text, &candidates, oracle);
            if !extra.is_empty() {
                log.push("topic_supplement", format!("{} shifts", extra.len()));
                candidates.extend(extra);
                candidates.sort_by_key(|c| c.line_num);
            }
        }

        let boundaries = self
            .optimizer
            .select_boundaries(text, &candidates, expected, &anchors);
        if boundaries.is_empty() {
            log.push("boundary_pipeline", "no boundaries selected");
            return Ok(None);
        }

        let chapters = self.splitter.split_by_boundaries(text, &boundaries)?;
        if let Some(reason) = self.quality_reject(&chapters) {
            log.push("quality_gate", reason);
            return Ok(None);
        }

        log.push("boundary_pipeline", format!("{} chapters", chapters.len()));
        Ok(Some(Discovery {
            chapters,
            plan: SplitPlan::Boundaries(boundaries),
            stats: None,
            log: ReconciliationLog::new(),
        }))
    }

    /// Enumerate literal titles in the largest gaps, then split either by a
    /// reverse-synthesized pattern or by explicit title lines.
    fn enumeration_level(
        &self,
        text: &str,
        expected: usize,
        prior: &Option<Discovery>,
        oracle: &mut dyn ScoringOracle,
        log: &mut ReconciliationLog,
    ) -> Option<Discovery> {
        let (matches, known) = match prior {
            Some(d) => {
                let known: Vec<String> = d.chapters.iter().map(|c| c.title.clone()).collect();
                let matches = match &d.plan {
                    SplitPlan::Pattern(source) => TitlePattern::compile(source, &[])
                        .map(|p| self.splitter.find_matches(text, &p))
                        .unwrap_or_default(),
                    SplitPlan::Boundaries(_) => Vec::new(),
                };
                (matches, known)
            }
            None => (Vec::new(), Vec::new()),
        };

        let found = self
            .patterns
            .enumerate_titles_in_gaps(text, &matches, &known, oracle);
        if found.is_empty() {
            log.push("title_enumeration", "no titles enumerated");
            return None;
        }
        log.push("title_enumeration", format!("{} titles", found.len()));

        let mut all_titles = known;
        for title in found {
            if !all_titles.contains(&title) {
                all_titles.push(title);
            }
        }

        // With enough confirmed examples a synthesized pattern generalizes
        // to the titles nobody enumerated.
        if all_titles.len() * 2 >= expected {
            if let Some(source) = build_pattern_from_examples(&all_titles) {
                if let Ok(pattern) = TitlePattern::compile(&source, &self.cfg.end_keywords) {
                    let stats = self.splitter.verify(text, &pattern);
                    log.push(
                        "pattern_synthesis",
                        format!("{} matches", stats.match_count),
                    );
                    if stats.match_count == expected {
                        let chapters = self.splitter.split(text, &pattern, &[]);
                        return Some(Discovery {
                            chapters,
                            plan: SplitPlan::Pattern(source),
                            stats: Some(stats),
                            log: ReconciliationLog::new(),
                        });
                    }
                }
            }
        }

        let Ok(permissive) = TitlePattern::compile(".+", &[]) else {
            return None;
        };
        let chapters = self.splitter.split(text, &permissive, &all_titles);
        if chapters.is_empty() {
            return None;
        }
        log.push("explicit_title_split", format!("{} chapters", chapters.len()));
        Some(Discovery {
            chapters,
            plan: SplitPlan::Boundaries(Vec::new()),
            stats: None,
            log: ReconciliationLog::new(),
        })
    }

    /// Pattern matches from the best prior result act as fixed anchors.
    fn anchors_from(&self, text: &str, prior: &Option<Discovery>) -> Vec<Boundary> {
        let Some(Discovery { plan: SplitPlan::Pattern(source), .. }) = prior else {
            return Vec::new();
        };
        let Ok(pattern) = TitlePattern::compile(source, &self.cfg.end_keywords) else {
            return Vec::new();
        };
        self.splitter
            .find_matches(text, &pattern)
            .into_iter()
            .map(|m| Boundary {
                line_num: m.line_num,
                byte_pos: m.byte_pos,
                text: m.text,
                score: 1.0,
            })
            .collect()
    }

    /// Reject fragmented boundary-pipeline output.
    fn quality_reject(&self, chapters: &[Chapter]) -> Option<String> {
        if chapters.is_empty() {
            return Some("no chapters".to_string());
        }
        let short = chapters
            .iter()
            .filter(|c| c.length < self.cfg.min_chapter_length)
            .count();
        let short_ratio = short as f64 / chapters.len() as f64;
        if short_ratio > self.cfg.max_short_chapter_ratio {
            return Some(format!("{short} of {} chapters too short", chapters.len()));
        }
        let avg = chapters.iter().map(|c| c.length).sum::<usize>() / chapters.len();
        if avg < self.cfg.min_avg_chapter_length {
            return Some(format!("average body {avg} chars too small"));
        }
        None
    }

    /// Whether a discovery covers enough of the target to stand as final.
    fn covers(&self, discovery: &Discovery, expected: Option<usize>) -> bool {
        match expected {
            None => discovery
                .stats
                .as_ref()
                .map(|s| s.coverage_ok)
                .unwrap_or(false),
            Some(k) => discovery.chapters.len() as f64 >= self.cfg.coverage_floor * k as f64,
        }
    }
}

impl Default for ChapterEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_exact(discovery: &Discovery, expected: Option<usize>) -> bool {
    expected.map(|k| discovery.chapters.len() == k).unwrap_or(false)
}

/// Keep whichever discovery lands closer to the target count.
fn pick_best(best: Option<Discovery>, candidate: Discovery, expected: Option<usize>) -> Option<Discovery> {
    let Some(k) = expected else {
        return Some(best.unwrap_or(candidate));
    };
    match best {
        None => Some(candidate),
        Some(current) => {
            let cur = current.chapters.len().abs_diff(k);
            let new = candidate.chapters.len().abs_diff(k);
            if new < cur {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    }
}

/// Counts within a +/-2 band over the whole window mean no progress.
fn is_stagnant(counts: &[usize], window: usize) -> bool {
    if counts.len() < window {
        return false;
    }
    let recent = &counts[counts.len() - window..];
    let min = recent.iter().min().copied().unwrap_or(0);
    let max = recent.iter().max().copied().unwrap_or(0);
    max - min <= 2
}

/// Attach the shared log, summarise chapter kinds, and record any terminal
/// shortfall.
fn finish(mut discovery: Discovery, log: ReconciliationLog, expected: Option<usize>) -> Discovery {
    discovery.log = log;
    let special = discovery
        .chapters
        .iter()
        .filter(|c| c.kind != ChapterKind::Main)
        .count();
    if special > 0 {
        discovery.log.push(
            "classification",
            format!("{special} of {} chapters non-main", discovery.chapters.len()),
        );
    }
    if let Some(k) = expected {
        let got = discovery.chapters.len();
        if got == k {
            info!(chapters = got, "discovery reached the exact target");
        } else {
            let missing = missing_ordinals(&discovery.chapters, k);
            warn!(chapters = got, expected = k, "discovery fell short of the target");
            discovery.log.push(
                "final",
                format!("{got} of {k} chapters; missing ordinals {missing:?}"),
            );
        }
    }
    discovery
}

/// Ordinals in `1..=expected` absent from every title's first digit run.
fn missing_ordinals(chapters: &[Chapter], expected: usize) -> Vec<usize> {
    let mut found: Vec<usize> = chapters
        .iter()
        .filter_map(|c| first_number(&c.title))
        .collect();
    found.sort_unstable();
    (1..=expected).filter(|n| found.binary_search(n).is_err()).collect()
}

fn first_number(title: &str) -> Option<usize> {
    let digits: String = title
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
