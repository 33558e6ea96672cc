//! Core data model: chapters, candidates, boundaries, reconciliation log

use serde::{Deserialize, Serialize};

/// Classification of a chapter by its title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterKind {
    /// Regular numbered episode of the main story
    Main,
    /// Side story / extra episode
    Extra,
    /// Epilogue or post-ending chapter
    Epilogue,
    /// Author's note or afterword
    AuthorNote,
    /// Prologue, interlude, or otherwise unclassified
    Other,
}

const EXTRA_KEYWORDS: &[&str] = &["외전", "번외", "특별편", "side story"];
const EPILOGUE_KEYWORDS: &[&str] = &["에필로그", "epilogue", "후일담"];
const AUTHOR_KEYWORDS: &[&str] = &["작가의 말", "작가 후기", "후기", "author's note"];
const OTHER_KEYWORDS: &[&str] = &["프롤로그", "prologue", "서장", "막간"];

impl ChapterKind {
    /// Classify a chapter by keyword matching on its title.
    ///
    /// Author-note keywords take precedence over epilogue keywords, which
    /// take precedence over extra keywords; everything else is `Main` unless
    /// it looks like a prologue/interlude.
    pub fn classify(title: &str) -> Self {
        let lower = title.to_lowercase();
        if AUTHOR_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            ChapterKind::AuthorNote
        } else if EPILOGUE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            ChapterKind::Epilogue
        } else if EXTRA_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            ChapterKind::Extra
        } else if OTHER_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            ChapterKind::Other
        } else {
            ChapterKind::Main
        }
    }
}

/// A segment of the source file, emitted once by the splitter and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Ordinal within one run, starting at 1
    pub id: usize,
    /// Title line(s); merged with " | " when coalesced from multiple lines
    pub title: String,
    /// Short trailing text after the matched title segment, if any
    pub subtitle: Option<String>,
    /// Trimmed body text with title lines removed
    pub body: String,
    /// Character count of the body
    pub length: usize,
    /// Keyword-derived classification
    pub kind: ChapterKind,
}

impl Chapter {
    /// Build a chapter, deriving `length` and `kind` from the fields given.
    pub fn new(id: usize, title: String, subtitle: Option<String>, body: String) -> Self {
        let length = body.chars().count();
        let kind = ChapterKind::classify(&title);
        Self {
            id,
            title,
            subtitle,
            body,
            length,
            kind,
        }
    }
}

/// Named structural signals detected on a candidate line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFeatures {
    /// Fewer than 50 characters
    pub is_short: bool,
    /// Fewer than 30 characters
    pub is_very_short: bool,
    /// Blank lines immediately preceding
    pub blank_before: usize,
    /// Chapter-indicator token present (numbered marker, separator line, ...)
    pub has_chapter_indicator: bool,
    /// Date or place marker present
    pub has_time_place: bool,
    /// Contains a digit
    pub has_number: bool,
    /// Contains bracket characters
    pub has_brackets: bool,
    /// Ends with terminal punctuation
    pub ends_with_punctuation: bool,
    /// All uppercase (for scripts with case)
    pub is_all_caps: bool,
    /// Whitespace-separated word count
    pub word_count: usize,
    /// The following line is markedly longer, suggesting prose after a title
    pub longer_line_after: bool,
    /// The preceding line is long prose
    pub long_line_before: bool,
    /// Quoted or exclamatory line: penalized
    pub is_dialogue: bool,
    /// Sentence-shaped line: penalized
    pub is_sentence: bool,
}

/// An unresolved hypothesis for a chapter boundary.
///
/// Ephemeral: candidates exist only during boundary discovery and are
/// promoted to [`Boundary`] by the optimizer.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 0-indexed line number
    pub line_num: usize,
    /// The stripped line text
    pub text: String,
    /// Structural confidence in [0, 1]
    pub confidence: f64,
    /// Detected structural signals
    pub features: CandidateFeatures,
    /// Oracle-assigned likelihood, when scoring ran
    pub oracle_score: Option<f64>,
}

impl Candidate {
    /// Weighted fusion of oracle and structural scores.
    ///
    /// The oracle score defaults to the structural confidence when absent, so
    /// an offline oracle degrades to structural-only ranking.
    pub fn combined_score(&self) -> f64 {
        let oracle = self.oracle_score.unwrap_or(self.confidence);
        oracle * 0.7 + self.confidence * 0.3
    }
}

/// A position-resolved, accepted chapter start. Immutable once selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// 0-indexed line number
    pub line_num: usize,
    /// Absolute byte offset of the line start
    pub byte_pos: usize,
    /// The stripped title line
    pub text: String,
    /// Combined score at selection time (1.0 for pattern-match anchors)
    pub score: f64,
}

/// Which representation produced the final chapter list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum SplitPlan {
    /// A validated regular expression matched the title lines
    Pattern(String),
    /// An explicit boundary list resolved by the optimizer
    Boundaries(Vec<Boundary>),
}

/// One escalation attempt and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileEntry {
    /// The strategy that was attempted
    pub strategy: String,
    /// What happened
    pub outcome: String,
}

/// Ordered, human-readable record of escalation attempts for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationLog {
    /// Entries in attempt order
    pub entries: Vec<ReconcileEntry>,
}

impl ReconciliationLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt record
    pub fn push(&mut self, strategy: impl Into<String>, outcome: impl Into<String>) {
        self.entries.push(ReconcileEntry {
            strategy: strategy.into(),
            outcome: outcome.into(),
        });
    }
}

impl std::fmt::Display for ReconciliationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "{}. {}: {}", i + 1, entry.strategy, entry.outcome)?;
        }
        Ok(())
    }
}
