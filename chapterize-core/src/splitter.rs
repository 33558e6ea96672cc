//! Text segmentation
//!
//! Turns a split plan into chapters. Two modes: pattern mode walks the text
//! line by line against a compiled title pattern; boundary mode cuts at
//! pre-selected byte positions and emits exactly one chapter per boundary.
//! This module also hosts pattern verification and gap analysis, since both
//! are line walks over the same representation.

use crate::error::{CoreError, Result};
use crate::pattern::TitlePattern;
use crate::types::{Boundary, Chapter};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Coverage statistics for a pattern over a text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternStats {
    /// Number of title lines matched
    pub match_count: usize,
    /// Byte offset of the last matching line
    pub last_match_pos: usize,
    /// `last_match_pos / text length`
    pub last_match_ratio: f64,
    /// Bytes after the last match
    pub tail_size: usize,
    /// Whether the pattern covers the file end-to-end
    pub coverage_ok: bool,
}

/// A contiguous unmatched region between title matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapRegion {
    /// Byte offset where the gap starts
    pub start: usize,
    /// Byte offset where the gap ends
    pub end: usize,
    /// Gap size in bytes
    pub size: usize,
}

/// A single title-line match.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Byte offset of the start of the matching line
    pub byte_pos: usize,
    /// Zero-based line number
    pub line_num: usize,
    /// The matched line, trimmed
    pub text: String,
}

/// Tail size below which a pattern is considered to reach the end of file
const COVERAGE_TAIL_LIMIT: usize = 20_000;

/// Coverage ratio above which the tail size is not consulted
const COVERAGE_RATIO_LIMIT: f64 = 0.99;

/// Unmatched head regions larger than this are gaps
const HEAD_GAP_LIMIT: usize = 50 * 1024;

/// Unmatched inner regions larger than this are gaps
const INNER_GAP_LIMIT: usize = 100 * 1024;

/// Unmatched tail regions larger than this are gaps
const TAIL_GAP_LIMIT: usize = 50 * 1024;

/// At most this many gaps are reported, largest first
const MAX_REPORTED_GAPS: usize = 5;

/// Splits text into chapters from a pattern or a boundary list.
#[derive(Debug, Clone)]
pub struct Splitter {
    /// Bodies shorter than this may be folded into the next chapter
    min_body_length: usize,
    /// Titles are truncated to this many chars
    max_title_length: usize,
    /// Trailing text up to this length becomes a subtitle, beyond it body
    subtitle_limit: usize,
}

struct PendingChapter {
    title: String,
    subtitle: Option<String>,
    body: String,
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            min_body_length: 100,
            max_title_length: 100,
            subtitle_limit: 20,
        }
    }
}

impl Splitter {
    /// Create a splitter with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `text` at every line the pattern matches.
    ///
    /// Permissive patterns (`.+`, `.`, `.*`) match everything, so they are
    /// only honoured against `explicit_titles`: a line splits iff its trimmed
    /// form equals one of the given titles. A permissive pattern with no
    /// titles yields the whole text as a single chapter.
    pub fn split(
        &self,
        text: &str,
        pattern: &TitlePattern,
        explicit_titles: &[String],
    ) -> Vec<Chapter> {
        let permissive = pattern.is_permissive();
        if permissive && explicit_titles.is_empty() {
            warn!("permissive pattern without explicit titles, emitting one chapter");
            return vec![Chapter::new(1, "전체".to_string(), None, text.trim().to_string())];
        }

        let mut chapters: Vec<Chapter> = Vec::new();
        let mut pending: Option<PendingChapter> = None;
        // A finalized-but-tiny chapter waiting to be folded into the next body
        let mut carry = String::new();
        let mut preamble = String::new();

        for line in text.split_inclusive('\n') {
            let trimmed = line.trim();

            let title_match = if trimmed.is_empty() {
                None
            } else if permissive {
                explicit_titles
                    .iter()
                    .any(|t| t == trimmed)
                    .then(|| (trimmed, ""))
            } else {
                pattern.find(trimmed).map(|m| {
                    let tail = trimmed[m.end()..].trim();
                    (m.as_str().trim(), tail)
                })
            };

            let Some((matched, tail)) = title_match else {
                match pending.as_mut() {
                    Some(p) => p.body.push_str(line),
                    None => preamble.push_str(line),
                }
                continue;
            };

            // Adjacent title lines with a bracketed lead fragment are one
            // multi-line title, not a zero-body chapter.
            if let Some(p) = pending.as_mut() {
                if p.body.trim().is_empty() && starts_bracketed(&p.title) {
                    p.title = format!("{} | {}", p.title, matched);
                    if p.subtitle.is_none() && !tail.is_empty() {
                        p.subtitle = Some(tail.to_string());
                    }
                    continue;
                }
            }

            if let Some(p) = pending.take() {
                self.finalize(p, &mut chapters, &mut carry);
            }

            let mut body = std::mem::take(&mut carry);
            let mut subtitle = None;
            if !tail.is_empty() {
                // Over-long trailing text is almost always body prose the
                // pattern swallowed; short trailing text is a subtitle.
                if tail.chars().count() > self.subtitle_limit {
                    body.push_str(tail);
                    body.push('\n');
                } else {
                    subtitle = Some(tail.to_string());
                }
            }

            pending = Some(PendingChapter {
                title: self.clip_title(matched),
                subtitle,
                body,
            });
        }

        match pending {
            Some(mut p) => {
                // The last chapter keeps its text even when tiny; there is no
                // next buffer to fold into.
                if !preamble.trim().is_empty() && chapters.is_empty() {
                    p.body = format!("{preamble}{}", p.body);
                }
                let id = chapters.len() + 1;
                chapters.push(Chapter::new(
                    id,
                    p.title,
                    p.subtitle,
                    p.body.trim().to_string(),
                ));
            }
            None if !carry.trim().is_empty() => {
                let id = chapters.len() + 1;
                chapters.push(Chapter::new(id, "전체".to_string(), None, carry.trim().to_string()));
            }
            None => {}
        }

        // Text before the first title folds into the first chapter's body so
        // no prose is lost.
        if !preamble.trim().is_empty() {
            if let Some(first) = chapters.first_mut() {
                if !first.body.starts_with(preamble.trim()) {
                    *first = Chapter::new(
                        first.id,
                        first.title.clone(),
                        first.subtitle.clone(),
                        format!("{}\n{}", preamble.trim(), first.body),
                    );
                }
            }
        }

        debug!(chapters = chapters.len(), "pattern split complete");
        chapters
    }

    fn finalize(&self, p: PendingChapter, chapters: &mut Vec<Chapter>, carry: &mut String) {
        let body = p.body.trim().to_string();

        // A tiny body under a numeral-less title is almost always a false
        // match; fold the whole thing into the next chapter's body.
        let has_digit = p.title.chars().any(|c| c.is_ascii_digit());
        if body.chars().count() < self.min_body_length && !has_digit {
            carry.push_str(&p.title);
            carry.push('\n');
            if !body.is_empty() {
                carry.push_str(&body);
                carry.push('\n');
            }
            return;
        }

        let id = chapters.len() + 1;
        chapters.push(Chapter::new(id, p.title, p.subtitle, body));
    }

    fn clip_title(&self, title: &str) -> String {
        if title.chars().count() > self.max_title_length {
            title.chars().take(self.max_title_length).collect()
        } else {
            title.to_string()
        }
    }

    /// Cut `text` at pre-selected boundaries, one chapter per boundary.
    ///
    /// The boundary list is validated up front: it must be non-empty, every
    /// position must lie inside the text on a character boundary, and every
    /// title must be non-blank. Emits exactly `boundaries.len()` chapters.
    pub fn split_by_boundaries(
        &self,
        text: &str,
        boundaries: &[Boundary],
    ) -> Result<Vec<Chapter>> {
        if boundaries.is_empty() {
            return Err(CoreError::InvalidBoundary {
                reason: "boundary list is empty".to_string(),
            });
        }
        for b in boundaries {
            if b.byte_pos >= text.len() {
                return Err(CoreError::InvalidBoundary {
                    reason: format!(
                        "boundary at byte {} is outside the text ({} bytes)",
                        b.byte_pos,
                        text.len()
                    ),
                });
            }
            if !text.is_char_boundary(b.byte_pos) {
                return Err(CoreError::InvalidBoundary {
                    reason: format!("byte {} is not a character boundary", b.byte_pos),
                });
            }
            if b.text.trim().is_empty() {
                return Err(CoreError::InvalidBoundary {
                    reason: format!("boundary at byte {} has a blank title", b.byte_pos),
                });
            }
        }

        let mut sorted: Vec<&Boundary> = boundaries.iter().collect();
        sorted.sort_by_key(|b| b.byte_pos);

        let mut chapters = Vec::with_capacity(sorted.len());
        for (i, b) in sorted.iter().enumerate() {
            let end = sorted
                .get(i + 1)
                .map(|next| next.byte_pos)
                .unwrap_or(text.len());
            let segment = &text[b.byte_pos..end];
            // The first line of the segment is the title line itself.
            let body = match segment.find('\n') {
                Some(nl) => segment[nl + 1..].trim(),
                None => "",
            };
            chapters.push(Chapter::new(
                i + 1,
                self.clip_title(b.text.trim()),
                None,
                body.to_string(),
            ));
        }

        debug!(chapters = chapters.len(), "boundary split complete");
        Ok(chapters)
    }

    /// Measure how well a pattern covers the text.
    ///
    /// Pure over its inputs: verifying twice yields identical stats.
    pub fn verify(&self, text: &str, pattern: &TitlePattern) -> PatternStats {
        let matches = self.find_matches(text, pattern);
        let (last_pos, count) = match matches.last() {
            Some(m) => (m.byte_pos, matches.len()),
            None => (0, 0),
        };
        let ratio = if text.is_empty() {
            0.0
        } else {
            last_pos as f64 / text.len() as f64
        };
        let tail = text.len() - last_pos;
        PatternStats {
            match_count: count,
            last_match_pos: last_pos,
            last_match_ratio: ratio,
            tail_size: tail,
            coverage_ok: count > 0 && (ratio > COVERAGE_RATIO_LIMIT || tail < COVERAGE_TAIL_LIMIT),
        }
    }

    /// All title-line matches, in file order.
    pub fn find_matches(&self, text: &str, pattern: &TitlePattern) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        let mut byte_pos = 0usize;
        for (line_num, line) in text.split_inclusive('\n').enumerate() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && pattern.find(trimmed).is_some() {
                matches.push(PatternMatch {
                    byte_pos,
                    line_num,
                    text: trimmed.to_string(),
                });
            }
            byte_pos += line.len();
        }
        matches
    }

    /// Large unmatched regions, largest first, capped at five.
    ///
    /// Head and tail regions count as gaps above 50 KB; inner regions above
    /// 100 KB, since some spread between consecutive titles is normal.
    pub fn find_gaps(&self, text: &str, matches: &[PatternMatch]) -> Vec<GapRegion> {
        let mut gaps = Vec::new();

        if let Some(first) = matches.first() {
            if first.byte_pos > HEAD_GAP_LIMIT {
                gaps.push(GapRegion {
                    start: 0,
                    end: first.byte_pos,
                    size: first.byte_pos,
                });
            }
        }
        for pair in matches.windows(2) {
            let size = pair[1].byte_pos - pair[0].byte_pos;
            if size > INNER_GAP_LIMIT {
                gaps.push(GapRegion {
                    start: pair[0].byte_pos,
                    end: pair[1].byte_pos,
                    size,
                });
            }
        }
        if let Some(last) = matches.last() {
            let size = text.len() - last.byte_pos;
            if size > TAIL_GAP_LIMIT {
                gaps.push(GapRegion {
                    start: last.byte_pos,
                    end: text.len(),
                    size,
                });
            }
        }

        gaps.sort_by(|a, b| b.size.cmp(&a.size));
        gaps.truncate(MAX_REPORTED_GAPS);
        gaps
    }
}

fn starts_bracketed(title: &str) -> bool {
    title.starts_with('[') || title.starts_with('【')
}
