//! Chapter structure recovery for long plain-text novels.
//!
//! A web-novel dump is one huge text file with the chapter structure only
//! implied by its title lines. This crate recovers that structure: boundary
//! positions, titles, and body text, optionally driven toward an exact
//! expected chapter count.
//!
//! Discovery runs as an escalation ladder. A title pattern is proposed from
//! a sample and verified over the whole text; a partially covering pattern
//! is extended by adaptive retry; the match count is reconciled against the
//! target; and when patterns cannot get there, structural candidates are
//! scored and selected as explicit boundaries, with direct title enumeration
//! as the last resort. Shortfall is recorded, never raised as an error.
//!
//! Semantic judgement is injected through [`ScoringOracle`]; the engine
//! works offline with [`NullOracle`] using structural heuristics alone.
//!
//! ```
//! use chapterize_core::{ChapterEngine, EngineConfig, Input, NullOracle};
//!
//! let text = "제 1 화\n본문이 이어집니다.\n\n제 2 화\n다음 화 본문입니다.\n";
//! let engine = ChapterEngine::with_config(EngineConfig::compact());
//! let discovery = engine
//!     .discover(Input::from_text(text), None, &mut NullOracle)
//!     .unwrap();
//! assert!(discovery.chapters.len() <= 2);
//! ```

#![warn(missing_docs)]

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod optimizer;
pub mod oracle;
pub mod pattern;
pub mod sampler;
pub mod splitter;
pub mod topics;
pub mod types;

pub use cache::{content_hash, CacheRecord, CacheStore, FsCacheStore};
pub use config::EngineConfig;
pub use engine::{ChapterEngine, Discovery};
pub use error::{CoreError, Result};
pub use input::Input;
pub use oracle::{NullOracle, Paced, ScoreContext, ScoringOracle, NEUTRAL_SCORE};
pub use splitter::{PatternStats, Splitter};
pub use types::{Boundary, Chapter, ChapterKind, ReconciliationLog, SplitPlan};
