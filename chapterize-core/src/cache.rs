//! Persisted discovery results
//!
//! A discovery run is expensive (oracle calls, full-text scans), so its
//! outcome is cached content-addressed: the SHA-256 of the input text keys a
//! JSON record from which the chapter list rebuilds exactly. Write-once,
//! read-mostly; a changed input simply misses.

use crate::engine::Discovery;
use crate::error::Result;
use crate::splitter::PatternStats;
use crate::types::{Chapter, ReconciliationLog, SplitPlan};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Everything needed to rebuild a discovery result without re-running it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// The recovered chapters
    pub chapters: Vec<Chapter>,
    /// The representation that produced them
    pub plan: SplitPlan,
    /// Final pattern coverage, when a pattern won
    pub stats: Option<PatternStats>,
    /// The escalation record
    pub log: ReconciliationLog,
}

impl From<&Discovery> for CacheRecord {
    fn from(d: &Discovery) -> Self {
        Self {
            chapters: d.chapters.clone(),
            plan: d.plan.clone(),
            stats: d.stats.clone(),
            log: d.log.clone(),
        }
    }
}

/// Storage for cache records, keyed by content hash.
pub trait CacheStore {
    /// Persist a record under `key`.
    fn put(&self, key: &str, record: &CacheRecord) -> Result<()>;

    /// Load the record stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<CacheRecord>>;
}

/// Cache store writing one `<hash>.json` per record under a directory.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    dir: PathBuf,
}

impl FsCacheStore {
    /// Open (creating if needed) a cache directory.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FsCacheStore {
    fn put(&self, key: &str, record: &CacheRecord) -> Result<()> {
        let path = self.path_for(key);
        let json = serde_json::to_string(record)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "cache record written");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

/// SHA-256 of the text, hex-encoded. The cache key for one input.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
