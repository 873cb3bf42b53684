//! Trace deduplication across instances
//!
//! Entries are keyed by source path. Each entry remembers the content
//! fingerprint it was parsed from, so a trace file rewritten in place is
//! detected and parsed again instead of silently reusing stale jobs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::TraceJob;

/// (directory, file name) of a trace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceKey {
    pub dir: PathBuf,
    pub file: String,
}

impl TraceKey {
    pub fn new(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

/// Parsed representation owned by the first instance that read the trace
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Instance whose `Fmt/` artifacts hold this trace
    pub owner: usize,
    pub fingerprint: String,
    pub jobs: Arc<[TraceJob]>,
    pub start_time: i64,
}

/// Result of looking a trace up
#[derive(Debug)]
pub enum Lookup<'a> {
    /// Same path, same content
    Hit(&'a TraceEntry),
    /// Same path, content changed since it was parsed
    Stale(&'a TraceEntry),
    Miss,
}

#[derive(Debug, Default)]
pub struct TraceRegistry {
    entries: HashMap<TraceKey, TraceEntry>,
}

impl TraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &TraceKey, fingerprint: &str) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(entry) if entry.fingerprint == fingerprint => Lookup::Hit(entry),
            Some(entry) => Lookup::Stale(entry),
            None => Lookup::Miss,
        }
    }

    /// Record (or re-point) the entry for `key`
    pub fn insert(&mut self, key: TraceKey, entry: TraceEntry) {
        self.entries.insert(key, entry);
    }

    pub fn owner_of(&self, key: &TraceKey) -> Option<usize> {
        self.entries.get(key).map(|e| e.owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(owner: usize, fingerprint: &str) -> TraceEntry {
        TraceEntry {
            owner,
            fingerprint: fingerprint.to_string(),
            jobs: Arc::from(Vec::new()),
            start_time: 0,
        }
    }

    #[test]
    fn test_lookup_distinguishes_hit_stale_miss() {
        let mut registry = TraceRegistry::new();
        let key = TraceKey::new("/data", "theta.swf");
        registry.insert(key.clone(), entry(0, "aa"));

        assert!(matches!(registry.lookup(&key, "aa"), Lookup::Hit(e) if e.owner == 0));
        assert!(matches!(registry.lookup(&key, "bb"), Lookup::Stale(_)));
        assert!(matches!(
            registry.lookup(&TraceKey::new("/data", "other.swf"), "aa"),
            Lookup::Miss
        ));
    }

    #[test]
    fn test_insert_repoints_existing_key() {
        let mut registry = TraceRegistry::new();
        let key = TraceKey::new("/data", "theta.swf");
        registry.insert(key.clone(), entry(0, "aa"));
        registry.insert(key.clone(), entry(3, "bb"));

        assert_eq!(registry.owner_of(&key), Some(3));
        assert_eq!(registry.len(), 1);
    }
}
