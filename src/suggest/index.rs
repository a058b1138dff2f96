//! Identifier snapshot and its atomically swappable holder
//!
//! The persisted snapshot is a single JSON object mapping each identifier to the
//! documents that contain it:
//!
//! ```json
//! { "55500001": ["invoices/march.pdf"], "99998888": ["a.pdf", "b.pdf"] }
//! ```

use crate::error::{PagexError, Result};
use crate::suggest::ranker::{rank_suggestions, Suggestion};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Immutable identifier → documents mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries, dropping identifiers with no documents
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(_, docs)| !docs.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self::from_entries(raw))
    }

    /// Load the snapshot at `path`.
    ///
    /// A missing file is an empty index. Unparsable content is
    /// [`PagexError::CorruptIndex`].
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no identifier snapshot at {}", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_json(&data).map_err(|source| PagexError::CorruptIndex {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the snapshot as pretty JSON, replacing `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Record that `document` contains `identifier` (no duplicates per identifier)
    pub fn insert(&mut self, identifier: &str, document: &str) {
        let docs = self.entries.entry(identifier.to_string()).or_default();
        if !docs.iter().any(|d| d == document) {
            docs.push(document.to_string());
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&[String]> {
        self.entries.get(identifier).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Holder of the live identifier snapshot.
///
/// Readers take an `Arc` of the current snapshot and keep using it even if a
/// reload swaps in a new one; a reload never mutates a published snapshot.
pub struct SuggestionIndex {
    path: PathBuf,
    current: RwLock<Arc<IdentifierIndex>>,
    generation: AtomicU64,
}

impl SuggestionIndex {
    /// Create an empty index backed by the snapshot file at `path`.
    ///
    /// Nothing is read until [`reload`](Self::reload) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(IdentifierIndex::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Path of the persisted snapshot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory snapshot with the persisted one.
    ///
    /// On error the previous snapshot stays live. Returns the new entry count.
    pub fn reload(&self) -> Result<usize> {
        let fresh = IdentifierIndex::load(&self.path)?;
        let size = fresh.len();
        self.replace(fresh);
        info!(
            "loaded identifier index with {} entries from {}",
            size,
            self.path.display()
        );
        Ok(size)
    }

    /// Publish `snapshot` as the live index
    pub fn replace(&self, snapshot: IdentifierIndex) {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = snapshot;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<IdentifierIndex> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Number of identifiers in the current snapshot
    pub fn size(&self) -> usize {
        self.snapshot().len()
    }

    /// Incremented on every successful replacement
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Ranked suggestions for `query` against the current snapshot
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        rank_suggestions(&self.snapshot(), query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "55500001": ["march.pdf"],
        "99998888": ["a.pdf", "b.pdf"],
        "12121212": []
    }"#;

    #[test]
    fn test_missing_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = SuggestionIndex::new(dir.path().join("search_index.json"));

        assert_eq!(index.reload().unwrap(), 0);
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn test_reload_drops_empty_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_index.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let index = SuggestionIndex::new(&path);
        assert_eq!(index.reload().unwrap(), 2);

        let snapshot = index.snapshot();
        assert_eq!(snapshot.get("99998888").unwrap(), ["a.pdf", "b.pdf"]);
        assert!(snapshot.get("12121212").is_none());
    }

    #[test]
    fn test_reload_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_index.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let index = SuggestionIndex::new(&path);
        index.reload().unwrap();
        let first = index.snapshot();
        index.reload().unwrap();
        let second = index.snapshot();

        assert_eq!(first.len(), second.len());
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_corrupt_snapshot_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_index.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let index = SuggestionIndex::new(&path);
        index.reload().unwrap();
        let generation = index.generation();

        fs::write(&path, "{\"55500001\": [\"march.pdf\"").unwrap();
        let err = index.reload().unwrap_err();

        assert!(matches!(err, PagexError::CorruptIndex { .. }));
        assert_eq!(index.size(), 2);
        assert_eq!(index.generation(), generation);
    }

    #[test]
    fn test_corrupt_snapshot_on_first_load_stays_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_index.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let index = SuggestionIndex::new(&path);
        assert!(index.reload().is_err());
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let index = SuggestionIndex::new("unused.json");
        index.replace(IdentifierIndex::from_entries([(
            "111".to_string(),
            vec!["a.pdf".to_string()],
        )]));

        let held = index.snapshot();
        index.replace(IdentifierIndex::new());

        assert_eq!(held.len(), 1);
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let small = IdentifierIndex::from_entries([("1".to_string(), vec!["a".to_string()])]);
        let large = IdentifierIndex::from_entries(
            (0..500).map(|i| (format!("{:08}", i), vec!["b".to_string()])),
        );
        let index = Arc::new(SuggestionIndex::new("unused.json"));
        index.replace(small.clone());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let len = index.snapshot().len();
                        assert!(len == 1 || len == 500);
                    }
                })
            })
            .collect();

        for i in 0..50 {
            index.replace(if i % 2 == 0 { large.clone() } else { small.clone() });
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("search_index.json");

        let mut index = IdentifierIndex::new();
        index.insert("55500001", "march.pdf");
        index.insert("55500001", "march.pdf");
        index.insert("55500001", "april.pdf");
        index.save(&path).unwrap();

        let loaded = IdentifierIndex::load(&path).unwrap();
        assert_eq!(loaded.get("55500001").unwrap(), ["march.pdf", "april.pdf"]);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
