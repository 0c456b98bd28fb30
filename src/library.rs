//! Persistent content library: named collections plus a bounded fetch
//! history.
//!
//! The process owns one in-memory mirror, loaded once at startup (a missing
//! or malformed file yields an empty library, never a startup failure).
//! Every mutation happens under a mutex and is flushed to disk as a whole
//! JSON file before the lock is released, so read-modify-persist stays
//! atomic across threads. Write volume is one user action at a time; the
//! O(library size) rewrite is accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extract::metadata::PageMetadata;
use crate::fetch::FetchResult;
use crate::normalize::char_prefix;
use crate::platform::Platform;

/// History keeps the most recent entries only; oldest dropped first.
pub const HISTORY_LIMIT: usize = 200;
/// Characters of content kept in a history preview.
pub const PREVIEW_CHARS: usize = 500;
/// Maximum matches returned by a keyword search.
pub const SEARCH_LIMIT: usize = 10;

/// A full saved item inside a named collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "PageMetadata::is_empty")]
    pub metadata: PageMetadata,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

/// A condensed record of one fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "PageMetadata::is_empty")]
    pub metadata: PageMetadata,
    pub content_preview: String,
    pub content_length: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Persisted root: collections by (lower-cased) name, plus the history log.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<CollectionItem>>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A search hit, unified over collection items (full content) and history
/// entries (preview only), ready for prompt assembly.
#[derive(Debug, Clone)]
pub struct SourceDoc {
    pub url: String,
    pub title: String,
    pub date: Option<String>,
    pub content: String,
}

impl From<&CollectionItem> for SourceDoc {
    fn from(item: &CollectionItem) -> Self {
        Self {
            url: item.url.clone(),
            title: item.title.clone(),
            date: item.metadata.date.clone(),
            content: item.content.clone(),
        }
    }
}

impl From<&HistoryEntry> for SourceDoc {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            url: entry.url.clone(),
            title: entry.title.clone(),
            date: entry.metadata.date.clone(),
            content: entry.content_preview.clone(),
        }
    }
}

/// Owned store around the library file. All mutations persist synchronously.
pub struct LibraryStore {
    path: PathBuf,
    inner: Mutex<Library>,
}

impl LibraryStore {
    /// Open the store, loading the library file if present. A missing or
    /// unparseable file yields an empty default.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let library = load_library(&path);
        debug!(
            collections = library.collections.len(),
            history = library.history.len(),
            "Library loaded"
        );
        Self {
            path,
            inner: Mutex::new(library),
        }
    }

    /// Append a history entry for a successful fetch, evicting beyond
    /// [`HISTORY_LIMIT`], and persist.
    pub fn record_history(&self, result: &FetchResult) -> Result<()> {
        if result.error {
            warn!(url = %result.url, "Refusing to record an error result in history");
            return Ok(());
        }
        let entry = HistoryEntry {
            url: result.url.clone(),
            title: result.title.clone(),
            platform: result.platform,
            metadata: result.metadata.clone(),
            content_preview: char_prefix(&result.content, PREVIEW_CHARS),
            content_length: result.content.chars().count(),
            fetched_at: Utc::now(),
        };

        let mut lib = self.lock();
        lib.history.push(entry);
        if lib.history.len() > HISTORY_LIMIT {
            let excess = lib.history.len() - HISTORY_LIMIT;
            lib.history.drain(..excess);
        }
        self.persist(&lib)
    }

    /// Append the full result to a named collection (created if absent) and
    /// persist. Names fold case-insensitively. Returns the new item count.
    pub fn add_to_collection(&self, name: &str, result: &FetchResult) -> Result<usize> {
        if result.error {
            warn!(url = %result.url, "Refusing to save an error result to a collection");
            anyhow::bail!("cannot save a failed fetch");
        }
        let name = normalize_name(name);
        let item = CollectionItem {
            url: result.url.clone(),
            title: result.title.clone(),
            platform: result.platform,
            metadata: result.metadata.clone(),
            content: result.content.clone(),
            fetched_at: Utc::now(),
        };

        let mut lib = self.lock();
        let items = lib.collections.entry(name).or_default();
        items.push(item);
        let count = items.len();
        self.persist(&lib)?;
        Ok(count)
    }

    /// Delete a collection. Returns false (and persists nothing) when the
    /// name does not exist.
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        let name = normalize_name(name);
        let mut lib = self.lock();
        if lib.collections.remove(&name).is_none() {
            return Ok(false);
        }
        self.persist(&lib)?;
        Ok(true)
    }

    /// Case-insensitive keyword search over all collection items and history
    /// previews. Matches against title + a `prefix_chars` content prefix,
    /// deduplicates by URL (collection hits suppress history duplicates),
    /// and keeps the [`SEARCH_LIMIT`] most recent matches.
    ///
    /// Collections are scanned in name order (the map is sorted), so when
    /// more than [`SEARCH_LIMIT`] items match across collections, the kept
    /// tail favors later-named collections, then history recency.
    pub fn search_by_keyword(&self, term: &str, prefix_chars: usize) -> Vec<SourceDoc> {
        let needle = term.to_lowercase();
        let lib = self.lock();
        let mut hits: Vec<SourceDoc> = Vec::new();

        for items in lib.collections.values() {
            for item in items {
                let blob = format!(
                    "{} {}",
                    item.title.to_lowercase(),
                    char_prefix(&item.content, prefix_chars).to_lowercase()
                );
                if blob.contains(&needle) {
                    hits.push(SourceDoc::from(item));
                }
            }
        }
        for entry in &lib.history {
            let blob = format!(
                "{} {}",
                entry.title.to_lowercase(),
                entry.content_preview.to_lowercase()
            );
            if blob.contains(&needle) && !hits.iter().any(|h| h.url == entry.url) {
                hits.push(SourceDoc::from(entry));
            }
        }

        // Most-recently-appended bias: keep the tail.
        if hits.len() > SEARCH_LIMIT {
            hits.drain(..hits.len() - SEARCH_LIMIT);
        }
        hits
    }

    /// Items of one collection, if it exists.
    pub fn collection(&self, name: &str) -> Option<Vec<CollectionItem>> {
        self.lock().collections.get(&normalize_name(name)).cloned()
    }

    /// All collection names with their item counts.
    pub fn collection_summaries(&self) -> Vec<(String, usize)> {
        self.lock()
            .collections
            .iter()
            .map(|(name, items)| (name.clone(), items.len()))
            .collect()
    }

    /// The `n` newest history entries, newest first.
    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.lock().history.iter().rev().take(n).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn collections_len(&self) -> usize {
        self.lock().collections.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Library> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whole-file durable rewrite. Called with the mutation lock held.
    fn persist(&self, library: &Library) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(library).context("serializing library")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Collection names are lower-cased and trimmed; collisions fold together.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn load_library(path: &Path) -> Library {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Library file {} is malformed ({e}), starting empty", path.display());
            Library::default()
        }),
        Err(_) => Library::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(url: &str, title: &str, content: &str) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            platform: Platform::General,
            metadata: PageMetadata::default(),
            error: false,
        }
    }

    fn temp_store() -> (tempfile::TempDir, LibraryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(dir.path().join("content_library.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_yields_empty_library() {
        let (_dir, store) = temp_store();
        assert_eq!(store.history_len(), 0);
        assert_eq!(store.collections_len(), 0);
    }

    #[test]
    fn malformed_file_yields_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content_library.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = LibraryStore::open(&path);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn history_evicts_oldest_beyond_limit() {
        let (_dir, store) = temp_store();
        for i in 0..=HISTORY_LIMIT {
            let result = sample_result(&format!("https://example.com/{i}"), "t", "c");
            store.record_history(&result).unwrap();
        }
        assert_eq!(store.history_len(), HISTORY_LIMIT);
        let oldest = store.recent_history(HISTORY_LIMIT).pop().unwrap();
        // Entry 0 was evicted; the oldest survivor is entry 1.
        assert_eq!(oldest.url, "https://example.com/1");
    }

    #[test]
    fn history_refuses_error_results() {
        let (_dir, store) = temp_store();
        let mut result = sample_result("https://example.com", "", "HTTP 500");
        result.error = true;
        store.record_history(&result).unwrap();
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn collection_names_fold_case_and_whitespace() {
        let (_dir, store) = temp_store();
        store
            .add_to_collection("Foo", &sample_result("https://a", "x", "1"))
            .unwrap();
        let count = store
            .add_to_collection("  foo ", &sample_result("https://b", "y", "2"))
            .unwrap();
        assert_eq!(count, 2);
        let items = store.collection("foo").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://a");
        assert_eq!(items[1].url, "https://b");
        assert_eq!(store.collections_len(), 1);
    }

    #[test]
    fn delete_collection_reports_not_found() {
        let (_dir, store) = temp_store();
        assert!(!store.delete_collection("nope").unwrap());
        store
            .add_to_collection("keep", &sample_result("https://a", "x", "1"))
            .unwrap();
        assert!(store.delete_collection("KEEP").unwrap());
        assert!(store.collection("keep").is_none());
    }

    #[test]
    fn search_deduplicates_collection_and_history_by_url() {
        let (_dir, store) = temp_store();
        let result = sample_result("https://same.example/post", "Rust tricks", "All about rust.");
        store.record_history(&result).unwrap();
        store.add_to_collection("lang", &result).unwrap();

        let hits = store.search_by_keyword("rust", 2000);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://same.example/post");
        // The collection hit carries full content, not the preview.
        assert_eq!(hits[0].content, "All about rust.");
    }

    #[test]
    fn search_scans_collections_in_name_order() {
        let (_dir, store) = temp_store();
        store
            .add_to_collection("zeta", &sample_result("https://z", "shared topic", "z body"))
            .unwrap();
        store
            .add_to_collection("alpha", &sample_result("https://a", "shared topic", "a body"))
            .unwrap();

        let hits = store.search_by_keyword("shared topic", 2000);
        assert_eq!(hits.len(), 2);
        // Name order, not insertion order.
        assert_eq!(hits[0].url, "https://a");
        assert_eq!(hits[1].url, "https://z");
    }

    #[test]
    fn search_is_case_insensitive_and_bounded() {
        let (_dir, store) = temp_store();
        for i in 0..15 {
            let result = sample_result(&format!("https://e.com/{i}"), "Topic ZEBRA", "body");
            store.record_history(&result).unwrap();
        }
        let hits = store.search_by_keyword("zebra", 2000);
        assert_eq!(hits.len(), SEARCH_LIMIT);
        // Most-recent bias: the earliest entries fall off the front.
        assert_eq!(hits[0].url, "https://e.com/5");
        assert_eq!(hits.last().unwrap().url, "https://e.com/14");
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content_library.json");
        {
            let store = LibraryStore::open(&path);
            store
                .add_to_collection("news", &sample_result("https://n", "headline", "text"))
                .unwrap();
            store
                .record_history(&sample_result("https://h", "hist", "text"))
                .unwrap();
        }
        let reloaded = LibraryStore::open(&path);
        assert_eq!(reloaded.collection("news").unwrap().len(), 1);
        assert_eq!(reloaded.history_len(), 1);
    }
}
