//! Search History
//!
//! Newest-first list of past searches, persisted as JSON. A missing or
//! unreadable file starts an empty history; write failures are logged
//! and never abort a search.
//!
//! Changes are serialized through `write_lock` and each snapshot is
//! written on the blocking pool to a sibling temp file, then renamed
//! over the target, so the file on disk is always a complete list.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, Blockchain, ErrorCode, SearchEntry};
use crate::utils::constants::MAX_HISTORY_ENTRIES;

pub struct SearchHistory {
    path: Option<PathBuf>,
    entries: RwLock<Vec<SearchEntry>>,
    /// Held from mutation until the snapshot is on disk
    write_lock: Mutex<()>,
    capacity: usize,
}

impl SearchHistory {
    /// History backed by a JSON file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ Could not load search history from {}: {}", path.display(), e);
                Vec::new()
            }
        };
        debug!("📜 Loaded {} history entries from {}", entries.len(), path.display());

        Self {
            path: Some(path),
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
            capacity: MAX_HISTORY_ENTRIES,
        }
    }

    /// History that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
            capacity: MAX_HISTORY_ENTRIES,
        }
    }

    /// Record a search. Returns whether the history was persisted.
    pub async fn add(&self, address: &str, blockchain: Blockchain) -> bool {
        let entry = SearchEntry {
            timestamp: Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            address: address.to_string(),
            blockchain,
        };

        let _guard = self.write_lock.lock().await;
        let snapshot = self.update(|entries| {
            if let Some(pos) = entries.iter().position(|e| {
                e.blockchain == blockchain && e.address.eq_ignore_ascii_case(address)
            }) {
                entries.remove(pos);
            }
            entries.insert(0, entry);
            entries.truncate(self.capacity);
        });

        self.persist(snapshot).await
    }

    pub fn list(&self) -> Vec<SearchEntry> {
        match self.entries.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every search. Returns whether the history was persisted.
    pub async fn clear(&self) -> bool {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.update(|entries| entries.clear());
        self.persist(snapshot).await
    }

    fn update(&self, apply: impl FnOnce(&mut Vec<SearchEntry>)) -> Vec<SearchEntry> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut entries);
        entries.clone()
    }

    /// Callers hold `write_lock`
    async fn persist(&self, entries: Vec<SearchEntry>) -> bool {
        let Some(path) = self.path.clone() else {
            return true;
        };
        let result = tokio::task::spawn_blocking(move || save_entries(&path, &entries))
            .await
            .map_err(|e| AppError::with_source(ErrorCode::Unknown, "History writer panicked", e))
            .and_then(|saved| saved);

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ Could not save search history: {}", e);
                false
            }
        }
    }
}

fn load_entries(path: &Path) -> AppResult<Vec<SearchEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn save_entries(path: &Path, entries: &[SearchEntry]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(entries).map_err(|e| {
        AppError::with_source(ErrorCode::Unknown, "Could not encode search history", e)
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history.json".to_string());
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));
    std::fs::write(&tmp, json)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_newest_first_and_dedup_case_insensitive() {
        let history = SearchHistory::in_memory();
        history.add("0xAAA", Blockchain::Ethereum).await;
        history.add("0xbbb", Blockchain::Ethereum).await;
        history.add("0xaaa", Blockchain::Ethereum).await;

        let entries = history.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address, "0xaaa");
        assert_eq!(entries[1].address, "0xbbb");
    }

    #[tokio::test]
    async fn test_same_address_other_chain_is_separate() {
        let history = SearchHistory::in_memory();
        history.add("0xaaa", Blockchain::Ethereum).await;
        history.add("0xaaa", Blockchain::Base).await;
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let history = SearchHistory::in_memory();
        for i in 0..(MAX_HISTORY_ENTRIES + 15) {
            history.add(&format!("0x{:040x}", i), Blockchain::Polygon).await;
        }
        let entries = history.list();
        assert_eq!(entries.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(entries[0].address, format!("0x{:040x}", MAX_HISTORY_ENTRIES + 14));
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let history = SearchHistory::open(&path);
        assert!(history.is_empty());
        assert!(history.add("0xabc", Blockchain::Arbitrum).await);

        let reloaded = SearchHistory::open(&path);
        let entries = reloaded.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].blockchain, Blockchain::Arbitrum);

        assert!(reloaded.clear().await);
        assert!(SearchHistory::open(&path).is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SearchHistory::open(&path).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_adds_keep_file_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        for round in 0..10 {
            let history = Arc::new(SearchHistory::open(&path));
            assert!(history.clear().await);

            let tasks: Vec<_> = (0..8)
                .map(|worker| {
                    let history = history.clone();
                    tokio::spawn(async move {
                        for i in 0..10 {
                            let address = format!("0x{:038x}{:02x}", worker, i);
                            assert!(history.add(&address, Blockchain::Ethereum).await);
                        }
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            let on_disk = SearchHistory::open(&path).list();
            assert_eq!(history.len(), 80, "round {round}");
            assert_eq!(on_disk, history.list(), "round {round}");
        }

        // No temp files left behind
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
