use crate::config::IndexerMode;
use crate::document::sha256_hex;
use crate::error::{ReaderError, Result};
use crate::types::BoundaryTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// On-disk cache of boundary tables keyed by (document path, content hash).
///
/// One JSON file per path. An entry whose content hash or indexer mode no
/// longer matches is removed on lookup.
#[derive(Debug, Clone)]
pub struct BoundaryCache {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize, Debug)]
struct CacheEnvelope<T> {
    created_ms: u64,
    path: String,
    content_hash: String,
    indexer: IndexerMode,
    data: T,
}

impl BoundaryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ReaderError::cache(format!("Cannot create cache dir {}: {e}", self.dir.display()))
        })
    }

    /// Cache file for a document path
    #[must_use]
    pub fn entry_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(path.as_bytes())))
    }

    /// Cached table for `path`, if it was built from the same content with
    /// the same indexer
    pub fn load(&self, path: &str, content_hash: &str, indexer: IndexerMode) -> Option<BoundaryTable> {
        let entry = self.entry_path(path);
        let bytes = std::fs::read(&entry).ok()?;

        let envelope: CacheEnvelope<BoundaryTable> = match serde_json::from_slice(&bytes) {
            Ok(val) => val,
            Err(err) => {
                log::warn!("Boundary cache corrupted {}: {err}", entry.display());
                self.remove_entry(&entry);
                return None;
            }
        };

        if envelope.path != path || envelope.content_hash != content_hash || envelope.indexer != indexer {
            log::debug!("Boundary cache stale for {path}");
            self.remove_entry(&entry);
            return None;
        }

        Some(envelope.data)
    }

    /// Store `table` for `path` (temp file + rename)
    pub fn store(
        &self,
        path: &str,
        content_hash: &str,
        indexer: IndexerMode,
        table: &BoundaryTable,
    ) -> Result<()> {
        self.ensure_dir()?;
        let entry = self.entry_path(path);
        let bytes = {
            let envelope = CacheEnvelope {
                created_ms: unix_ms_now(),
                path: path.to_string(),
                content_hash: content_hash.to_string(),
                indexer,
                data: table,
            };
            serde_json::to_vec(&envelope).map_err(ReaderError::cache)?
        };

        let tmp = entry.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &entry)?;
        Ok(())
    }

    /// Drop the entry for `path`, if any
    pub fn invalidate(&self, path: &str) {
        self.remove_entry(&self.entry_path(path));
    }

    fn remove_entry(&self, entry: &Path) {
        if let Err(err) = std::fs::remove_file(entry) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove cache entry {}: {err}", entry.display());
            }
        }
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeclarationBoundary, DeclarationKind, ScanDiagnostics};
    use pretty_assertions::assert_eq;

    fn table() -> BoundaryTable {
        BoundaryTable::new(
            vec![DeclarationBoundary {
                kind: DeclarationKind::Class,
                name: Some("AuthService".to_string()),
                start_line: 3,
                end_line: 40,
                depth: 0,
                terminated: true,
            }],
            ScanDiagnostics::default(),
        )
    }

    #[test]
    fn stores_and_loads_matching_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BoundaryCache::new(dir.path().join("boundaries"));

        assert_eq!(cache.load("src/auth.ts", "abc", IndexerMode::Auto), None);
        cache
            .store("src/auth.ts", "abc", IndexerMode::Auto, &table())
            .unwrap();
        assert_eq!(
            cache.load("src/auth.ts", "abc", IndexerMode::Auto),
            Some(table())
        );
        assert!(!cache.entry_path("src/auth.ts").with_extension("json.tmp").exists());
    }

    #[test]
    fn hash_mismatch_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BoundaryCache::new(dir.path());
        cache
            .store("src/auth.ts", "abc", IndexerMode::Auto, &table())
            .unwrap();

        assert_eq!(cache.load("src/auth.ts", "def", IndexerMode::Auto), None);
        assert!(!cache.entry_path("src/auth.ts").exists());
    }

    #[test]
    fn indexer_mode_is_part_of_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BoundaryCache::new(dir.path());
        cache
            .store("a.py", "abc", IndexerMode::Heuristic, &table())
            .unwrap();
        assert_eq!(cache.load("a.py", "abc", IndexerMode::Syntax), None);
    }

    #[test]
    fn corrupted_entry_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BoundaryCache::new(dir.path());
        std::fs::write(cache.entry_path("a.go"), b"{ not json").unwrap();
        assert_eq!(cache.load("a.go", "abc", IndexerMode::Auto), None);
        assert!(!cache.entry_path("a.go").exists());
    }

    #[test]
    fn entries_are_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BoundaryCache::new(dir.path());
        assert_ne!(cache.entry_path("a.ts"), cache.entry_path("b.ts"));

        cache.store("a.ts", "abc", IndexerMode::Auto, &table()).unwrap();
        cache.invalidate("a.ts");
        assert_eq!(cache.load("a.ts", "abc", IndexerMode::Auto), None);
    }
}
