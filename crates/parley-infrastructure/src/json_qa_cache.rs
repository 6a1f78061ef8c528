//! JSON-file backed Q&A cache.
//!
//! Every operation runs the same sequence under one process-wide lock:
//! take the file lock, load the whole store (re-initializing it when missing
//! or corrupt), optionally mutate, and write it back atomically. File I/O
//! runs on the blocking pool.

use crate::storage::{AtomicJsonError, AtomicJsonFile};
use async_trait::async_trait;
use chrono::Utc;
use parley_core::cache::{CacheStats, LoadOutcome, QaStore, ResponseCache, StoreError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

impl From<AtomicJsonError> for StoreError {
    fn from(err: AtomicJsonError) -> Self {
        match err {
            AtomicJsonError::IoError(e) => StoreError::Io(e),
            AtomicJsonError::SerializeError(e) => StoreError::Serialization(e),
            AtomicJsonError::LockError(msg) => StoreError::Lock(msg),
            AtomicJsonError::ParseError(msg) => {
                StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
            }
        }
    }
}

/// The durable Q&A cache.
///
/// Cloning shares the underlying file and lock.
#[derive(Clone)]
pub struct JsonQaCache {
    file: Arc<AtomicJsonFile<QaStore>>,
    lock: Arc<Mutex<()>>,
}

impl JsonQaCache {
    /// Creates a handle without touching the file system.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a handle and makes sure a well-formed store exists on disk.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let cache = Self::with_path(path);
        let outcome = cache.load().await?;
        if outcome.is_reinitialized() {
            tracing::info!(path = %cache.path().display(), "Initialized Q&A store");
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the store, persisting a fresh one if it was missing or corrupt.
    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        self.with_file(|file| {
            let _file_lock = file.acquire_lock()?;
            read_store(file, true)
        })
        .await
    }

    /// Runs `op` on the blocking pool while holding the process-wide lock.
    async fn with_file<F, R>(&self, op: F) -> Result<R, StoreError>
    where
        F: FnOnce(&AtomicJsonFile<QaStore>) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || op(&file))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Reads the store, replacing it with an empty one when unusable.
///
/// With `persist_reset` the replacement is written to disk immediately;
/// callers that are about to write anyway skip that.
fn read_store(file: &AtomicJsonFile<QaStore>, persist_reset: bool) -> Result<LoadOutcome, StoreError> {
    let reason = match file.load() {
        Ok(Some(store)) => match store.validate() {
            Ok(()) => return Ok(LoadOutcome::Loaded(store)),
            Err(reason) => reason,
        },
        Ok(None) => "store file missing or empty".to_string(),
        Err(e) if e.is_corruption() => e.to_string(),
        Err(e) => return Err(e.into()),
    };

    let store = QaStore::empty(Utc::now());
    if file.path().exists() {
        tracing::warn!(path = %file.path().display(), %reason, "Q&A store unusable, re-initializing");
    } else {
        tracing::debug!(path = %file.path().display(), "Q&A store absent, creating");
    }
    if persist_reset {
        file.save(&store)?;
    }
    Ok(LoadOutcome::Reinitialized(store))
}

#[async_trait]
impl ResponseCache for JsonQaCache {
    async fn save(&self, question: &str, answer: &str) -> Result<(), StoreError> {
        let question = question.to_string();
        let answer = answer.to_string();
        let preview: String = question.chars().take(50).collect();

        let key = self
            .with_file(move |file| {
                let _file_lock = file.acquire_lock()?;
                let mut store = read_store(file, false)?.into_store();
                let key = store.upsert(&question, &answer, Utc::now());
                file.save(&store)?;
                Ok(key)
            })
            .await?;

        tracing::info!(question = %preview, key = %key, "Saved Q&A pair");
        Ok(())
    }

    async fn lookup(&self, question: &str) -> Result<Option<String>, StoreError> {
        let question = question.to_string();
        self.with_file(move |file| {
            let _file_lock = file.acquire_lock()?;
            let store = read_store(file, true)?.into_store();
            Ok(store.lookup(&question).map(|record| record.answer.clone()))
        })
        .await
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        self.with_file(|file| {
            let _file_lock = file.acquire_lock()?;
            let store = read_store(file, true)?.into_store();
            Ok(CacheStats {
                total_pairs: store.len(),
                file_size: file.file_size()?,
                created_at: store.metadata.created_at,
                last_updated_at: store.metadata.last_updated_at,
            })
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.with_file(|file| {
            let _file_lock = file.acquire_lock()?;
            file.save(&QaStore::empty(Utc::now()))?;
            Ok(())
        })
        .await?;

        tracing::info!(path = %self.path().display(), "Cleared all cached data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> JsonQaCache {
        JsonQaCache::with_path(dir.path().join("data.json"))
    }

    #[tokio::test]
    async fn test_open_creates_well_formed_store() {
        let dir = TempDir::new().unwrap();
        let cache = JsonQaCache::open(dir.path().join("nested").join("data.json"))
            .await
            .unwrap();

        let raw = fs::read_to_string(cache.path()).unwrap();
        let store: QaStore = serde_json::from_str(&raw).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.metadata.total_pairs, 0);
    }

    #[tokio::test]
    async fn test_save_is_durable() {
        let dir = TempDir::new().unwrap();
        cache_in(&dir).save("  What is   Rust? ", "A systems language.").await.unwrap();

        // Fresh handle, fresh load
        let outcome = cache_in(&dir).load().await.unwrap();
        assert!(!outcome.is_reinitialized());
        let record = &outcome.store().records["what is rust"];
        assert_eq!(record.answer, "A systems language.");
        assert_eq!(record.question, "  What is   Rust? ");
        assert_eq!(record.usage_count, 1);
    }

    #[tokio::test]
    async fn test_resave_overwrites_normalized_key() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.save("What is 2+2?", "4").await.unwrap();
        cache.save("what is 2+2?", "five").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_pairs, 1);
        assert!(stats.last_updated_at.is_some());
        let store = cache.load().await.unwrap().into_store();
        assert_eq!(store.records["what is 2+2"].answer, "five");
        assert_eq!(store.metadata.total_pairs, 1);
    }

    #[tokio::test]
    async fn test_lookup_uses_similarity() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save("How do I bake bread?", "Flour, water, salt, yeast.").await.unwrap();

        assert_eq!(
            cache.lookup("how do i bake bread").await.unwrap().as_deref(),
            Some("Flour, water, salt, yeast.")
        );
        assert_eq!(cache.lookup("how do i bake breads!").await.unwrap().as_deref(), Some("Flour, water, salt, yeast."));
        assert!(cache.lookup("what time is it").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reinitialized() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::write(cache.path(), "{\"metadata\": 12").unwrap();

        let outcome = cache.load().await.unwrap();
        assert!(outcome.is_reinitialized());
        assert!(outcome.store().is_empty());

        // The reset store was persisted and is usable
        let raw = fs::read_to_string(cache.path()).unwrap();
        assert!(serde_json::from_str::<QaStore>(&raw).is_ok());
        cache.save("q", "a").await.unwrap();
        assert_eq!(cache.stats().await.unwrap().total_pairs, 1);
    }

    #[tokio::test]
    async fn test_missing_top_level_field_is_reinitialized() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::write(
            cache.path(),
            r#"{"metadata": {"created_at": "2024-01-01T00:00:00Z", "version": "1.0", "total_pairs": 3}}"#,
        )
        .unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_pairs, 0);
    }

    #[tokio::test]
    async fn test_clear_resets_store() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save("one", "1").await.unwrap();
        cache.save("two", "2").await.unwrap();

        cache.clear().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_pairs, 0);
        assert!(stats.last_updated_at.is_none());
        assert!(stats.file_size > 0);
    }

    #[tokio::test]
    async fn test_stale_temp_file_does_not_affect_store() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save("kept", "intact").await.unwrap();

        // A crash between temp write and rename leaves a partial temp file
        fs::write(dir.path().join(".data.json.tmp"), "{\"metadata\": {\"crea").unwrap();

        let outcome = cache.load().await.unwrap();
        assert!(!outcome.is_reinitialized());
        assert_eq!(outcome.store().records["kept"].answer, "intact");

        cache.save("next", "write").await.unwrap();
        assert_eq!(cache.stats().await.unwrap().total_pairs, 2);
    }
}
