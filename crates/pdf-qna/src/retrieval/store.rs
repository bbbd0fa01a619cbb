//! Owner of the single persisted index
//!
//! Layout under `index_dir`:
//! - `current/`       the live index (`index.bin` + `manifest.json`)
//! - `.staging-<id>/` a replacement being written; renamed onto `current/`
//! - `.backup-<id>/`  the previous `current/` while a swap is in flight
//!
//! The live index is also held in memory. Replacing and clearing take the
//! write lock; queries only hold the read lock long enough to clone the `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use super::index::{VectorIndex, INDEX_FILE};

const CURRENT_DIR: &str = "current";
const STAGING_PREFIX: &str = ".staging-";
const BACKUP_PREFIX: &str = ".backup-";

/// Single-index store with exclusive replace/clear
pub struct IndexStore {
    index_dir: PathBuf,
    current: RwLock<Option<Arc<VectorIndex>>>,
}

impl IndexStore {
    /// Open the store, creating the directory and loading any existing index.
    ///
    /// A persisted index built with a different embedding model or dimension
    /// than `embedding_model`/`dimensions` is not loaded.
    pub async fn open(index_dir: PathBuf, embedding_model: &str, dimensions: usize) -> Result<Self> {
        tokio::fs::create_dir_all(&index_dir).await?;
        Self::recover_interrupted_swap(&index_dir).await;

        let current_dir = index_dir.join(CURRENT_DIR);
        let current = if current_dir.join(INDEX_FILE).exists() {
            let dir = current_dir.clone();
            match tokio::task::spawn_blocking(move || VectorIndex::load(&dir))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
            {
                Ok(index) if is_compatible(&index, embedding_model, dimensions) => {
                    tracing::info!(
                        "Loaded index for '{}' ({} chunks)",
                        index.manifest().source_filename,
                        index.len()
                    );
                    Some(Arc::new(index))
                }
                Ok(index) => {
                    tracing::warn!(
                        "Discarding index for '{}': built with {} ({} dims), configured embedder is {} ({} dims)",
                        index.manifest().source_filename,
                        index.manifest().embedding_model,
                        index.dimensions(),
                        embedding_model,
                        dimensions
                    );
                    None
                }
                Err(e) => {
                    tracing::error!("Ignoring unreadable index at {}: {}", current_dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            index_dir,
            current: RwLock::new(current),
        })
    }

    /// Directory holding the index
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// The live index, or `IndexNotFound` before the first upload / after clear
    pub async fn current(&self) -> Result<Arc<VectorIndex>> {
        self.current
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(Error::IndexNotFound)
    }

    /// Whether an index is loaded
    pub async fn has_index(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Persist `index` and make it the live index, replacing any previous one.
    ///
    /// On failure both the live index and `current/` are left as they were.
    pub async fn replace(&self, index: VectorIndex) -> Result<Arc<VectorIndex>> {
        let index = Arc::new(index);
        let id = Uuid::new_v4();
        let staging = self.index_dir.join(format!("{}{}", STAGING_PREFIX, id));
        let backup = self.index_dir.join(format!("{}{}", BACKUP_PREFIX, id));
        let target = self.index_dir.join(CURRENT_DIR);

        let mut guard = self.current.write().await;

        let to_save = Arc::clone(&index);
        let staging_dir = staging.clone();
        let saved = tokio::task::spawn_blocking(move || to_save.save(&staging_dir))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        if let Err(e) = saved {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        if let Err(e) = swap_into_place(&staging, &target, &backup).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        *guard = Some(Arc::clone(&index));

        tracing::info!(
            "Index replaced: '{}' ({} chunks)",
            index.manifest().source_filename,
            index.len()
        );

        Ok(index)
    }

    /// Drop the live index, then delete the index directory and recreate it empty.
    ///
    /// The in-memory index is gone even when the filesystem step fails.
    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.current.write().await;
        *guard = None;

        tokio::fs::remove_dir_all(&self.index_dir).await.map_err(|e| {
            Error::Clear(format!("failed to remove {}: {}", self.index_dir.display(), e))
        })?;

        tokio::fs::create_dir_all(&self.index_dir).await.map_err(|e| {
            Error::Clear(format!("failed to recreate {}: {}", self.index_dir.display(), e))
        })?;

        tracing::info!("Index cleared");
        Ok(())
    }

    /// Leftovers from a crash during `replace`: staging dirs are dropped, a
    /// backup is restored when `current/` never made it into place
    async fn recover_interrupted_swap(index_dir: &Path) {
        let Ok(mut entries) = tokio::fs::read_dir(index_dir).await else {
            return;
        };

        let current = index_dir.join(CURRENT_DIR);
        let mut has_current = tokio::fs::try_exists(&current).await.unwrap_or(false);

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            if name.starts_with(STAGING_PREFIX) {
                tracing::debug!("Removing stale staging dir {}", path.display());
                let _ = tokio::fs::remove_dir_all(&path).await;
            } else if name.starts_with(BACKUP_PREFIX) {
                if !has_current && tokio::fs::rename(&path, &current).await.is_ok() {
                    tracing::warn!("Restored index from interrupted swap {}", path.display());
                    has_current = true;
                } else {
                    tracing::debug!("Removing stale backup dir {}", path.display());
                    let _ = tokio::fs::remove_dir_all(&path).await;
                }
            }
        }
    }
}

fn is_compatible(index: &VectorIndex, embedding_model: &str, dimensions: usize) -> bool {
    index.manifest().embedding_model == embedding_model && index.dimensions() == dimensions
}

/// Move `staging` onto `target`, parking the old `target` at `backup` until
/// the new one is in place. A failed rename puts the old `target` back.
async fn swap_into_place(staging: &Path, target: &Path, backup: &Path) -> std::io::Result<()> {
    let had_target = tokio::fs::try_exists(target).await?;
    if had_target {
        tokio::fs::rename(target, backup).await?;
    }

    if let Err(e) = tokio::fs::rename(staging, target).await {
        if had_target {
            if let Err(restore) = tokio::fs::rename(backup, target).await {
                tracing::error!(
                    "Failed to restore {} from {}: {}",
                    target.display(),
                    backup.display(),
                    restore
                );
            }
        }
        return Err(e);
    }

    if had_target {
        if let Err(e) = tokio::fs::remove_dir_all(backup).await {
            tracing::warn!("Failed to remove {}: {}", backup.display(), e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, manifest};

    const MODEL: &str = "keyword-bag";
    const DIMS: usize = 2;

    fn index_for(filename: &str, text: &str) -> VectorIndex {
        VectorIndex::build(vec![chunk(text, vec![1.0, 0.5])], manifest(filename)).unwrap()
    }

    fn index_with_chunks(filename: &str, count: usize) -> VectorIndex {
        let chunks = (0..count)
            .map(|i| chunk(&format!("part {}", i), vec![1.0, i as f32]))
            .collect();
        VectorIndex::build(chunks, manifest(filename)).unwrap()
    }

    fn entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    async fn open(index_dir: PathBuf) -> IndexStore {
        IndexStore::open(index_dir, MODEL, DIMS).await.unwrap()
    }

    #[tokio::test]
    async fn test_no_index_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path().join("index")).await;

        assert!(!store.has_index().await);
        assert!(matches!(store.current().await, Err(Error::IndexNotFound)));
        assert!(store.index_dir().is_dir());
    }

    #[tokio::test]
    async fn test_replace_swaps_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path().join("index")).await;

        store.replace(index_for("first.pdf", "first")).await.unwrap();
        store.replace(index_for("second.pdf", "second")).await.unwrap();

        let current = store.current().await.unwrap();
        assert_eq!(current.manifest().source_filename, "second.pdf");
        assert_eq!(entries(store.index_dir()), vec![CURRENT_DIR.to_string()]);
    }

    #[tokio::test]
    async fn test_reopen_loads_persisted_index() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");

        {
            let store = open(index_dir.clone()).await;
            store.replace(index_for("kept.pdf", "kept")).await.unwrap();
        }

        std::fs::create_dir_all(index_dir.join(".staging-leftover")).unwrap();
        std::fs::create_dir_all(index_dir.join(".backup-leftover")).unwrap();

        let store = open(index_dir.clone()).await;
        let current = store.current().await.unwrap();
        assert_eq!(current.manifest().source_filename, "kept.pdf");
        assert_eq!(entries(&index_dir), vec![CURRENT_DIR.to_string()]);
    }

    #[tokio::test]
    async fn test_reopen_restores_backup_without_current() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");

        {
            let store = open(index_dir.clone()).await;
            store.replace(index_for("kept.pdf", "kept")).await.unwrap();
        }

        // Crash between parking the old index and moving the new one in
        std::fs::rename(index_dir.join(CURRENT_DIR), index_dir.join(".backup-interrupted")).unwrap();
        std::fs::create_dir_all(index_dir.join(".staging-interrupted")).unwrap();

        let store = open(index_dir.clone()).await;
        let current = store.current().await.unwrap();
        assert_eq!(current.manifest().source_filename, "kept.pdf");
        assert_eq!(entries(&index_dir), vec![CURRENT_DIR.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_swap_keeps_previous_index_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let store = open(index_dir.clone()).await;
        store.replace(index_for("old.pdf", "old")).await.unwrap();

        let target = index_dir.join(CURRENT_DIR);
        let backup = index_dir.join(".backup-test");
        let missing_staging = index_dir.join(".staging-missing");

        assert!(swap_into_place(&missing_staging, &target, &backup).await.is_err());

        assert!(!backup.exists());
        assert_eq!(
            VectorIndex::load(&target).unwrap().manifest().source_filename,
            "old.pdf"
        );
        assert_eq!(
            store.current().await.unwrap().manifest().source_filename,
            "old.pdf"
        );
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_live_index() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let store = open(index_dir.clone()).await;
        store.replace(index_for("old.pdf", "old")).await.unwrap();

        // Saving into a directory that became a regular file fails
        std::fs::remove_dir_all(&index_dir).unwrap();
        std::fs::write(&index_dir, b"not a directory").unwrap();

        assert!(store.replace(index_for("new.pdf", "new")).await.is_err());
        assert_eq!(
            store.current().await.unwrap().manifest().source_filename,
            "old.pdf"
        );
    }

    #[tokio::test]
    async fn test_reopen_discards_index_from_other_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");

        {
            let store = open(index_dir.clone()).await;
            store.replace(index_for("kept.pdf", "kept")).await.unwrap();
        }

        let other_model = IndexStore::open(index_dir.clone(), "nomic-embed-text", DIMS)
            .await
            .unwrap();
        assert!(matches!(other_model.current().await, Err(Error::IndexNotFound)));

        let other_dims = IndexStore::open(index_dir.clone(), MODEL, 768).await.unwrap();
        assert!(!other_dims.has_index().await);

        assert!(open(index_dir).await.has_index().await);
    }

    #[tokio::test]
    async fn test_clear_behaves_like_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let store = open(index_dir.clone()).await;

        store.replace(index_for("doc.pdf", "text")).await.unwrap();
        store.clear().await.unwrap();

        assert!(matches!(store.current().await, Err(Error::IndexNotFound)));
        assert!(index_dir.is_dir());
        assert_eq!(std::fs::read_dir(&index_dir).unwrap().count(), 0);

        let reopened = open(index_dir).await;
        assert!(!reopened.has_index().await);
    }

    #[tokio::test]
    async fn test_clear_missing_directory_is_clear_error() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let store = open(index_dir.clone()).await;
        store.replace(index_for("doc.pdf", "text")).await.unwrap();

        std::fs::remove_dir_all(&index_dir).unwrap();

        assert!(matches!(store.clear().await, Err(Error::Clear(_))));
        assert!(matches!(store.current().await, Err(Error::IndexNotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replace_query_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let store = Arc::new(open(index_dir.clone()).await);

        let mut handles = Vec::new();

        for writer in 0..6usize {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for round in 0..8usize {
                    let name = format!("doc-{}-{}.pdf", writer, round);
                    let count = 1 + (writer + round) % 5;
                    store.replace(index_with_chunks(&name, count)).await.unwrap();
                }
            }));
        }

        for _ in 0..6 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..200 {
                    match store.current().await {
                        Ok(index) => assert_eq!(index.len(), index.manifest().chunk_count),
                        Err(Error::IndexNotFound) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    store.clear().await.unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let leftovers: Vec<String> = entries(&index_dir)
            .into_iter()
            .filter(|name| name.starts_with(STAGING_PREFIX) || name.starts_with(BACKUP_PREFIX))
            .collect();
        assert!(leftovers.is_empty(), "leftover dirs: {:?}", leftovers);

        // Memory and disk agree after the dust settles
        let live = store.current().await.ok();
        let reopened = open(index_dir).await.current().await.ok();
        assert_eq!(
            live.map(|i| i.manifest().source_filename.clone()),
            reopened.map(|i| i.manifest().source_filename.clone())
        );
    }
}
