//! Directory-backed vector store.
//!
//! [`DirectoryVectorStore`] keeps its collections in memory and persists each
//! one as `<dir>/<collection>.json`. Nothing on disk changes until
//! [`flush`](VectorStore::flush), which rewrites every live collection file
//! whole and removes the files of deleted ones. A rebuild that fails before
//! flushing leaves the previous index in place.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::document::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::inmemory::{Collections, InMemoryVectorStore};
use crate::vectorstore::VectorStore;

const EXTENSION: &str = "json";

#[derive(Serialize, Deserialize)]
struct PersistedCollection {
    collection: String,
    chunks: Vec<Chunk>,
}

/// A vector store persisted to a directory, one JSON file per collection.
///
/// Open it with [`DirectoryVectorStore::open`] and release it with
/// [`close`](DirectoryVectorStore::close), which flushes pending writes.
#[derive(Debug)]
pub struct DirectoryVectorStore {
    dir: PathBuf,
    inner: InMemoryVectorStore,
    /// Deleted collections whose files are removed on the next flush.
    removed: Mutex<HashSet<String>>,
}

impl DirectoryVectorStore {
    /// Open (creating if necessary) the store rooted at `dir` and load every
    /// persisted collection.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut collections: Collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            let persisted: PersistedCollection = serde_json::from_str(&raw)?;
            debug!(
                path = %path.display(),
                chunk_count = persisted.chunks.len(),
                "loaded collection"
            );
            let chunks = persisted.chunks.into_iter().map(|c| (c.id.clone(), c)).collect();
            collections.insert(persisted.collection, chunks);
        }

        info!(dir = %dir.display(), collection_count = collections.len(), "opened vector store");
        Ok(Self {
            dir,
            inner: InMemoryVectorStore::with_collections(collections),
            removed: Mutex::new(HashSet::new()),
        })
    }

    /// Open the store at `dir` only if it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the directory is missing, so
    /// callers can tell "not built yet" apart from other failures.
    pub async fn open_existing(dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !tokio::fs::try_exists(dir).await? {
            return Err(RagError::index_unavailable(
                collection,
                format!("no index at {}; run a build first", dir.display()),
            ));
        }
        Self::open(dir).await
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Flush and release the store.
    pub async fn close(self) -> Result<()> {
        self.flush().await
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.{EXTENSION}"))
    }
}

#[async_trait]
impl VectorStore for DirectoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await?;
        self.removed.lock().await.remove(name);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await?;
        self.removed.lock().await.insert(name.to_string());
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        self.inner.upsert(collection, chunks).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.inner.search(collection, embedding, top_k).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }

    async fn flush(&self) -> Result<()> {
        let mut removed = self.removed.lock().await;
        for collection in removed.drain() {
            let path = self.path_for(&collection);
            if tokio::fs::try_exists(&path).await? {
                tokio::fs::remove_file(&path).await?;
                debug!(path = %path.display(), "removed collection file");
            }
        }

        for (collection, chunks) in self.inner.snapshot().await {
            let mut chunks: Vec<Chunk> = chunks.into_values().collect();
            chunks.sort_by(|a, b| a.id.cmp(&b.id));

            let path = self.path_for(&collection);
            let chunk_count = chunks.len();
            let json = serde_json::to_string(&PersistedCollection { collection, chunks })?;
            tokio::fs::write(&path, json).await?;
            debug!(path = %path.display(), chunk_count, "persisted collection");
        }
        Ok(())
    }
}
