use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use futures::stream::{self, BoxStream};

use crate::accumulate::{Chunk, ChunkStream, StreamEvent};
use crate::{Error, FileSystemEntry, LakeService, OperationId, PathEntry, Result};

const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// One file's content. Appends stage bytes; a flush commits a prefix of the
/// staged bytes, and reads observe only the committed prefix.
#[derive(Default)]
struct FileState {
    staged: Vec<u8>,
    committed: usize,
}

type FileSystem = BTreeMap<String, FileState>;

/// A simple in-memory `LakeService`.
///
/// Stands in for the remote collaborator in tests, demos, and local
/// development. Semantics follow the remote API shape: file systems are
/// created explicitly, appends must be contiguous, and content becomes
/// readable only after a flush.
#[derive(Clone)]
pub struct MemoryLake {
    inner: Arc<RwLock<BTreeMap<String, FileSystem>>>,
    op_counter: Arc<AtomicU64>,
    read_chunk_size: usize,
}

impl MemoryLake {
    /// Create a new empty in-memory lake.
    pub fn new() -> Self {
        Self::with_read_chunk_size(DEFAULT_READ_CHUNK_SIZE)
    }

    /// Create a lake whose `read_file` streams emit chunks of at most
    /// `read_chunk_size` bytes. Useful for exercising multi-chunk reads with
    /// small payloads.
    pub fn with_read_chunk_size(read_chunk_size: usize) -> Self {
        assert!(read_chunk_size > 0, "read chunk size must be non-zero");
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            op_counter: Arc::new(AtomicU64::new(0)),
            read_chunk_size,
        }
    }

    /// Number of file systems.
    pub fn file_system_count(&self) -> usize {
        self.inner.read().expect("poisoned lock").len()
    }

    /// Returns true if there are no file systems.
    pub fn is_empty(&self) -> bool {
        self.file_system_count() == 0
    }

    /// Drop all file systems.
    pub fn clear(&self) {
        self.inner.write().expect("poisoned lock").clear();
    }

    /// Get a copy of a file's committed bytes (useful for tests).
    pub fn committed_bytes(&self, file_system: &str, path: &str) -> Result<Vec<u8>> {
        let map = self.inner.read().expect("poisoned lock");
        let fs = map
            .get(file_system)
            .ok_or_else(|| Error::NotFound(file_system.to_string()))?;
        let file = fs
            .get(path)
            .ok_or_else(|| Error::NotFound(format!("{file_system}/{path}")))?;
        Ok(file.staged[..file.committed].to_vec())
    }

    fn next_op_id(&self) -> OperationId {
        let n = self.op_counter.fetch_add(1, Ordering::Relaxed);
        OperationId(format!("op-{n:08}"))
    }
}

impl Default for MemoryLake {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryLake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid dumping potentially large in-memory contents.
        f.debug_struct("MemoryLake")
            .field("file_systems", &self.file_system_count())
            .finish()
    }
}

impl LakeService for MemoryLake {
    async fn list_file_systems(&self) -> Result<BoxStream<'_, Result<FileSystemEntry>>> {
        let map = self.inner.read().expect("poisoned lock");
        let names: Vec<String> = map.keys().cloned().collect();

        Ok(Box::pin(stream::iter(
            names.into_iter().map(|name| Ok(FileSystemEntry { name })),
        )))
    }

    async fn create_file_system(&self, name: &str) -> Result<OperationId> {
        let mut map = self.inner.write().expect("poisoned lock");
        if map.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        map.insert(name.to_string(), FileSystem::new());

        tracing::debug!(name, "created file system");
        Ok(self.next_op_id())
    }

    async fn delete_file_system(&self, name: &str) -> Result<()> {
        let mut map = self.inner.write().expect("poisoned lock");
        if map.remove(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }

        tracing::debug!(name, "deleted file system");
        Ok(())
    }

    async fn create_file(&self, file_system: &str, path: &str) -> Result<()> {
        let mut map = self.inner.write().expect("poisoned lock");
        let fs = map
            .get_mut(file_system)
            .ok_or_else(|| Error::NotFound(file_system.to_string()))?;

        fs.insert(path.to_string(), FileState::default());
        Ok(())
    }

    async fn append(&self, file_system: &str, path: &str, offset: u64, data: &[u8]) -> Result<()> {
        let mut map = self.inner.write().expect("poisoned lock");
        let fs = map
            .get_mut(file_system)
            .ok_or_else(|| Error::NotFound(file_system.to_string()))?;
        let file = fs
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(format!("{file_system}/{path}")))?;

        if offset != file.staged.len() as u64 {
            return Err(Error::Generic(format!(
                "append offset {offset} does not match staged length {}",
                file.staged.len()
            )));
        }

        file.staged.extend_from_slice(data);
        Ok(())
    }

    async fn flush(&self, file_system: &str, path: &str, len: u64) -> Result<OperationId> {
        let mut map = self.inner.write().expect("poisoned lock");
        let fs = map
            .get_mut(file_system)
            .ok_or_else(|| Error::NotFound(file_system.to_string()))?;
        let file = fs
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(format!("{file_system}/{path}")))?;

        if len > file.staged.len() as u64 {
            return Err(Error::Generic(format!(
                "flush length {len} exceeds staged length {}",
                file.staged.len()
            )));
        }

        file.committed = len as usize;
        Ok(self.next_op_id())
    }

    async fn list_paths(&self, file_system: &str) -> Result<BoxStream<'_, Result<PathEntry>>> {
        let map = self.inner.read().expect("poisoned lock");
        let fs = map
            .get(file_system)
            .ok_or_else(|| Error::NotFound(file_system.to_string()))?;

        // Directories are not stored; they are implied by '/' separators in
        // file paths, as in flat-namespace listings.
        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        for path in fs.keys() {
            for (idx, ch) in path.char_indices() {
                if ch == '/' && idx > 0 {
                    entries.insert(path[..idx].to_string(), true);
                }
            }
            entries.insert(path.clone(), false);
        }

        Ok(Box::pin(stream::iter(entries.into_iter().map(
            |(name, is_directory)| Ok(PathEntry { name, is_directory }),
        ))))
    }

    async fn read_file(&self, file_system: &str, path: &str) -> Result<ChunkStream> {
        let committed = {
            let map = self.inner.read().expect("poisoned lock");
            let fs = map
                .get(file_system)
                .ok_or_else(|| Error::NotFound(file_system.to_string()))?;
            let file = fs
                .get(path)
                .ok_or_else(|| Error::NotFound(format!("{file_system}/{path}")))?;
            Bytes::copy_from_slice(&file.staged[..file.committed])
        };

        let mut events = Vec::new();
        let mut rest = committed;
        while !rest.is_empty() {
            let take = rest.len().min(self.read_chunk_size);
            events.push(StreamEvent::Data(Chunk::Binary(rest.split_to(take))));
        }
        events.push(StreamEvent::End);

        Ok(Box::pin(stream::iter(events)))
    }
}
