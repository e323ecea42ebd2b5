use std::fmt::Debug;

use futures::stream::BoxStream;

pub use accumulate::{
    Accumulator, Chunk, ChunkStream, Step, StreamEvent, accumulate, accumulate_timeout,
    accumulate_with_cancel,
};
pub use adapters::memory::MemoryLake;
pub use config::{ConnectionString, LakeConfig};

pub mod accumulate;
pub mod config;

/// A specialized Result type for lake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A unified Error type for lake operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Lake service connection error")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("IO Error")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic lake error: {0}")]
    Generic(String),
}

/// Service adapter modules.
pub mod adapters {
    pub mod memory;
}

/// A file system entry returned by [`LakeService::list_file_systems`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSystemEntry {
    pub name: String,
}

/// A path entry returned by [`LakeService::list_paths`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub name: String,
    pub is_directory: bool,
}

/// An opaque identifier returned by mutating service calls, kept for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationId(pub String);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The data-lake service trait.
///
/// Models the consumed surface of a remote file-system/data-lake service:
/// file systems hold files, files are uploaded by staging bytes with
/// [`append`](LakeService::append) and committing them with
/// [`flush`](LakeService::flush), and reads hand back a [`ChunkStream`] to be
/// buffered with [`accumulate`].
///
/// No retry or recovery happens at this layer; every failure propagates to
/// the caller as-is.
pub trait LakeService: Send + Sync + Debug {
    /// List all file systems, lazily. Each call restarts the listing.
    fn list_file_systems(
        &self,
    ) -> impl std::future::Future<Output = Result<BoxStream<'_, Result<FileSystemEntry>>>> + Send;

    /// Create a file system. Fails if it already exists.
    fn create_file_system(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<OperationId>> + Send;

    /// Delete a file system and everything in it.
    fn delete_file_system(&self, name: &str)
    -> impl std::future::Future<Output = Result<()>> + Send;

    /// Create an empty file. Replaces any staged or committed content.
    fn create_file(
        &self,
        file_system: &str,
        path: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Stage `data` at `offset`. Offsets must be contiguous: `offset` equals
    /// the number of bytes staged so far.
    fn append(
        &self,
        file_system: &str,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Commit staged content up to `len` bytes, making it readable.
    fn flush(
        &self,
        file_system: &str,
        path: &str,
        len: u64,
    ) -> impl std::future::Future<Output = Result<OperationId>> + Send;

    /// List paths within a file system, lazily. Directory entries carry
    /// `is_directory = true`.
    fn list_paths(
        &self,
        file_system: &str,
    ) -> impl std::future::Future<Output = Result<BoxStream<'_, Result<PathEntry>>>> + Send;

    /// Read a file's committed content as a chunked event stream.
    fn read_file(
        &self,
        file_system: &str,
        path: &str,
    ) -> impl std::future::Future<Output = Result<ChunkStream>> + Send;
}

/// Convenience methods built on [`LakeService`].
pub trait LakeServiceExt: LakeService {
    /// Upload a byte slice as a file: create, stage in one append, flush.
    ///
    /// Returns the flush operation identifier.
    ///
    /// # Example
    ///
    /// ```rust
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use lakestore::{LakeService, LakeServiceExt, MemoryLake};
    ///
    /// let lake = MemoryLake::new();
    /// lake.create_file_system("logs").await?;
    /// lake.upload_bytes("logs", "app.log", b"hello").await?;
    ///
    /// assert_eq!(lake.download("logs", "app.log").await?.as_ref(), b"hello");
    /// # Ok(())
    /// # }
    /// ```
    fn upload_bytes(
        &self,
        file_system: &str,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<OperationId>> + Send {
        async move {
            self.create_file(file_system, path).await?;
            self.append(file_system, path, 0, data).await?;
            self.flush(file_system, path, data.len() as u64).await
        }
    }

    /// Download a file's committed content fully into memory.
    fn download(
        &self,
        file_system: &str,
        path: &str,
    ) -> impl std::future::Future<Output = Result<bytes::Bytes>> + Send {
        async move {
            let stream = self.read_file(file_system, path).await?;
            accumulate(stream).await
        }
    }

    /// Download a file's committed content as a UTF-8 string.
    fn download_string(
        &self,
        file_system: &str,
        path: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send {
        async move {
            let bytes = self.download(file_system, path).await?;
            String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::Generic(format!("invalid utf-8: {e}")))
        }
    }
}

impl<T: LakeService + ?Sized> LakeServiceExt for T {}
