//! Blob storage seam for resource payloads.
//!
//! [`BlobStore`] is the backend contract; [`MemoryStore`] is a process-local
//! implementation with an optional capacity and a read-only switch, used by
//! tests and the demo binary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// A lazily produced sequence of payload chunks.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, CoreError>>;

/// Default chunk size for streams produced by [`MemoryStore`] (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Location scheme for blobs held by [`MemoryStore`].
const MEMORY_SCHEME: &str = "memory://";

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Backend-specific location. Sensitive: never published.
    pub location: String,
    /// Number of bytes written.
    pub size: u64,
    /// SHA-256 hex digest of the written bytes.
    pub checksum: String,
}

/// Backend that stores resource payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Consume `data` and store it under `id`.
    ///
    /// Fails with [`CoreError::SizeMismatch`] when `expected_size` is given
    /// and differs from the number of bytes received.
    async fn put(
        &self,
        id: &str,
        data: ByteStream,
        expected_size: Option<u64>,
    ) -> Result<StoredBlob, CoreError>;

    /// Stream the blob stored at `location`.
    async fn get(&self, location: &str) -> Result<ByteStream, CoreError>;

    /// Remove the blob stored at `location`.
    async fn delete(&self, location: &str) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process blob store.
#[derive(Debug)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    capacity: Option<u64>,
    read_only: bool,
    chunk_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            capacity: None,
            read_only: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Limit the total number of bytes held. Writes that would exceed it
    /// fail with [`CoreError::StorageFull`].
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Reject every write with [`CoreError::StorageWriteDenied`].
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Size of the chunks yielded by [`BlobStore::get`].
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Total bytes currently stored.
    pub fn used(&self) -> Result<u64, CoreError> {
        let blobs = self.lock()?;
        Ok(blobs.values().map(|b| b.len() as u64).sum())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, CoreError> {
        self.blobs
            .lock()
            .map_err(|_| CoreError::Internal("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(
        &self,
        id: &str,
        mut data: ByteStream,
        expected_size: Option<u64>,
    ) -> Result<StoredBlob, CoreError> {
        if self.read_only {
            return Err(CoreError::StorageWriteDenied(format!(
                "memory store is read-only, cannot write {id}"
            )));
        }

        let used = self.used()?;
        let mut hasher = Sha256::new();
        let mut buf = Vec::new();

        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            if let Some(capacity) = self.capacity {
                if used + (buf.len() + chunk.len()) as u64 > capacity {
                    return Err(CoreError::StorageFull(format!(
                        "writing {id} would exceed the {capacity} byte capacity"
                    )));
                }
            }
            hasher.update(&chunk);
            buf.extend_from_slice(&chunk);
        }

        let size = buf.len() as u64;
        if let Some(expected) = expected_size {
            if expected != size {
                return Err(CoreError::SizeMismatch {
                    expected,
                    actual: size,
                });
            }
        }

        let location = format!("{MEMORY_SCHEME}{id}");
        self.lock()?.insert(location.clone(), buf);
        tracing::debug!(id, size, "Blob stored in memory");

        Ok(StoredBlob {
            location,
            size,
            checksum: format!("{:x}", hasher.finalize()),
        })
    }

    async fn get(&self, location: &str) -> Result<ByteStream, CoreError> {
        let bytes = self
            .lock()?
            .get(location)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "blob",
                id: location.to_string(),
            })?;

        let chunks: Vec<Result<Vec<u8>, CoreError>> = bytes
            .chunks(self.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn delete(&self, location: &str) -> Result<(), CoreError> {
        self.lock()?
            .remove(location)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound {
                entity: "blob",
                id: location.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn chunks(parts: &[&str]) -> ByteStream {
        let items: Vec<Result<Vec<u8>, CoreError>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn put_then_get_round_trips_in_chunks() {
        let store = MemoryStore::new().with_chunk_size(4);
        let blob = store.put("img", chunks(&["abcd", "efgh", "ij"]), Some(10)).await.unwrap();
        assert_eq!(blob.location, "memory://img");
        assert_eq!(blob.size, 10);
        assert_eq!(blob.checksum.len(), 64);

        let data: Vec<Vec<u8>> = store
            .get(&blob.location)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(data, vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]);
    }

    #[tokio::test]
    async fn declared_size_must_match() {
        let store = MemoryStore::new();
        let err = store.put("img", chunks(&["abc"]), Some(4)).await.unwrap_err();
        assert_matches!(err, CoreError::SizeMismatch { expected: 4, actual: 3 });
        assert_eq!(store.used().unwrap(), 0);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let store = MemoryStore::new().with_capacity(5);
        let err = store.put("img", chunks(&["abc", "def"]), None).await.unwrap_err();
        assert_matches!(err, CoreError::StorageFull(_));
    }

    #[tokio::test]
    async fn read_only_store_denies_writes() {
        let store = MemoryStore::new().read_only();
        let err = store.put("img", chunks(&["abc"]), None).await.unwrap_err();
        assert_matches!(err, CoreError::StorageWriteDenied(_));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryStore::new();
        assert_matches!(store.get("memory://nope").await.err(), Some(CoreError::NotFound { .. }));
        assert_matches!(store.delete("memory://nope").await, Err(CoreError::NotFound { .. }));
    }
}
