use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

use crate::address::{FolderAddress, StorageAddress};
use crate::error::BackendResult;
use crate::types::{ListOptions, ListingResult, PutObjectRequest, PutReceipt, TagSet};

/// Chunked body of an object as delivered by the backend.
pub type ByteStream = BoxStream<'static, BackendResult<Bytes>>;

/// The body of a fetched object plus the metadata that came with it.
pub struct ObjectBody {
    pub stream: ByteStream,
    pub content_length: Option<u64>,
    pub e_tag: Option<String>,
}

impl ObjectBody {
    /// Wrap an already-chunked body.
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        let content_length = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            stream: stream::iter(chunks.into_iter().map(Ok)).boxed(),
            content_length: Some(content_length),
            e_tag: None,
        }
    }

    /// Wrap a body held entirely in memory as a single chunk.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_chunks(vec![bytes.into()])
    }

    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .field("e_tag", &self.e_tag)
            .finish_non_exhaustive()
    }
}

/// Transport interface to a remote object-storage service.
///
/// Implementations must satisfy these invariants:
/// - One method call is one request. No retries, no fan-out, no paging.
/// - A missing object is reported as `BackendError::NotFound`, never as a
///   generic service error.
/// - Every other failure keeps the service's error code and status where
///   one exists.
/// - Implementations hold no per-address state and are shared across
///   components via `Arc<dyn StorageBackend>`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch the body of an object.
    async fn get_object(&self, address: &StorageAddress) -> BackendResult<ObjectBody>;

    /// Write (or overwrite) an object.
    async fn put_object(&self, request: PutObjectRequest) -> BackendResult<PutReceipt>;

    /// Replace the tag set of an existing object.
    async fn put_object_tagging(&self, address: &StorageAddress, tags: &TagSet) -> BackendResult<()>;

    /// Read the tag set of an existing object.
    async fn get_object_tagging(&self, address: &StorageAddress) -> BackendResult<TagSet>;

    /// List one page of object metadata under a prefix.
    async fn list_objects(
        &self,
        folder: &FolderAddress,
        options: &ListOptions,
    ) -> BackendResult<ListingResult>;
}
