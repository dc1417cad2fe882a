//! Prefix listing over a bucket "folder".

use std::sync::Arc;

use tracing::debug;

use crate::address::FolderAddress;
use crate::error::StoreResult;
use crate::traits::StorageBackend;
use crate::types::{ListOptions, ListingResult};

/// Lists object metadata under a fixed bucket and key prefix.
#[derive(Clone)]
pub struct ObjectStoreFolder {
    backend: Arc<dyn StorageBackend>,
    folder: FolderAddress,
}

impl ObjectStoreFolder {
    /// Bind to `bucket` and the key prefix `folder`.
    ///
    /// The bucket must be non-empty; an empty prefix lists the whole bucket.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        bucket: impl Into<String>,
        folder: impl Into<String>,
    ) -> StoreResult<Self> {
        Ok(Self::at(backend, FolderAddress::new(bucket, folder)?))
    }

    pub fn at(backend: Arc<dyn StorageBackend>, folder: FolderAddress) -> Self {
        Self { backend, folder }
    }

    pub fn folder(&self) -> &FolderAddress {
        &self.folder
    }

    /// List one page of objects under the folder.
    ///
    /// `options` are passed through as given. The result is returned exactly
    /// as the backend produced it: no paging, no filtering. Every failure,
    /// including a missing bucket, is returned unchanged.
    pub async fn list_contents(&self, options: &ListOptions) -> StoreResult<ListingResult> {
        debug!(
            bucket = self.folder.bucket(),
            prefix = self.folder.prefix(),
            max_keys = ?options.max_keys,
            "listing folder"
        );
        let listing = self.backend.list_objects(&self.folder, options).await?;
        debug!(
            count = listing.contents.len(),
            truncated = listing.is_truncated,
            "folder listed"
        );
        Ok(listing)
    }
}

impl std::fmt::Debug for ObjectStoreFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreFolder")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}
