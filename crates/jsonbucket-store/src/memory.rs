use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::address::{FolderAddress, StorageAddress};
use crate::error::{BackendError, BackendResult};
use crate::traits::{ObjectBody, StorageBackend};
use crate::types::{
    ListOptions, ListingResult, ObjectSummary, Owner, PutObjectRequest, PutReceipt,
    ServerSideEncryption, TagSet,
};

/// Page size used when a listing does not set `max_keys`.
const DEFAULT_MAX_KEYS: i32 = 1000;

const OWNER_ID: &str = "in-memory";

/// The backend operations, as recorded by [`InMemoryBackend::requests`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GetObject,
    PutObject,
    PutObjectTagging,
    GetObjectTagging,
    ListObjects,
}

#[derive(Clone, Debug)]
struct StoredEntry {
    body: Bytes,
    tags: TagSet,
    e_tag: String,
    last_modified: DateTime<Utc>,
    encryption: Option<ServerSideEncryption>,
}

impl StoredEntry {
    fn new(body: Bytes, encryption: Option<ServerSideEncryption>) -> Self {
        let digest = blake3::hash(&body);
        Self {
            e_tag: format!("\"{}\"", hex::encode(&digest.as_bytes()[..16])),
            body,
            tags: TagSet::new(),
            last_modified: Utc::now(),
            encryption,
        }
    }
}

/// In-memory object-storage backend.
///
/// Intended for tests and embedding. Objects live in a `BTreeMap` keyed by
/// (bucket, key) behind a `RwLock`, so listings come out in key order the way
/// the service returns them. Every bucket implicitly exists.
///
/// Besides storage, the backend records the operations it served and can be
/// told to fail the next call of a given operation.
pub struct InMemoryBackend {
    objects: RwLock<BTreeMap<(String, String), StoredEntry>>,
    requests: Mutex<Vec<BackendOp>>,
    faults: Mutex<HashMap<BackendOp, BackendError>>,
    chunk_size: Option<usize>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
            chunk_size: None,
        }
    }

    /// Deliver object bodies in chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    /// Store raw bytes without going through `put_object`.
    ///
    /// Not recorded as a request.
    pub fn put_raw(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        let entry = StoredEntry::new(body.into(), None);
        self.objects
            .write()
            .expect("lock poisoned")
            .insert((bucket.to_string(), key.to_string()), entry);
    }

    /// Raw bytes stored at an address, if any.
    pub fn raw(&self, address: &StorageAddress) -> Option<Bytes> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&map_key(address))
            .map(|e| e.body.clone())
    }

    /// Encryption recorded for the object at an address.
    pub fn encryption(&self, address: &StorageAddress) -> Option<ServerSideEncryption> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&map_key(address))
            .and_then(|e| e.encryption)
    }

    /// Fail the next call of `op` with `error`. The fault is consumed by
    /// that call; later calls succeed again.
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        self.faults.lock().expect("lock poisoned").insert(op, error);
    }

    /// Operations served so far, in order, including failed ones.
    pub fn requests(&self) -> Vec<BackendOp> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().expect("lock poisoned").clear();
    }

    /// Number of objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    fn begin(&self, op: BackendOp) -> BackendResult<()> {
        self.requests.lock().expect("lock poisoned").push(op);
        match self.faults.lock().expect("lock poisoned").remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn chunk(&self, body: &Bytes) -> Vec<Bytes> {
        match self.chunk_size {
            Some(size) if body.len() > size => (0..body.len())
                .step_by(size)
                .map(|start| body.slice(start..(start + size).min(body.len())))
                .collect(),
            _ => vec![body.clone()],
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("object_count", &self.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

fn map_key(address: &StorageAddress) -> (String, String) {
    (address.bucket().to_string(), address.key().to_string())
}

fn not_found(address: &StorageAddress) -> BackendError {
    BackendError::NotFound {
        bucket: address.bucket().to_string(),
        key: address.key().to_string(),
    }
}

/// Position a listing resumes after: the continuation token wins over
/// `start_after`.
fn resume_marker(options: &ListOptions) -> Option<&str> {
    options
        .continuation_token
        .as_deref()
        .or(options.start_after.as_deref())
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get_object(&self, address: &StorageAddress) -> BackendResult<ObjectBody> {
        self.begin(BackendOp::GetObject)?;
        let (body, e_tag) = {
            let map = self.objects.read().expect("lock poisoned");
            let entry = map.get(&map_key(address)).ok_or_else(|| not_found(address))?;
            (entry.body.clone(), entry.e_tag.clone())
        };
        Ok(ObjectBody::from_chunks(self.chunk(&body)).with_e_tag(e_tag))
    }

    async fn put_object(&self, request: PutObjectRequest) -> BackendResult<PutReceipt> {
        self.begin(BackendOp::PutObject)?;
        // A fresh write replaces the object, tags included.
        let entry = StoredEntry::new(request.body, Some(request.encryption));
        let receipt = PutReceipt {
            e_tag: Some(entry.e_tag.clone()),
            version_id: None,
            server_side_encryption: Some(request.encryption.as_str().to_string()),
        };
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(map_key(&request.address), entry);
        Ok(receipt)
    }

    async fn put_object_tagging(&self, address: &StorageAddress, tags: &TagSet) -> BackendResult<()> {
        self.begin(BackendOp::PutObjectTagging)?;
        let mut map = self.objects.write().expect("lock poisoned");
        let entry = map.get_mut(&map_key(address)).ok_or_else(|| not_found(address))?;
        entry.tags = tags.clone();
        Ok(())
    }

    async fn get_object_tagging(&self, address: &StorageAddress) -> BackendResult<TagSet> {
        self.begin(BackendOp::GetObjectTagging)?;
        let map = self.objects.read().expect("lock poisoned");
        map.get(&map_key(address))
            .map(|e| e.tags.clone())
            .ok_or_else(|| not_found(address))
    }

    async fn list_objects(
        &self,
        folder: &FolderAddress,
        options: &ListOptions,
    ) -> BackendResult<ListingResult> {
        self.begin(BackendOp::ListObjects)?;
        let max_keys = options.max_keys.unwrap_or(DEFAULT_MAX_KEYS);
        if max_keys < 0 {
            return Err(BackendError::InvalidRequest(format!(
                "max_keys must not be negative, got {max_keys}"
            )));
        }
        let limit = max_keys as usize;
        let marker = resume_marker(options);
        let delimiter = options.delimiter.as_deref().filter(|d| !d.is_empty());
        let with_owner = options.fetch_owner.unwrap_or(false);

        let map = self.objects.read().expect("lock poisoned");
        let candidates = map
            .iter()
            .filter(|((bucket, key), _)| bucket == folder.bucket() && folder.contains(key))
            .filter(|((_, key), _)| match marker {
                None => true,
                // Keys rolled up into an already-returned common prefix are
                // skipped along with everything sorting before the marker.
                Some(m) => {
                    key.as_str() > m
                        && !(delimiter.is_some_and(|d| m.ends_with(d)) && key.starts_with(m))
                }
            });

        let mut contents = Vec::new();
        let mut common_prefixes: BTreeSet<String> = BTreeSet::new();
        let mut last_returned: Option<String> = None;
        let mut is_truncated = false;

        for ((_, key), entry) in candidates {
            let rollup = delimiter.and_then(|d| {
                key[folder.prefix().len()..]
                    .find(d)
                    .map(|idx| key[..folder.prefix().len() + idx + d.len()].to_string())
            });
            if let Some(common) = &rollup {
                if common_prefixes.contains(common) {
                    continue;
                }
            }
            if contents.len() + common_prefixes.len() >= limit {
                is_truncated = limit > 0;
                break;
            }
            match rollup {
                Some(common) => {
                    last_returned = Some(common.clone());
                    common_prefixes.insert(common);
                }
                None => {
                    last_returned = Some(key.clone());
                    contents.push(ObjectSummary {
                        key: key.clone(),
                        last_modified: Some(entry.last_modified),
                        e_tag: Some(entry.e_tag.clone()),
                        size: Some(entry.body.len() as u64),
                        storage_class: Some("STANDARD".to_string()),
                        owner: with_owner.then(|| Owner {
                            display_name: Some(OWNER_ID.to_string()),
                            id: Some(OWNER_ID.to_string()),
                        }),
                    });
                }
            }
        }

        let key_count = (contents.len() + common_prefixes.len()) as i32;
        Ok(ListingResult {
            name: Some(folder.bucket().to_string()),
            prefix: Some(folder.prefix().to_string()),
            delimiter: options.delimiter.clone(),
            max_keys: Some(max_keys),
            key_count: Some(key_count),
            is_truncated,
            continuation_token: options.continuation_token.clone(),
            next_continuation_token: if is_truncated { last_returned } else { None },
            start_after: options.start_after.clone(),
            contents,
            common_prefixes: common_prefixes.into_iter().collect(),
        })
    }
}
