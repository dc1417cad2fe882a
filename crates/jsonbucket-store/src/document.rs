//! A single JSON document at a fixed bucket/key.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::address::StorageAddress;
use crate::decode;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::traits::StorageBackend;
use crate::types::{PutObjectRequest, PutReceipt, ServerSideEncryption, TagSet};

/// Reads and writes one JSON document at a fixed [`StorageAddress`].
///
/// The address is validated on construction and never changes. The store
/// holds no other state, so clones share the backend and can be used
/// concurrently.
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn StorageBackend>,
    address: StorageAddress,
}

impl ObjectStore {
    /// Bind a store to `bucket`/`key`.
    ///
    /// Fails with [`StoreError::InvalidArgument`] if either is empty. No
    /// request is made.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> StoreResult<Self> {
        Ok(Self::at(backend, StorageAddress::new(bucket, key)?))
    }

    /// Bind a store to an already-validated address.
    pub fn at(backend: Arc<dyn StorageBackend>, address: StorageAddress) -> Self {
        Self { backend, address }
    }

    pub fn address(&self) -> &StorageAddress {
        &self.address
    }

    /// Read and parse the document.
    ///
    /// Returns `Ok(None)` when no object exists at the address. Any other
    /// failure is logged and returned unchanged; bytes that are not JSON (or
    /// do not fit `T`) fail with [`StoreError::MalformedDocument`].
    pub async fn get<T: DeserializeOwned>(&self) -> StoreResult<Option<T>> {
        match self.fetch().await {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::Backend(BackendError::NotFound { .. })) => {
                debug!(bucket = self.address.bucket(), key = self.address.key(), "document not found");
                Ok(None)
            }
            Err(err) => {
                error!(
                    bucket = self.address.bucket(),
                    key = self.address.key(),
                    error = %err,
                    "failed to read document"
                );
                Err(err)
            }
        }
    }

    /// [`get`](Self::get) without a target type.
    pub async fn get_value(&self) -> StoreResult<Option<Value>> {
        self.get::<Value>().await
    }

    async fn fetch<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let body = self.backend.get_object(&self.address).await?;
        let text = decode::read_to_string(body, &self.address).await?;
        serde_json::from_str(&text).map_err(|e| StoreError::MalformedDocument {
            address: self.address.clone(),
            reason: e.to_string(),
        })
    }

    /// Serialize `data` to JSON and write it, encrypted at rest with AES-256.
    ///
    /// When `tags` is given and non-empty, a tagging request follows once the
    /// write is acknowledged. A tagging failure is returned as-is and leaves
    /// the new body in place, untagged.
    ///
    /// Returns the acknowledgement of the body write.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        data: &T,
        tags: Option<&TagSet>,
    ) -> StoreResult<PutReceipt> {
        let body = serde_json::to_vec(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let size = body.len();
        let request = PutObjectRequest::new(self.address.clone(), body, ServerSideEncryption::Aes256);
        let receipt = self.backend.put_object(request).await?;
        debug!(
            bucket = self.address.bucket(),
            key = self.address.key(),
            size,
            e_tag = receipt.e_tag.as_deref().unwrap_or(""),
            "document written"
        );

        if let Some(tags) = tags.filter(|t| !t.is_empty()) {
            self.backend.put_object_tagging(&self.address, tags).await?;
            debug!(key = self.address.key(), count = tags.len(), "document tagged");
        }

        Ok(receipt)
    }

    /// Read the tags currently attached to the document.
    pub async fn tags(&self) -> StoreResult<TagSet> {
        Ok(self.backend.get_object_tagging(&self.address).await?)
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BackendOp, InMemoryBackend};
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn setup() -> (Arc<InMemoryBackend>, ObjectStore) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = ObjectStore::new(backend.clone(), "my-bucket", "test/content.json").unwrap();
        (backend, store)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn construction_rejects_empty_bucket_or_key() {
        let backend = Arc::new(InMemoryBackend::new());
        assert!(matches!(
            ObjectStore::new(backend.clone(), "", "k"),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            ObjectStore::new(backend.clone(), "b", ""),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(backend.requests().is_empty());
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get_returns_same_document() {
        let (_, store) = setup();
        let content = json!({"foo": "bar", "count": 123});
        store.set(&content, None).await.unwrap();
        assert_eq!(store.get_value().await.unwrap(), Some(content));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (backend, store) = setup();
        assert_eq!(store.get_value().await.unwrap(), None);
        assert_eq!(backend.requests(), vec![BackendOp::GetObject]);
    }

    #[tokio::test]
    async fn typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Credentials {
            access_token: String,
            expires_in: u64,
            scopes: Vec<String>,
        }

        let (_, store) = setup();
        let creds = Credentials {
            access_token: "abc".into(),
            expires_in: 3600,
            scopes: vec!["read".into(), "write".into()],
        };
        store.set(&creds, None).await.unwrap();
        assert_eq!(store.get::<Credentials>().await.unwrap(), Some(creds));
    }

    #[tokio::test]
    async fn scalar_and_array_documents() {
        let (_, store) = setup();
        store.set(&json!([1, "two", null]), None).await.unwrap();
        assert_eq!(store.get_value().await.unwrap(), Some(json!([1, "two", null])));

        store.set("just a string", None).await.unwrap();
        assert_eq!(store.get::<String>().await.unwrap().as_deref(), Some("just a string"));
    }

    #[tokio::test]
    async fn stored_bytes_are_json_text() {
        let (backend, store) = setup();
        store.set(&json!({"foo": "bar"}), None).await.unwrap();
        let raw = backend.raw(store.address()).unwrap();
        assert_eq!(&raw[..], br#"{"foo":"bar"}"#);
    }

    #[tokio::test]
    async fn every_write_requests_aes256() {
        let (backend, store) = setup();
        let receipt = store.set(&json!({}), None).await.unwrap();
        assert_eq!(backend.encryption(store.address()), Some(ServerSideEncryption::Aes256));
        assert_eq!(receipt.server_side_encryption.as_deref(), Some("AES256"));
    }

    #[tokio::test]
    async fn chunked_body_is_reassembled() {
        let backend = Arc::new(InMemoryBackend::new().with_chunk_size(4));
        let store = ObjectStore::new(backend, "b", "doc.json").unwrap();
        let doc = json!({"greeting": "héllo wörld ✓", "n": [1, 2, 3]});
        store.set(&doc, None).await.unwrap();
        assert_eq!(store.get_value().await.unwrap(), Some(doc));
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let (backend, store) = setup();
        backend.put_raw("my-bucket", "test/content.json", r#"{"foo": "ba"#);
        let err = store.get_value().await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedDocument { address, .. } if &address == store.address()));
    }

    #[tokio::test]
    async fn wrong_shape_is_malformed() {
        let (_, store) = setup();
        store.set(&json!({"count": "not a number"}), None).await.unwrap();

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Counter {
            count: u32,
        }
        assert!(matches!(
            store.get::<Counter>().await,
            Err(StoreError::MalformedDocument { .. })
        ));
    }

    #[tokio::test]
    async fn service_error_on_read_propagates_unchanged() {
        let (backend, store) = setup();
        let fault = BackendError::Service {
            code: Some("AccessDenied".into()),
            message: "Access Denied".into(),
            status: Some(403),
        };
        backend.fail_next(BackendOp::GetObject, fault.clone());
        let err = store.get_value().await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(e) if e == fault));
    }

    #[tokio::test]
    async fn not_found_on_write_is_not_softened() {
        let (backend, store) = setup();
        backend.fail_next(
            BackendOp::PutObject,
            BackendError::NotFound {
                bucket: "my-bucket".into(),
                key: "test/content.json".into(),
            },
        );
        assert!(store.set(&json!(1), None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn unserializable_value_fails_before_any_request() {
        let (backend, store) = setup();
        let mut bad: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
        bad.insert(vec![1, 2], 3);
        let err = store.set(&bad, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(backend.requests().is_empty());
    }

    // -----------------------------------------------------------------------
    // Tagging
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn tagged_write_issues_two_sequential_requests() {
        let (backend, store) = setup();
        let tags: TagSet = [("env", "test"), ("count", "1")].into_iter().collect();
        store.set(&json!({"a": 1}), Some(&tags)).await.unwrap();

        assert_eq!(
            backend.requests(),
            vec![BackendOp::PutObject, BackendOp::PutObjectTagging]
        );
        let expected: TagSet = [("count", "1"), ("env", "test")].into_iter().collect();
        assert!(store.tags().await.unwrap().same_tags(&expected));
    }

    #[tokio::test]
    async fn empty_tags_skip_tagging_request() {
        let (backend, store) = setup();
        store.set(&json!({}), Some(&TagSet::new())).await.unwrap();
        assert_eq!(backend.requests(), vec![BackendOp::PutObject]);
    }

    #[tokio::test]
    async fn tagging_failure_leaves_body_written() {
        let (backend, store) = setup();
        let fault = BackendError::Service {
            code: Some("InvalidTag".into()),
            message: "The TagValue you have provided is invalid".into(),
            status: Some(400),
        };
        backend.fail_next(BackendOp::PutObjectTagging, fault.clone());
        let tags: TagSet = [("env", "test")].into_iter().collect();

        let err = store.set(&json!({"kept": true}), Some(&tags)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(e) if e == fault));
        assert_eq!(store.get_value().await.unwrap(), Some(json!({"kept": true})));
        assert!(store.tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_body_write_skips_tagging() {
        let (backend, store) = setup();
        backend.fail_next(BackendOp::PutObject, BackendError::Transport("timeout".into()));
        let tags: TagSet = [("env", "test")].into_iter().collect();
        assert!(store.set(&json!(1), Some(&tags)).await.is_err());
        assert_eq!(backend.requests(), vec![BackendOp::PutObject]);
    }

    #[tokio::test]
    async fn tags_of_missing_document_is_not_found() {
        let (_, store) = setup();
        assert!(store.tags().await.unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stores_share_one_backend_concurrently() {
        let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = ObjectStore::new(backend.clone(), "b", format!("doc-{i}.json")).unwrap();
                tokio::spawn(async move {
                    store.set(&json!({ "i": i }), None).await.unwrap();
                    store.get_value().await.unwrap()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(json!({ "i": i })));
        }
    }

    #[test]
    fn debug_shows_address() {
        let (_, store) = setup();
        let debug = format!("{store:?}");
        assert!(debug.contains("ObjectStore"));
        assert!(debug.contains("test/content.json"));
    }

    // -----------------------------------------------------------------------
    // Round trip over arbitrary JSON
    // -----------------------------------------------------------------------

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map(".*", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn any_json_value_round_trips(value in arb_json()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (_, store) = setup();
            let read_back = rt.block_on(async {
                store.set(&value, None).await.unwrap();
                store.get_value().await.unwrap()
            });
            prop_assert_eq!(read_back, Some(value));
        }
    }
}
