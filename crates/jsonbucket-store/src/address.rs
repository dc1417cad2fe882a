//! Bucket/key and bucket/prefix addresses.

use std::fmt;

use crate::error::{StoreError, StoreResult};

/// The address of a single object: a bucket and a key inside it.
///
/// Both parts are required and non-empty; this is checked on construction,
/// before any request can be made with the address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageAddress {
    bucket: String,
    key: String,
}

impl StorageAddress {
    /// Create an address, rejecting an empty bucket or key.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> StoreResult<Self> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() {
            return Err(StoreError::InvalidArgument("bucket is required".into()));
        }
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key is required".into()));
        }
        Ok(Self { bucket, key })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A bucket plus a key prefix grouping objects into a logical folder.
///
/// The bucket must be non-empty. An empty prefix addresses the whole bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FolderAddress {
    bucket: String,
    prefix: String,
}

impl FolderAddress {
    /// Create a folder address, rejecting an empty bucket.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> StoreResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(StoreError::InvalidArgument("bucket is required".into()));
        }
        Ok(Self {
            bucket,
            prefix: prefix.into(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `true` if `key` falls under this folder.
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

impl fmt::Display for FolderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_address() {
        let addr = StorageAddress::new("my-bucket", "test/content.json").unwrap();
        assert_eq!(addr.bucket(), "my-bucket");
        assert_eq!(addr.key(), "test/content.json");
        assert_eq!(addr.to_string(), "my-bucket/test/content.json");
    }

    #[test]
    fn empty_bucket_rejected() {
        let err = StorageAddress::new("", "key").unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(msg) if msg == "bucket is required"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = StorageAddress::new("bucket", String::new()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(msg) if msg == "key is required"));
    }

    #[test]
    fn folder_allows_empty_prefix() {
        let folder = FolderAddress::new("bucket", "").unwrap();
        assert!(folder.contains("anything/at/all.json"));
    }

    #[test]
    fn folder_rejects_empty_bucket() {
        assert!(matches!(
            FolderAddress::new("", "test/"),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn folder_contains_checks_prefix() {
        let folder = FolderAddress::new("bucket", "test/").unwrap();
        assert!(folder.contains("test/a.json"));
        assert!(!folder.contains("other/test/a.json"));
        assert!(!folder.contains("test"));
    }
}
