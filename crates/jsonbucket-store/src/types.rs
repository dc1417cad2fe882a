//! Request and response types exchanged with a storage backend.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::StorageAddress;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// A single name/value tag attached to an object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered set of tags with unique names.
///
/// Order follows insertion order of the source mapping. It is preserved on
/// the wire but carries no meaning to the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag. An existing tag with the same name keeps its position
    /// and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|t| t.key == key) {
            Some(existing) => existing.value = value,
            None => self.tags.push(Tag { key, value }),
        }
    }

    /// Look up a tag value by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Compare two tag sets ignoring order.
    pub fn same_tags(&self, other: &TagSet) -> bool {
        self.len() == other.len()
            && self
                .tags
                .iter()
                .all(|t| other.get(&t.key) == Some(t.value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl IntoIterator for TagSet {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Server-side encryption requested on write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerSideEncryption {
    /// Service-managed AES-256 keys (`AES256`).
    Aes256,
}

impl ServerSideEncryption {
    /// Wire value of the encryption directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256 => "AES256",
        }
    }
}

impl std::fmt::Display for ServerSideEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single object write.
#[derive(Clone, Debug)]
pub struct PutObjectRequest {
    pub address: StorageAddress,
    pub body: Bytes,
    pub encryption: ServerSideEncryption,
}

impl PutObjectRequest {
    pub fn new(address: StorageAddress, body: impl Into<Bytes>, encryption: ServerSideEncryption) -> Self {
        Self {
            address,
            body: body.into(),
            encryption,
        }
    }
}

/// Acknowledgement of a completed write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReceipt {
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
    /// Encryption the service reports having applied, as its wire value.
    pub server_side_encryption: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Optional listing parameters passed through to the backend.
///
/// The bucket and prefix are always taken from the folder being listed and
/// cannot be set here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of entries (objects plus common prefixes) to return.
    pub max_keys: Option<i32>,
    /// Return only keys that sort strictly after this key.
    pub start_after: Option<String>,
    /// Group keys sharing a prefix up to this delimiter into common prefixes.
    pub delimiter: Option<String>,
    /// Resume a truncated listing from a previous `next_continuation_token`.
    pub continuation_token: Option<String>,
    /// Include owner metadata for each entry.
    pub fetch_owner: Option<bool>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_keys(mut self, max_keys: i32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn start_after(mut self, key: impl Into<String>) -> Self {
        self.start_after = Some(key.into());
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }

    pub fn fetch_owner(mut self, fetch_owner: bool) -> Self {
        self.fetch_owner = Some(fetch_owner);
        self
    }
}

/// Owner metadata of a listed object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    pub display_name: Option<String>,
    #[serde(rename = "ID")]
    pub id: Option<String>,
}

/// Metadata of one object in a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(rename = "ETag")]
    pub e_tag: Option<String>,
    pub size: Option<u64>,
    pub storage_class: Option<String>,
    pub owner: Option<Owner>,
}

/// One page of a prefix listing, as returned by the service.
///
/// Pagination is left to the caller: when `is_truncated` is set, pass
/// `next_continuation_token` back through [`ListOptions::continuation_token`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListingResult {
    /// Bucket name.
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: Option<i32>,
    pub key_count: Option<i32>,
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
    pub next_continuation_token: Option<String>,
    pub start_after: Option<String>,
    pub contents: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
}

impl ListingResult {
    /// Keys of the listed objects, in listing order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().map(|o| o.key.as_str())
    }
}
