//! JSON document storage in object-storage buckets.
//!
//! This crate persists and retrieves JSON-serializable values at fixed
//! bucket/key addresses, optionally tagging them on write, and lists object
//! metadata under a key prefix.
//!
//! # Components
//!
//! - [`ObjectStore`] -- one JSON document at a fixed [`StorageAddress`]
//! - [`ObjectStoreFolder`] -- metadata listing under a [`FolderAddress`]
//!
//! # Storage Backends
//!
//! Both components talk to the remote store through the [`StorageBackend`]
//! trait, injected as `Arc<dyn StorageBackend>`:
//!
//! - [`InMemoryBackend`] -- `BTreeMap`-based backend for tests and embedding
//! - `jsonbucket-s3` -- AWS S3 via the AWS SDK for Rust
//!
//! # Design Rules
//!
//! 1. Every public operation issues exactly one backend request, except a
//!    tagged write which issues two, strictly in sequence.
//! 2. A missing object on read is a soft miss (`Ok(None)`), never an error.
//! 3. Every other failure is surfaced unchanged; nothing is retried.
//! 4. Every write requests AES-256 server-side encryption.
//! 5. A tagged write is not atomic: if tagging fails, the body stays written.

pub mod address;
pub mod decode;
pub mod document;
pub mod error;
pub mod folder;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export primary types at crate root for ergonomic imports.
pub use address::{FolderAddress, StorageAddress};
pub use document::ObjectStore;
pub use error::{BackendError, BackendResult, StoreError, StoreResult};
pub use folder::ObjectStoreFolder;
pub use memory::{BackendOp, InMemoryBackend};
pub use traits::{ByteStream, ObjectBody, StorageBackend};
pub use types::{
    ListOptions, ListingResult, ObjectSummary, Owner, PutObjectRequest, PutReceipt,
    ServerSideEncryption, Tag, TagSet,
};
