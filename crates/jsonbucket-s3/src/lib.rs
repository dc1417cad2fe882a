//! AWS S3 backend for jsonbucket.
//!
//! [`S3Backend`] implements [`jsonbucket_store::StorageBackend`] on top of
//! the AWS SDK for Rust. Build one client per process and share it through
//! `Arc<dyn StorageBackend>`.
//!
//! Credentials always come from the SDK's default provider chain
//! (environment, shared profile, instance metadata). [`S3Config`] only
//! chooses region, endpoint, profile and addressing style.

pub mod backend;
pub mod config;
mod convert;
pub mod error;

pub use backend::S3Backend;
pub use config::S3Config;
pub use error::{ConfigError, ConfigResult};
