//! # Blob Store Interface
//!
//! Abstraction over the object store holding offloaded message bodies.
//!
//! Implementations must be safe for concurrent use: a single handle is shared
//! by every offload operation issued through one extended client, including
//! the concurrent workers of batch operations.

use crate::error::BlobStoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Interface for blob store operations
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write an object with private access and explicit content length
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable or the write is rejected.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError>;

    /// Read an object
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::ObjectNotFound`] if the object does not exist,
    /// or another error if the store is unavailable.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError>;

    /// Delete several objects from one bucket in a single request
    ///
    /// Quiet semantics: keys that do not exist are not an error, so deleting
    /// the same key twice succeeds.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BlobStoreError>;
}

/// Creates the blob store handle the first time an operation needs it
#[async_trait]
pub trait BlobStoreFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn BlobStore>, BlobStoreError>;
}

