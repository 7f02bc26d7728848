//! # SQS Extended Client
//!
//! Transparent offload of large queue message payloads to a blob store.
//!
//! Messages whose encoded size exceeds a configured threshold are written to a
//! blob store bucket and replaced on the queue by a small pointer record. On
//! receive the pointer is resolved back into the original body, and on delete
//! the referenced blob is removed together with the queue message.
//!
//! The wire formats (pointer body, extended receipt handle, reserved attribute)
//! are compatible with every other implementation of the SQS extended client
//! protocol, so producers and consumers built with different libraries can
//! share a queue.
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for configuration, collaborators and offload
//! - [`message`] - Message-in-flight and queue request/response shapes
//! - [`sizing`] - Message size evaluation against the threshold
//! - [`pointer`] - Pointer record and extended receipt handle codecs
//! - [`config`] - Offload configuration and settings loading
//! - [`blob_store`] - Blob store collaborator interface
//! - [`queue_service`] - Queue service collaborator interface
//! - [`offload`] - Per-message store and retrieve operations
//! - [`batch`] - Order-preserving concurrent fan-out
//! - [`receipt`] - Receipt handle interception before deletes
//! - [`client`] - The extended client facade
//! - [`providers`] - In-memory and AWS collaborator implementations
//!
//! ## Example
//!
//! ```no_run
//! use sqs_extended_client::providers::{InMemoryBlobStore, InMemoryQueueService};
//! use sqs_extended_client::{ExtendedClientBuilder, SendMessageRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ExtendedClientBuilder::new(Arc::new(InMemoryQueueService::new()))
//!     .with_blob_store(Arc::new(InMemoryBlobStore::new()))
//!     .with_bucket_name("large-payloads")?
//!     .with_message_size_threshold(1024)?
//!     .build();
//!
//! let request = SendMessageRequest::new("https://queue.local/orders", "x".repeat(4096));
//! client.send_message(request).await?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod batch;
pub mod blob_store;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod offload;
pub mod pointer;
pub mod providers;
pub mod queue_service;
pub mod receipt;
pub mod sizing;

// Re-export commonly used types at crate root for convenience
pub use blob_store::{BlobStore, BlobStoreFactory};
pub use client::{ExtendedClient, ExtendedClientBuilder, QueueHandle};
pub use config::{OffloadConfig, OffloadSettings};
pub use error::{
    BlobStoreError, ConfigurationError, ExtendedClientError, QueueServiceError,
};
pub use message::{
    BatchResultErrorEntry, DeleteMessageBatchEntry, DeleteMessageBatchRequest,
    DeleteMessageBatchResponse, DeleteMessageRequest, Message, MessageAttributeValue,
    MessageAttributes, ReceiveMessageRequest, ReceiveMessageResponse, SendMessageBatchEntry,
    SendMessageBatchRequest, SendMessageBatchResponse, SendMessageBatchResultEntry,
    SendMessageRequest, SendMessageResponse,
};
pub use pointer::{ExtendedReceiptHandle, MessagePointer};
pub use queue_service::QueueService;

/// Largest message the queue service accepts, and the default offload threshold
pub const MAX_MESSAGE_SIZE_THRESHOLD: usize = 262_144;

/// Message attribute marking an offloaded body; its value is the body length in bytes
pub const RESERVED_ATTRIBUTE_NAME: &str = "SQSLargePayloadSize";

/// Type tag shared by every implementation of the pointer record
pub const MESSAGE_POINTER_CLASS: &str = "com.amazon.sqs.javamessaging.MessageS3Pointer";

/// Delimiter surrounding the bucket name inside an extended receipt handle
pub const S3_BUCKET_NAME_MARKER: &str = "-..s3BucketName..-";

/// Delimiter surrounding the object key inside an extended receipt handle
pub const S3_KEY_MARKER: &str = "-..s3Key..-";

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
