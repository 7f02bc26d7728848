//! Collaborator implementations.
//!
//! - [`memory`] - In-process queue service and blob store for tests and local use
//! - `aws` - Amazon SQS and S3 adapters (requires the `aws` feature)

pub mod memory;

#[cfg(feature = "aws")]
pub mod aws;

pub use memory::{BlobOperation, InMemoryBlobStore, InMemoryQueueService};

#[cfg(feature = "aws")]
pub use aws::{S3BlobStore, S3BlobStoreFactory, SqsQueueService};
