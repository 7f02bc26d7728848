//! Error types for extended client operations.

use thiserror::Error;

/// Comprehensive error type for all extended client operations
#[derive(Debug, Error)]
pub enum ExtendedClientError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    #[error("Queue service error: {0}")]
    QueueService(#[from] QueueServiceError),

    /// The reserved attribute is set but the body is not a usable pointer record
    #[error("Corrupt offloaded message: {reason}")]
    CorruptMessage { reason: String },

    #[error("Message attribute name '{name}' is reserved for offloaded messages")]
    ReservedAttributeName { name: String },

    #[error("Pointer serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Batch worker failed: {message}")]
    BatchWorker { message: String },
}

impl ExtendedClientError {
    /// Check if error is transient and should be retried by the caller
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::BlobStore(e) => e.is_transient(),
            Self::QueueService(e) => e.is_transient(),
            Self::CorruptMessage { .. } => false,
            Self::ReservedAttributeName { .. } => false,
            Self::Serialization(_) => false,
            Self::BatchWorker { .. } => false,
        }
    }

    /// Check if error indicates a malformed offloaded message
    pub fn is_corrupt_message(&self) -> bool {
        matches!(self, Self::CorruptMessage { .. })
    }
}

/// Configuration errors, raised at the point of misconfiguration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Message size threshold {value} is out of range (max: {max})")]
    ThresholdOutOfRange { value: usize, max: usize },

    #[error("Always offloading requires a blob store bucket name")]
    AlwaysOffloadWithoutBucket,

    #[error("Invalid bucket name: {message}")]
    InvalidBucketName { message: String },

    #[error("No blob store or blob store factory configured")]
    MissingBlobStore,

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Errors reported by a blob store collaborator
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Access denied for operation: {operation}")]
    AccessDenied { operation: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out: {message}")]
    Timeout { message: String },

    #[error("Blob store error: {code} - {message}")]
    ServiceError { code: String, message: String },
}

impl BlobStoreError {
    /// Check if error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ObjectNotFound { .. } => false,
            Self::AccessDenied { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::ServiceError { .. } => true,
        }
    }
}

/// Errors reported by a queue service collaborator
#[derive(Debug, Error)]
pub enum QueueServiceError {
    #[error("Queue not found: {queue_url}")]
    QueueNotFound { queue_url: String },

    #[error("Receipt handle is invalid or expired: {receipt_handle}")]
    InvalidReceiptHandle { receipt_handle: String },

    #[error("Access denied for operation: {operation}")]
    AccessDenied { operation: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out: {message}")]
    Timeout { message: String },

    #[error("Queue service error: {code} - {message}")]
    ServiceError { code: String, message: String },
}

impl QueueServiceError {
    /// Check if error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::InvalidReceiptHandle { .. } => false,
            Self::AccessDenied { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::ServiceError { .. } => true, // Service-side errors are usually transient
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
