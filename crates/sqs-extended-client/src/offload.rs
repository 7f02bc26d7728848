//! Per-message offload operations.
//!
//! [`OffloadStore`] runs on the send path and [`OffloadRetriever`] on the
//! receive path. Both are cheap to clone so batch workers can each own one.

use crate::blob_store::BlobStore;
use crate::config::OffloadConfig;
use crate::error::ExtendedClientError;
use crate::message::{MessageAttributeValue, MessageAttributes};
use crate::pointer::{ExtendedReceiptHandle, MessagePointer};
use crate::RESERVED_ATTRIBUTE_NAME;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "offload_tests.rs"]
mod tests;

/// Check whether received attributes mark an offloaded body
pub fn is_offloaded(attributes: &MessageAttributes) -> bool {
    attributes.contains_key(RESERVED_ATTRIBUTE_NAME)
}

/// Reject outgoing attributes that already use the reserved name
///
/// A consumer would otherwise treat the inline body as a pointer record.
pub fn ensure_unreserved(attributes: &MessageAttributes) -> Result<(), ExtendedClientError> {
    if is_offloaded(attributes) {
        return Err(ExtendedClientError::ReservedAttributeName {
            name: RESERVED_ATTRIBUTE_NAME.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Offload Store
// ============================================================================

/// Moves large message bodies into the blob store before they are sent
#[derive(Clone)]
pub struct OffloadStore {
    config: Arc<OffloadConfig>,
    blob_store: Arc<dyn BlobStore>,
}

impl OffloadStore {
    pub fn new(config: Arc<OffloadConfig>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self { config, blob_store }
    }

    /// Offload the body if configuration and size require it
    ///
    /// Returns the attributes and body to send. When offloaded, the body is
    /// the pointer record and the reserved attribute holds the original body
    /// length. The blob is written before anything is substituted, so a failed
    /// write leaves nothing half-done.
    ///
    /// # Errors
    ///
    /// - [`ExtendedClientError::ReservedAttributeName`] if the caller already
    ///   set the reserved attribute
    /// - [`ExtendedClientError::BlobStore`] if the blob write fails
    pub async fn store(
        &self,
        queue_url: &str,
        mut attributes: MessageAttributes,
        body: String,
    ) -> Result<(MessageAttributes, String), ExtendedClientError> {
        ensure_unreserved(&attributes)?;

        let Some(bucket_name) = self.config.offload_target(&attributes, &body) else {
            return Ok((attributes, body));
        };

        let pointer = MessagePointer::new(bucket_name, uuid::Uuid::new_v4().to_string());
        let pointer_body = pointer.to_json()?;
        let size_bytes = body.len();

        self.blob_store
            .put_object(&pointer.bucket_name, &pointer.key, Bytes::from(body))
            .await?;

        debug!(
            queue_url = %queue_url,
            bucket = %pointer.bucket_name,
            key = %pointer.key,
            size_bytes,
            "Offloaded message body to blob store"
        );

        attributes.insert(
            RESERVED_ATTRIBUTE_NAME.to_string(),
            MessageAttributeValue::number(size_bytes),
        );
        Ok((attributes, pointer_body))
    }
}

// ============================================================================
// Offload Retriever
// ============================================================================

/// Resolves pointer records on received messages back into their bodies
#[derive(Clone)]
pub struct OffloadRetriever {
    blob_store: Arc<dyn BlobStore>,
}

impl OffloadRetriever {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Resolve an offloaded body
    ///
    /// Messages without the reserved attribute are returned unchanged.
    /// Otherwise the reserved attribute is removed, the body is fetched from
    /// the blob store, and the receipt handle is extended with the blob
    /// location so a later delete can remove the blob.
    ///
    /// # Errors
    ///
    /// - [`ExtendedClientError::CorruptMessage`] if the body is not a pointer
    ///   record or the blob is not valid UTF-8
    /// - [`ExtendedClientError::BlobStore`] if the blob cannot be read
    pub async fn retrieve(
        &self,
        mut attributes: MessageAttributes,
        body: String,
        receipt_handle: String,
    ) -> Result<(MessageAttributes, String, String), ExtendedClientError> {
        if attributes.remove(RESERVED_ATTRIBUTE_NAME).is_none() {
            return Ok((attributes, body, receipt_handle));
        }

        let pointer = MessagePointer::from_json(&body).ok_or_else(|| {
            warn!(
                body_len = body.len(),
                "Message carries the reserved attribute but its body is not a pointer record"
            );
            ExtendedClientError::CorruptMessage {
                reason: "message body is not a valid pointer record".to_string(),
            }
        })?;

        let content = self
            .blob_store
            .get_object(&pointer.bucket_name, &pointer.key)
            .await?;

        let body = String::from_utf8(content.to_vec()).map_err(|e| {
            ExtendedClientError::CorruptMessage {
                reason: format!(
                    "offloaded body {}/{} is not valid UTF-8: {}",
                    pointer.bucket_name, pointer.key, e
                ),
            }
        })?;

        debug!(
            bucket = %pointer.bucket_name,
            key = %pointer.key,
            size_bytes = body.len(),
            "Retrieved offloaded message body"
        );

        let receipt_handle = ExtendedReceiptHandle::new(pointer, receipt_handle).to_string();
        Ok((attributes, body, receipt_handle))
    }
}
