//! Receipt handle interception before deletes.
//!
//! Deletes are split into two steps: planning rewrites the request so the
//! queue service only ever sees inner receipt handles, and
//! [`delete_blobs`] removes the blobs the extended handles referenced. The
//! caller obtains a blob store only when the plan has blobs to delete.

use crate::blob_store::BlobStore;
use crate::error::BlobStoreError;
use crate::message::{DeleteMessageBatchRequest, DeleteMessageRequest};
use crate::pointer::{ExtendedReceiptHandle, MessagePointer};
use tracing::debug;

#[cfg(test)]
#[path = "receipt_tests.rs"]
mod tests;

/// Objects to remove from one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobDeletion {
    pub bucket: String,
    pub keys: Vec<String>,
}

/// A delete request rewritten for the queue service plus the blobs to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan<R> {
    pub request: R,
    /// One entry per distinct bucket, in order of first appearance
    pub deletions: Vec<BlobDeletion>,
}

/// Rewrite a single delete, unwrapping an extended receipt handle
pub fn plan_delete(request: DeleteMessageRequest) -> DeletePlan<DeleteMessageRequest> {
    let mut deletions = Vec::new();
    let receipt_handle = unwrap_into(request.receipt_handle, &mut deletions);

    DeletePlan {
        request: DeleteMessageRequest {
            queue_url: request.queue_url,
            receipt_handle,
        },
        deletions,
    }
}

/// Rewrite a batch delete, grouping referenced blobs by bucket
///
/// Entry identifiers are kept so per-entry results from the queue service
/// still correlate with the caller's entries.
pub fn plan_delete_batch(
    request: DeleteMessageBatchRequest,
) -> DeletePlan<DeleteMessageBatchRequest> {
    let mut deletions = Vec::new();
    let mut entries = request.entries;

    for entry in entries.iter_mut() {
        let receipt_handle = std::mem::take(&mut entry.receipt_handle);
        entry.receipt_handle = unwrap_into(receipt_handle, &mut deletions);
    }

    DeletePlan {
        request: DeleteMessageBatchRequest {
            queue_url: request.queue_url,
            entries,
        },
        deletions,
    }
}

/// Issue one quiet multi-object delete per bucket
pub async fn delete_blobs(
    blob_store: &dyn BlobStore,
    deletions: &[BlobDeletion],
) -> Result<(), BlobStoreError> {
    for deletion in deletions {
        blob_store
            .delete_objects(&deletion.bucket, &deletion.keys)
            .await?;

        debug!(
            bucket = %deletion.bucket,
            count = deletion.keys.len(),
            "Deleted offloaded message bodies"
        );
    }
    Ok(())
}

fn unwrap_into(receipt_handle: String, deletions: &mut Vec<BlobDeletion>) -> String {
    match ExtendedReceiptHandle::parse(&receipt_handle) {
        Some(extended) => {
            record_deletion(deletions, extended.pointer);
            extended.receipt_handle
        }
        None => receipt_handle,
    }
}

fn record_deletion(deletions: &mut Vec<BlobDeletion>, pointer: MessagePointer) {
    match deletions
        .iter_mut()
        .find(|d| d.bucket == pointer.bucket_name)
    {
        Some(deletion) => {
            if !deletion.keys.contains(&pointer.key) {
                deletion.keys.push(pointer.key);
            }
        }
        None => deletions.push(BlobDeletion {
            bucket: pointer.bucket_name,
            keys: vec![pointer.key],
        }),
    }
}
