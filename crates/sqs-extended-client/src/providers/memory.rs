//! In-memory queue service and blob store implementations.
//!
//! These collaborators are fully functional and thread-safe. They are intended
//! for:
//! - Unit and integration testing of code built on the extended client
//! - Development without cloud credentials
//! - Inspecting exactly what the offload layer put on the wire
//!
//! Visibility timeouts are not simulated on a clock: received messages stay
//! in flight until deleted or until [`InMemoryQueueService::expire_visibility`]
//! returns them to the queue.

use crate::blob_store::BlobStore;
use crate::error::{BlobStoreError, QueueServiceError};
use crate::message::{
    attribute_filter_matches, BatchResultErrorEntry, DeleteMessageBatchRequest,
    DeleteMessageBatchResponse, DeleteMessageRequest, Message, MessageAttributes,
    ReceiveMessageRequest, ReceiveMessageResponse, SendMessageBatchRequest,
    SendMessageBatchResponse, SendMessageBatchResultEntry, SendMessageRequest,
    SendMessageResponse,
};
use crate::queue_service::QueueService;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Maximum number of messages returned by one receive
const MAX_RECEIVE_BATCH: usize = 10;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in the queue
#[derive(Clone)]
struct StoredMessage {
    /// Enqueue order, used to restore position when visibility expires
    sequence: u64,
    message_id: String,
    body: String,
    message_attributes: MessageAttributes,
    receive_count: u32,
}

/// A message currently being processed
struct InFlightMessage {
    queue_url: String,
    message: StoredMessage,
}

#[derive(Default)]
struct QueueState {
    /// Visible messages per queue URL (FIFO order)
    queues: HashMap<String, VecDeque<StoredMessage>>,
    /// In-flight messages keyed by receipt handle
    in_flight: HashMap<String, InFlightMessage>,
    /// Receipt handles passed to successful deletes, in call order
    deleted_receipt_handles: Vec<String>,
    next_sequence: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not wedge every later caller
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// InMemoryQueueService
// ============================================================================

/// In-memory queue service; queues are created on first send
#[derive(Default)]
pub struct InMemoryQueueService {
    state: Mutex<QueueState>,
}

impl InMemoryQueueService {
    /// Create new empty queue service
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages currently visible on a queue, without receipt handles
    ///
    /// Returns the raw wire view: pointer bodies and reserved attributes of
    /// offloaded messages are visible here.
    pub fn visible_messages(&self, queue_url: &str) -> Vec<Message> {
        let state = lock(&self.state);
        state
            .queues
            .get(queue_url)
            .map(|queue| {
                queue
                    .iter()
                    .map(|stored| Message {
                        message_id: stored.message_id.clone(),
                        receipt_handle: String::new(),
                        body: stored.body.clone(),
                        message_attributes: stored.message_attributes.clone(),
                        attributes: HashMap::new(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of received messages not yet deleted
    pub fn in_flight_count(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    /// Receipt handles the queue service was asked to delete, in order
    pub fn deleted_receipt_handles(&self) -> Vec<String> {
        lock(&self.state).deleted_receipt_handles.clone()
    }

    /// Return every in-flight message of a queue to the front of the queue
    ///
    /// Simulates the visibility timeout expiring without the messages being
    /// deleted. Returns the number of messages made visible again.
    pub fn expire_visibility(&self, queue_url: &str) -> usize {
        let mut state = lock(&self.state);

        let expired: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, in_flight)| in_flight.queue_url == queue_url)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        let mut returned: Vec<StoredMessage> = expired
            .iter()
            .filter_map(|receipt| state.in_flight.remove(receipt))
            .map(|in_flight| in_flight.message)
            .collect();
        returned.sort_by_key(|message| message.sequence);

        let count = returned.len();
        let queue = state.queues.entry(queue_url.to_string()).or_default();
        for message in returned.into_iter().rev() {
            queue.push_front(message);
        }
        count
    }

    fn enqueue(&self, queue_url: &str, body: String, message_attributes: MessageAttributes) -> String {
        let message_id = uuid::Uuid::new_v4().to_string();
        let mut state = lock(&self.state);
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state
            .queues
            .entry(queue_url.to_string())
            .or_default()
            .push_back(StoredMessage {
                sequence,
                message_id: message_id.clone(),
                body,
                message_attributes,
                receive_count: 0,
            });
        message_id
    }

    fn complete(&self, receipt_handle: &str) -> Result<(), QueueServiceError> {
        let mut state = lock(&self.state);
        if state.in_flight.remove(receipt_handle).is_none() {
            return Err(QueueServiceError::InvalidReceiptHandle {
                receipt_handle: receipt_handle.to_string(),
            });
        }
        state.deleted_receipt_handles.push(receipt_handle.to_string());
        Ok(())
    }
}

fn filter_attributes(attributes: &MessageAttributes, requested: &[String]) -> MessageAttributes {
    attributes
        .iter()
        .filter(|(name, _)| {
            requested
                .iter()
                .any(|filter| attribute_filter_matches(filter, name))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, QueueServiceError> {
        let message_id = self.enqueue(
            &request.queue_url,
            request.message_body,
            request.message_attributes,
        );

        Ok(SendMessageResponse {
            message_id,
            sequence_number: None,
        })
    }

    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<SendMessageBatchResponse, QueueServiceError> {
        let successful = request
            .entries
            .into_iter()
            .map(|entry| SendMessageBatchResultEntry {
                message_id: self.enqueue(
                    &request.queue_url,
                    entry.message_body,
                    entry.message_attributes,
                ),
                id: entry.id,
                sequence_number: None,
            })
            .collect();

        Ok(SendMessageBatchResponse {
            successful,
            failed: Vec::new(),
        })
    }

    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse, QueueServiceError> {
        let max_messages = request
            .max_number_of_messages
            .map_or(1, |max| max.clamp(1, MAX_RECEIVE_BATCH as i32) as usize);

        let mut state = lock(&self.state);
        let mut taken = Vec::new();
        if let Some(queue) = state.queues.get_mut(&request.queue_url) {
            while taken.len() < max_messages {
                match queue.pop_front() {
                    Some(message) => taken.push(message),
                    None => break,
                }
            }
        }

        let mut messages = Vec::with_capacity(taken.len());
        for mut stored in taken {
            stored.receive_count += 1;
            let receipt_handle = format!("AQEB{}", uuid::Uuid::new_v4().simple());

            let mut attributes = HashMap::new();
            if request.requests_system_attribute("ApproximateReceiveCount") {
                attributes.insert(
                    "ApproximateReceiveCount".to_string(),
                    stored.receive_count.to_string(),
                );
            }

            messages.push(Message {
                message_id: stored.message_id.clone(),
                receipt_handle: receipt_handle.clone(),
                body: stored.body.clone(),
                message_attributes: filter_attributes(
                    &stored.message_attributes,
                    &request.message_attribute_names,
                ),
                attributes,
            });

            state.in_flight.insert(
                receipt_handle,
                InFlightMessage {
                    queue_url: request.queue_url.clone(),
                    message: stored,
                },
            );
        }

        Ok(ReceiveMessageResponse { messages })
    }

    async fn delete_message(&self, request: DeleteMessageRequest) -> Result<(), QueueServiceError> {
        self.complete(&request.receipt_handle)
    }

    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<DeleteMessageBatchResponse, QueueServiceError> {
        let mut response = DeleteMessageBatchResponse::default();

        for entry in request.entries {
            match self.complete(&entry.receipt_handle) {
                Ok(()) => response.successful.push(entry.id),
                Err(e) => response.failed.push(BatchResultErrorEntry {
                    id: entry.id,
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: Some(e.to_string()),
                    sender_fault: true,
                }),
            }
        }

        Ok(response)
    }
}

// ============================================================================
// InMemoryBlobStore
// ============================================================================

/// A blob store call recorded by [`InMemoryBlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOperation {
    Put { bucket: String, key: String, size: usize },
    Get { bucket: String, key: String },
    DeleteObjects { bucket: String, keys: Vec<String> },
}

#[derive(Default)]
struct BlobState {
    objects: HashMap<(String, String), Bytes>,
    operations: Vec<BlobOperation>,
    unavailable: bool,
    failing_put_pattern: Option<String>,
}

/// In-memory blob store with an operation log and failure injection
#[derive(Default)]
pub struct InMemoryBlobStore {
    state: Mutex<BlobState>,
    latency: Option<Duration>,
}

impl InMemoryBlobStore {
    /// Create new empty blob store
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by a fixed latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed an object directly, bypassing the operation log
    pub fn insert_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        lock(&self.state)
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Read an object without recording an operation
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        lock(&self.state)
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        lock(&self.state).objects.len()
    }

    /// Every recorded call, in order
    pub fn operations(&self) -> Vec<BlobOperation> {
        lock(&self.state).operations.clone()
    }

    /// Make every operation fail with a connection error
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Fail puts whose body contains the given text
    pub fn fail_puts_containing(&self, pattern: impl Into<String>) {
        lock(&self.state).failing_put_pattern = Some(pattern.into());
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_available(state: &BlobState) -> Result<(), BlobStoreError> {
        if state.unavailable {
            return Err(BlobStoreError::ConnectionFailed {
                message: "blob store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError> {
        self.simulate_latency().await;

        let mut state = lock(&self.state);
        Self::check_available(&state)?;

        if let Some(pattern) = &state.failing_put_pattern {
            if String::from_utf8_lossy(&body).contains(pattern.as_str()) {
                return Err(BlobStoreError::ServiceError {
                    code: "InternalError".to_string(),
                    message: format!("injected put failure for {}/{}", bucket, key),
                });
            }
        }

        state.operations.push(BlobOperation::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: body.len(),
        });
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError> {
        self.simulate_latency().await;

        let mut state = lock(&self.state);
        Self::check_available(&state)?;

        state.operations.push(BlobOperation::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BlobStoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BlobStoreError> {
        self.simulate_latency().await;

        let mut state = lock(&self.state);
        Self::check_available(&state)?;

        state.operations.push(BlobOperation::DeleteObjects {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        });
        for key in keys {
            state.objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(())
    }
}
