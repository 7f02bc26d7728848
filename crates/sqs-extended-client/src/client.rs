//! # Extended Client
//!
//! [`ExtendedClient`] wraps a [`QueueService`] and exposes the same operation
//! set. Sends offload large bodies, receives resolve them, and deletes remove
//! the blobs referenced by extended receipt handles. Everything else passes
//! through to the wrapped service unchanged.
//!
//! The blob store is obtained at most once per client and only when an
//! operation actually touches an offloaded body, so a client that never sees
//! a large message never creates one.
//!
//! Configuration is changed through `&mut self`; it cannot change while
//! operations borrowing the client are in flight.

use crate::batch;
use crate::blob_store::{BlobStore, BlobStoreFactory};
use crate::config::{OffloadConfig, OffloadSettings};
use crate::error::{ConfigurationError, ExtendedClientError};
use crate::message::{
    DeleteMessageBatchEntry, DeleteMessageBatchRequest, DeleteMessageBatchResponse,
    DeleteMessageRequest, Message, MessageAttributes, ReceiveMessageRequest,
    ReceiveMessageResponse, SendMessageBatchEntry, SendMessageBatchRequest,
    SendMessageBatchResponse, SendMessageRequest, SendMessageResponse,
};
use crate::offload::{self, OffloadRetriever, OffloadStore};
use crate::queue_service::QueueService;
use crate::receipt::{self, BlobDeletion};
use crate::RESERVED_ATTRIBUTE_NAME;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ExtendedClient`]
///
/// Configuration setters validate immediately and return the first
/// misconfiguration as an error.
pub struct ExtendedClientBuilder {
    queue_service: Arc<dyn QueueService>,
    config: OffloadConfig,
    blob_store: Option<Arc<dyn BlobStore>>,
    blob_store_factory: Option<Arc<dyn BlobStoreFactory>>,
}

impl ExtendedClientBuilder {
    /// Start building a client around a queue service; offload is disabled
    pub fn new(queue_service: Arc<dyn QueueService>) -> Self {
        Self {
            queue_service,
            config: OffloadConfig::new(),
            blob_store: None,
            blob_store_factory: None,
        }
    }

    /// Use an existing blob store handle
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Create the blob store on first need
    ///
    /// Ignored when an explicit blob store is also given.
    pub fn with_blob_store_factory(mut self, factory: Arc<dyn BlobStoreFactory>) -> Self {
        self.blob_store_factory = Some(factory);
        self
    }

    /// Enable offload into the given bucket
    pub fn with_bucket_name(mut self, bucket_name: impl Into<String>) -> Result<Self, ConfigurationError> {
        self.config.set_bucket_name(bucket_name)?;
        Ok(self)
    }

    pub fn with_message_size_threshold(mut self, threshold: usize) -> Result<Self, ConfigurationError> {
        self.config.set_message_size_threshold(threshold)?;
        Ok(self)
    }

    /// Offload every message regardless of size; requires a bucket name
    pub fn with_always_offload(mut self, always_offload: bool) -> Result<Self, ConfigurationError> {
        self.config.set_always_offload(always_offload)?;
        Ok(self)
    }

    /// Replace the offload configuration
    pub fn with_config(mut self, config: OffloadConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the offload configuration with loaded settings
    pub fn with_settings(mut self, settings: OffloadSettings) -> Result<Self, ConfigurationError> {
        self.config = settings.into_config()?;
        Ok(self)
    }

    pub fn build(self) -> ExtendedClient {
        let blob_store = match self.blob_store {
            Some(store) => OnceCell::from(store),
            None => OnceCell::new(),
        };

        ExtendedClient {
            queue_service: self.queue_service,
            config: Arc::new(self.config),
            blob_store,
            blob_store_factory: self.blob_store_factory,
        }
    }
}

// ============================================================================
// Extended Client
// ============================================================================

/// Queue service client that offloads large payloads to a blob store
pub struct ExtendedClient {
    queue_service: Arc<dyn QueueService>,
    config: Arc<OffloadConfig>,
    blob_store: OnceCell<Arc<dyn BlobStore>>,
    blob_store_factory: Option<Arc<dyn BlobStoreFactory>>,
}

impl ExtendedClient {
    pub fn builder(queue_service: Arc<dyn QueueService>) -> ExtendedClientBuilder {
        ExtendedClientBuilder::new(queue_service)
    }

    /// Current offload configuration
    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    /// Mutable offload configuration; setters validate as usual
    pub fn config_mut(&mut self) -> &mut OffloadConfig {
        Arc::make_mut(&mut self.config)
    }

    /// Replace the blob store handle, e.g. with a test double
    pub fn set_blob_store(&mut self, blob_store: Arc<dyn BlobStore>) {
        self.blob_store = OnceCell::from(blob_store);
    }

    /// Bind a handle to one queue
    pub fn queue(&self, queue_url: impl Into<String>) -> QueueHandle<'_> {
        QueueHandle {
            client: self,
            queue_url: queue_url.into(),
        }
    }

    /// Send a message, offloading its body first if required
    ///
    /// # Errors
    ///
    /// Fails without sending if the blob write fails or the caller set the
    /// reserved attribute.
    pub async fn send_message(
        &self,
        mut request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ExtendedClientError> {
        let store = self
            .offload_store_for(std::iter::once((
                &request.message_attributes,
                request.message_body.as_str(),
            )))
            .await?;

        if let Some(store) = store {
            let (attributes, body) = store
                .store(
                    &request.queue_url,
                    std::mem::take(&mut request.message_attributes),
                    std::mem::take(&mut request.message_body),
                )
                .await?;
            request.message_attributes = attributes;
            request.message_body = body;
        }

        Ok(self.queue_service.send_message(request).await?)
    }

    /// Send several messages, offloading entries concurrently
    ///
    /// If any entry fails to offload, nothing is sent. Blobs already written
    /// for sibling entries are left in place.
    pub async fn send_message_batch(
        &self,
        mut request: SendMessageBatchRequest,
    ) -> Result<SendMessageBatchResponse, ExtendedClientError> {
        let store = self
            .offload_store_for(
                request
                    .entries
                    .iter()
                    .map(|e| (&e.message_attributes, e.message_body.as_str())),
            )
            .await?;

        if let Some(store) = store {
            let queue_url = Arc::new(request.queue_url.clone());
            let entries = std::mem::take(&mut request.entries);

            request.entries = batch::map_ordered(entries, move |mut entry: SendMessageBatchEntry| {
                let store = store.clone();
                let queue_url = queue_url.clone();
                async move {
                    let (attributes, body) = store
                        .store(
                            &queue_url,
                            std::mem::take(&mut entry.message_attributes),
                            std::mem::take(&mut entry.message_body),
                        )
                        .await?;
                    entry.message_attributes = attributes;
                    entry.message_body = body;
                    Ok::<_, ExtendedClientError>(entry)
                }
            })
            .await?;
        }

        Ok(self.queue_service.send_message_batch(request).await?)
    }

    /// Receive messages, resolving offloaded bodies
    ///
    /// The reserved attribute is always requested from the queue service and
    /// never returned to the caller. Offloaded bodies are resolved with the
    /// bucket recorded in each pointer, so this works even when this client's
    /// own offload is disabled. If any body cannot be resolved the whole
    /// receive fails and the messages stay unacknowledged on the queue.
    pub async fn receive_message(
        &self,
        mut request: ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse, ExtendedClientError> {
        if !request.requests_attribute(RESERVED_ATTRIBUTE_NAME) {
            request
                .message_attribute_names
                .push(RESERVED_ATTRIBUTE_NAME.to_string());
        }

        let mut response = self.queue_service.receive_message(request).await?;

        let offloaded = response
            .messages
            .iter()
            .filter(|m| offload::is_offloaded(&m.message_attributes))
            .count();
        if offloaded == 0 {
            return Ok(response);
        }

        debug!(
            count = response.messages.len(),
            offloaded, "Resolving offloaded message bodies"
        );

        let retriever = OffloadRetriever::new(self.blob_store().await?);
        let mut messages = std::mem::take(&mut response.messages);

        response.messages = if messages.len() == 1 {
            let message = messages.remove(0);
            vec![resolve_message(&retriever, message).await?]
        } else {
            batch::map_ordered(messages, move |message| {
                let retriever = retriever.clone();
                async move { resolve_message(&retriever, message).await }
            })
            .await?
        };

        Ok(response)
    }

    /// Delete a message and the blob its receipt handle references
    ///
    /// Deleting twice with the same extended receipt handle never fails on
    /// the already-deleted blob.
    pub async fn delete_message(&self, request: DeleteMessageRequest) -> Result<(), ExtendedClientError> {
        let plan = receipt::plan_delete(request);
        self.delete_blobs(&plan.deletions).await?;
        Ok(self.queue_service.delete_message(plan.request).await?)
    }

    /// Delete several messages, removing referenced blobs with one call per bucket
    pub async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<DeleteMessageBatchResponse, ExtendedClientError> {
        let plan = receipt::plan_delete_batch(request);
        self.delete_blobs(&plan.deletions).await?;
        Ok(self.queue_service.delete_message_batch(plan.request).await?)
    }

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, ExtendedClientError> {
        let store = self
            .blob_store
            .get_or_try_init(|| async {
                let factory = self
                    .blob_store_factory
                    .as_ref()
                    .ok_or(ConfigurationError::MissingBlobStore)?;
                let store = factory.create().await?;
                info!("Initialized blob store for offloaded payloads");
                Ok::<_, ExtendedClientError>(store)
            })
            .await?;
        Ok(store.clone())
    }

    /// Offload store for a send, or `None` when no message needs one
    async fn offload_store_for<'a>(
        &self,
        messages: impl Iterator<Item = (&'a MessageAttributes, &'a str)>,
    ) -> Result<Option<OffloadStore>, ExtendedClientError> {
        let mut needs_offload = false;
        for (attributes, body) in messages {
            offload::ensure_unreserved(attributes)?;
            needs_offload |= self.config.offload_target(attributes, body).is_some();
        }

        if !needs_offload {
            return Ok(None);
        }

        let blob_store = self.blob_store().await?;
        Ok(Some(OffloadStore::new(self.config.clone(), blob_store)))
    }

    async fn delete_blobs(&self, deletions: &[BlobDeletion]) -> Result<(), ExtendedClientError> {
        if deletions.is_empty() {
            return Ok(());
        }
        let blob_store = self.blob_store().await?;
        receipt::delete_blobs(blob_store.as_ref(), deletions).await?;
        Ok(())
    }
}

async fn resolve_message(
    retriever: &OffloadRetriever,
    mut message: Message,
) -> Result<Message, ExtendedClientError> {
    let (attributes, body, receipt_handle) = retriever
        .retrieve(
            std::mem::take(&mut message.message_attributes),
            std::mem::take(&mut message.body),
            std::mem::take(&mut message.receipt_handle),
        )
        .await?;
    message.message_attributes = attributes;
    message.body = body;
    message.receipt_handle = receipt_handle;
    Ok(message)
}

// ============================================================================
// Queue Handle
// ============================================================================

/// Extended client operations bound to one queue URL
///
/// Received messages can be deleted directly through the handle that
/// received them.
///
/// ```
/// # use sqs_extended_client::providers::{InMemoryBlobStore, InMemoryQueueService};
/// # use sqs_extended_client::{ExtendedClientBuilder, MessageAttributes};
/// # use std::sync::Arc;
/// # tokio_test::block_on(async {
/// let client = ExtendedClientBuilder::new(Arc::new(InMemoryQueueService::new()))
///     .with_blob_store(Arc::new(InMemoryBlobStore::new()))
///     .with_bucket_name("large-payloads")
///     .unwrap()
///     .with_message_size_threshold(16)
///     .unwrap()
///     .build();
/// let queue = client.queue("https://queue.local/orders");
///
/// queue.send("a body longer than sixteen bytes", MessageAttributes::new()).await.unwrap();
/// let messages = queue.receive(1).await.unwrap();
/// assert_eq!(messages[0].body, "a body longer than sixteen bytes");
/// queue.delete(&messages[0]).await.unwrap();
/// # });
/// ```
pub struct QueueHandle<'a> {
    client: &'a ExtendedClient,
    queue_url: String,
}

impl QueueHandle<'_> {
    pub fn url(&self) -> &str {
        &self.queue_url
    }

    /// Send a message body with attributes
    pub async fn send(
        &self,
        body: impl Into<String>,
        attributes: MessageAttributes,
    ) -> Result<SendMessageResponse, ExtendedClientError> {
        let mut request = SendMessageRequest::new(self.queue_url.clone(), body);
        request.message_attributes = attributes;
        self.client.send_message(request).await
    }

    pub async fn send_batch(
        &self,
        entries: Vec<SendMessageBatchEntry>,
    ) -> Result<SendMessageBatchResponse, ExtendedClientError> {
        self.client
            .send_message_batch(SendMessageBatchRequest::new(self.queue_url.clone(), entries))
            .await
    }

    /// Receive up to `max_number_of_messages` messages with all their message and system attributes
    pub async fn receive(&self, max_number_of_messages: i32) -> Result<Vec<Message>, ExtendedClientError> {
        let request = ReceiveMessageRequest::new(self.queue_url.clone())
            .with_max_number_of_messages(max_number_of_messages)
            .with_message_attribute_name("All")
            .with_message_system_attribute_name("All");
        Ok(self.client.receive_message(request).await?.messages)
    }

    /// Delete a message received from this queue
    pub async fn delete(&self, message: &Message) -> Result<(), ExtendedClientError> {
        self.client
            .delete_message(DeleteMessageRequest::new(
                self.queue_url.clone(),
                message.receipt_handle.clone(),
            ))
            .await
    }

    /// Delete several received messages; entry ids are the message positions
    pub async fn delete_batch(
        &self,
        messages: &[Message],
    ) -> Result<DeleteMessageBatchResponse, ExtendedClientError> {
        let entries = messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                DeleteMessageBatchEntry::new(index.to_string(), message.receipt_handle.clone())
            })
            .collect();

        self.client
            .delete_message_batch(DeleteMessageBatchRequest::new(self.queue_url.clone(), entries))
            .await
    }
}
