//! Queue service interface.
//!
//! The extended client decorates an implementation of this trait; it never
//! reimplements delivery semantics (visibility, ordering, redelivery), which
//! remain the queue service's responsibility.

use crate::error::QueueServiceError;
use crate::message::{
    DeleteMessageBatchRequest, DeleteMessageBatchResponse, DeleteMessageRequest,
    ReceiveMessageRequest, ReceiveMessageResponse, SendMessageBatchRequest,
    SendMessageBatchResponse, SendMessageRequest, SendMessageResponse,
};
use async_trait::async_trait;

/// Interface implemented by queue service clients (SQS, in-memory, etc.)
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Send single message
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, QueueServiceError>;

    /// Send multiple messages in one request
    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<SendMessageBatchResponse, QueueServiceError>;

    /// Receive messages
    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse, QueueServiceError>;

    /// Delete a received message
    async fn delete_message(&self, request: DeleteMessageRequest) -> Result<(), QueueServiceError>;

    /// Delete multiple received messages in one request
    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<DeleteMessageBatchResponse, QueueServiceError>;
}
