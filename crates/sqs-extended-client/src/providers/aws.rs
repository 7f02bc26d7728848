//! Amazon SQS and S3 collaborators built on the AWS SDK.
//!
//! [`SqsQueueService`] adapts an `aws_sdk_sqs::Client` to [`QueueService`]
//! and [`S3BlobStore`] adapts an `aws_sdk_s3::Client` to [`BlobStore`].
//! [`S3BlobStoreFactory`] loads the S3 client from the default credential
//! chain the first time a blob is needed.
//!
//! ## Example
//!
//! ```no_run
//! use sqs_extended_client::providers::{S3BlobStoreFactory, SqsQueueService};
//! use sqs_extended_client::ExtendedClientBuilder;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ExtendedClientBuilder::new(Arc::new(SqsQueueService::from_env().await))
//!     .with_blob_store_factory(Arc::new(S3BlobStoreFactory::new()))
//!     .with_bucket_name("large-payloads")?
//!     .build();
//! # Ok(())
//! # }
//! ```

use crate::blob_store::{BlobStore, BlobStoreFactory};
use crate::error::{BlobStoreError, QueueServiceError};
use crate::message::{
    BatchResultErrorEntry, DeleteMessageBatchRequest, DeleteMessageBatchResponse,
    DeleteMessageRequest, Message, MessageAttributeValue, MessageAttributes, ReceiveMessageRequest,
    ReceiveMessageResponse, SendMessageBatchRequest, SendMessageBatchResponse,
    SendMessageBatchResultEntry, SendMessageRequest, SendMessageResponse,
};
use crate::queue_service::QueueService;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{
    DeleteMessageBatchRequestEntry, MessageSystemAttributeName, SendMessageBatchRequestEntry,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

/// Most keys S3 accepts in one multi-object delete
const MAX_DELETE_OBJECTS: usize = 1000;

// ============================================================================
// Error Classification
// ============================================================================

fn classify_queue_error(code: &str, message: String, context: &str) -> QueueServiceError {
    match code {
        "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
            QueueServiceError::QueueNotFound {
                queue_url: context.to_string(),
            }
        }
        "ReceiptHandleIsInvalid" | "InvalidReceiptHandle" => {
            QueueServiceError::InvalidReceiptHandle {
                receipt_handle: context.to_string(),
            }
        }
        "AccessDenied" | "AccessDeniedException" | "InvalidClientTokenId"
        | "SignatureDoesNotMatch" => QueueServiceError::AccessDenied { operation: message },
        "RequestThrottled" | "ThrottlingException" => QueueServiceError::Timeout { message },
        _ => QueueServiceError::ServiceError {
            code: code.to_string(),
            message,
        },
    }
}

fn queue_error<E>(err: SdkError<E>, context: &str) -> QueueServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => QueueServiceError::Timeout {
            message: DisplayErrorContext(&err).to_string(),
        },
        SdkError::DispatchFailure(_) => QueueServiceError::ConnectionFailed {
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => {
            let code = err.code().unwrap_or("Unknown").to_string();
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            classify_queue_error(&code, message, context)
        }
    }
}

fn classify_blob_error(code: &str, message: String, bucket: &str, key: &str) -> BlobStoreError {
    match code {
        "NoSuchKey" | "NotFound" => BlobStoreError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
            BlobStoreError::AccessDenied { operation: message }
        }
        "RequestTimeout" | "SlowDown" => BlobStoreError::Timeout { message },
        _ => BlobStoreError::ServiceError {
            code: code.to_string(),
            message,
        },
    }
}

fn blob_error<E>(err: aws_sdk_s3::error::SdkError<E>, bucket: &str, key: &str) -> BlobStoreError
where
    E: aws_sdk_s3::error::ProvideErrorMetadata + std::error::Error + 'static,
{
    use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

    match &err {
        SdkError::TimeoutError(_) => BlobStoreError::Timeout {
            message: DisplayErrorContext(&err).to_string(),
        },
        SdkError::DispatchFailure(_) => BlobStoreError::ConnectionFailed {
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => {
            let code = err.code().unwrap_or("Unknown").to_string();
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            classify_blob_error(&code, message, bucket, key)
        }
    }
}

fn invalid_queue_request(err: impl std::fmt::Display) -> QueueServiceError {
    QueueServiceError::ServiceError {
        code: "InvalidRequest".to_string(),
        message: err.to_string(),
    }
}

// ============================================================================
// Attribute Conversion
// ============================================================================

fn to_sdk_attribute(
    value: MessageAttributeValue,
) -> Result<aws_sdk_sqs::types::MessageAttributeValue, QueueServiceError> {
    aws_sdk_sqs::types::MessageAttributeValue::builder()
        .data_type(value.data_type)
        .set_string_value(value.string_value)
        .set_binary_value(value.binary_value.map(|b| Blob::new(b.to_vec())))
        .build()
        .map_err(invalid_queue_request)
}

fn to_sdk_attributes(
    attributes: MessageAttributes,
) -> Result<Option<HashMap<String, aws_sdk_sqs::types::MessageAttributeValue>>, QueueServiceError> {
    if attributes.is_empty() {
        return Ok(None);
    }

    attributes
        .into_iter()
        .map(|(name, value)| Ok((name, to_sdk_attribute(value)?)))
        .collect::<Result<HashMap<_, _>, _>>()
        .map(Some)
}

fn from_sdk_attribute(value: &aws_sdk_sqs::types::MessageAttributeValue) -> MessageAttributeValue {
    MessageAttributeValue {
        data_type: value.data_type().to_string(),
        string_value: value.string_value().map(str::to_string),
        binary_value: value
            .binary_value()
            .map(|b| Bytes::copy_from_slice(b.as_ref())),
    }
}

fn from_sdk_message(message: &aws_sdk_sqs::types::Message) -> Message {
    Message {
        message_id: message.message_id().unwrap_or_default().to_string(),
        receipt_handle: message.receipt_handle().unwrap_or_default().to_string(),
        body: message.body().unwrap_or_default().to_string(),
        message_attributes: message
            .message_attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), from_sdk_attribute(value)))
                    .collect()
            })
            .unwrap_or_default(),
        attributes: message
            .attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn system_attribute_names(names: Vec<String>) -> Option<Vec<MessageSystemAttributeName>> {
    if names.is_empty() {
        return None;
    }
    Some(
        names
            .iter()
            .map(|name| MessageSystemAttributeName::from(name.as_str()))
            .collect(),
    )
}

fn from_sdk_batch_error(entry: &aws_sdk_sqs::types::BatchResultErrorEntry) -> BatchResultErrorEntry {
    BatchResultErrorEntry {
        id: entry.id().to_string(),
        code: entry.code().to_string(),
        message: entry.message().map(str::to_string),
        sender_fault: entry.sender_fault(),
    }
}

// ============================================================================
// SqsQueueService
// ============================================================================

/// Queue service backed by Amazon SQS
#[derive(Clone)]
pub struct SqsQueueService {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueService {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    /// Create from the default AWS configuration chain
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sqs::Client::new(&config))
    }
}

#[async_trait]
impl QueueService for SqsQueueService {
    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, QueueServiceError> {
        let output = self
            .client
            .send_message()
            .queue_url(&request.queue_url)
            .message_body(request.message_body)
            .set_message_attributes(to_sdk_attributes(request.message_attributes)?)
            .set_delay_seconds(request.delay_seconds)
            .set_message_group_id(request.message_group_id)
            .set_message_deduplication_id(request.message_deduplication_id)
            .send()
            .await
            .map_err(|e| queue_error(e, &request.queue_url))?;

        Ok(SendMessageResponse {
            message_id: output.message_id().unwrap_or_default().to_string(),
            sequence_number: output.sequence_number().map(str::to_string),
        })
    }

    async fn send_message_batch(
        &self,
        request: SendMessageBatchRequest,
    ) -> Result<SendMessageBatchResponse, QueueServiceError> {
        let entries = request
            .entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.message_body)
                    .set_message_attributes(to_sdk_attributes(entry.message_attributes)?)
                    .set_delay_seconds(entry.delay_seconds)
                    .set_message_group_id(entry.message_group_id)
                    .set_message_deduplication_id(entry.message_deduplication_id)
                    .build()
                    .map_err(invalid_queue_request)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&request.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| queue_error(e, &request.queue_url))?;

        Ok(SendMessageBatchResponse {
            successful: output
                .successful()
                .iter()
                .map(|entry| SendMessageBatchResultEntry {
                    id: entry.id().to_string(),
                    message_id: entry.message_id().to_string(),
                    sequence_number: entry.sequence_number().map(str::to_string),
                })
                .collect(),
            failed: output.failed().iter().map(from_sdk_batch_error).collect(),
        })
    }

    async fn receive_message(
        &self,
        request: ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse, QueueServiceError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&request.queue_url)
            .set_max_number_of_messages(request.max_number_of_messages)
            .set_wait_time_seconds(request.wait_time_seconds)
            .set_visibility_timeout(request.visibility_timeout)
            .set_message_attribute_names(Some(request.message_attribute_names))
            .set_message_system_attribute_names(system_attribute_names(
                request.message_system_attribute_names,
            ))
            .send()
            .await
            .map_err(|e| queue_error(e, &request.queue_url))?;

        Ok(ReceiveMessageResponse {
            messages: output.messages().iter().map(from_sdk_message).collect(),
        })
    }

    async fn delete_message(&self, request: DeleteMessageRequest) -> Result<(), QueueServiceError> {
        self.client
            .delete_message()
            .queue_url(&request.queue_url)
            .receipt_handle(&request.receipt_handle)
            .send()
            .await
            .map_err(|e| queue_error(e, &request.receipt_handle))?;
        Ok(())
    }

    async fn delete_message_batch(
        &self,
        request: DeleteMessageBatchRequest,
    ) -> Result<DeleteMessageBatchResponse, QueueServiceError> {
        let entries = request
            .entries
            .into_iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .map_err(invalid_queue_request)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&request.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| queue_error(e, &request.queue_url))?;

        Ok(DeleteMessageBatchResponse {
            successful: output
                .successful()
                .iter()
                .map(|entry| entry.id().to_string())
                .collect(),
            failed: output.failed().iter().map(from_sdk_batch_error).collect(),
        })
    }
}

// ============================================================================
// S3BlobStore
// ============================================================================

/// Blob store backed by Amazon S3
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError> {
        let content_length = body.len() as i64;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .content_length(content_length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| blob_error(e, bucket, key))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| blob_error(e, bucket, key))?;

        let content = output
            .body
            .collect()
            .await
            .map_err(|e| BlobStoreError::ConnectionFailed {
                message: format!("failed to read {}/{}: {}", bucket, key, e),
            })?;
        Ok(content.into_bytes())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BlobStoreError> {
        for chunk in keys.chunks(MAX_DELETE_OBJECTS) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| BlobStoreError::ServiceError {
                    code: "InvalidRequest".to_string(),
                    message: e.to_string(),
                })?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| BlobStoreError::ServiceError {
                    code: "InvalidRequest".to_string(),
                    message: e.to_string(),
                })?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| blob_error(e, bucket, &chunk.join(",")))?;

            if let Some(failure) = output.errors().first() {
                return Err(classify_blob_error(
                    failure.code().unwrap_or("Unknown"),
                    failure.message().unwrap_or_default().to_string(),
                    bucket,
                    failure.key().unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }
}

/// Creates an [`S3BlobStore`] from the default AWS configuration chain
#[derive(Debug, Clone, Default)]
pub struct S3BlobStoreFactory {
    region: Option<String>,
}

impl S3BlobStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the region resolved from the environment
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[async_trait]
impl BlobStoreFactory for S3BlobStoreFactory {
    async fn create(&self) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let config = loader.load().await;

        info!(
            region = ?config.region().map(|r| r.as_ref().to_string()),
            "Created S3 client for offloaded payloads"
        );
        Ok(Arc::new(S3BlobStore::new(aws_sdk_s3::Client::new(&config))))
    }
}
