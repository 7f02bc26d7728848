//! Integration tests for batch send, receive and delete
//!
//! These tests verify:
//! - Entry order survives concurrent offload and retrieval
//! - Blob operations of one batch run concurrently
//! - Batch deletes issue one blob delete per bucket and keep entry ids

mod common;

use common::{payload, Deployment, BUCKET, QUEUE_URL};
use sqs_extended_client::providers::{BlobOperation, InMemoryBlobStore};
use sqs_extended_client::{
    DeleteMessageBatchEntry, DeleteMessageBatchRequest, MessageAttributeValue,
    ReceiveMessageRequest, SendMessageBatchEntry, SendMessageBatchRequest,
};
use std::time::Duration;

fn mixed_entries() -> Vec<SendMessageBatchEntry> {
    vec![
        SendMessageBatchEntry::new("first", payload('A', 300)),
        SendMessageBatchEntry::new("second", "inline"),
        SendMessageBatchEntry::new("third", payload('C', 150))
            .with_attribute("priority", MessageAttributeValue::number(1)),
        SendMessageBatchEntry::new("fourth", payload('D', 1000)),
    ]
}

/// Verify that a mixed batch is delivered intact and in order
#[tokio::test]
async fn test_mixed_batch_round_trip() {
    // Arrange
    let deployment = Deployment::new(100);
    let expected: Vec<String> = mixed_entries()
        .into_iter()
        .map(|e| e.message_body)
        .collect();

    // Act
    let sent = deployment
        .producer
        .send_message_batch(SendMessageBatchRequest::new(QUEUE_URL, mixed_entries()))
        .await
        .expect("batch send should succeed");

    let received = deployment
        .consumer
        .receive_message(
            ReceiveMessageRequest::new(QUEUE_URL)
                .with_max_number_of_messages(10)
                .with_message_attribute_name("priority"),
        )
        .await
        .expect("batch receive should succeed");

    // Assert
    let ids: Vec<&str> = sent.successful.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third", "fourth"]);
    assert_eq!(deployment.blob_store.object_count(), 3);

    let bodies: Vec<String> = received.messages.iter().map(|m| m.body.clone()).collect();
    assert_eq!(bodies, expected);
    assert_eq!(
        received.messages[2].message_attributes.get("priority"),
        Some(&MessageAttributeValue::number(1))
    );
}

/// Verify that offload writes of one batch overlap instead of running in sequence
#[tokio::test(start_paused = true)]
async fn test_batch_offload_runs_concurrently() {
    let deployment = Deployment::with_blob_store(
        100,
        InMemoryBlobStore::new().with_latency(Duration::from_millis(200)),
    );
    let entries = (0..10)
        .map(|i| SendMessageBatchEntry::new(i.to_string(), payload('x', 500 + i)))
        .collect();
    let start = tokio::time::Instant::now();

    deployment
        .producer
        .send_message_batch(SendMessageBatchRequest::new(QUEUE_URL, entries))
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_millis(400));
    assert_eq!(deployment.blob_store.object_count(), 10);

    // Output order still follows input order
    let received = deployment
        .consumer
        .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_max_number_of_messages(10))
        .await
        .unwrap();
    let sizes: Vec<usize> = received.messages.iter().map(|m| m.body.len()).collect();
    assert_eq!(sizes, (0..10).map(|i| 500 + i).collect::<Vec<_>>());
}

/// Verify that a batch delete issues one blob delete and keeps entry ids
#[tokio::test]
async fn test_batch_delete_groups_blobs() {
    let deployment = Deployment::new(100);
    deployment
        .producer
        .send_message_batch(SendMessageBatchRequest::new(QUEUE_URL, mixed_entries()))
        .await
        .unwrap();
    let messages = deployment
        .consumer
        .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_max_number_of_messages(10))
        .await
        .unwrap()
        .messages;

    let entries = messages
        .iter()
        .map(|m| DeleteMessageBatchEntry::new(format!("del-{}", m.message_id), m.receipt_handle.clone()))
        .collect();
    let response = deployment
        .consumer
        .delete_message_batch(DeleteMessageBatchRequest::new(QUEUE_URL, entries))
        .await
        .unwrap();

    let expected_ids: Vec<String> = messages
        .iter()
        .map(|m| format!("del-{}", m.message_id))
        .collect();
    assert_eq!(response.successful, expected_ids);
    assert!(response.failed.is_empty());
    assert_eq!(deployment.blob_store.object_count(), 0);

    let blob_deletes: Vec<BlobOperation> = deployment
        .blob_store
        .operations()
        .into_iter()
        .filter(|op| matches!(op, BlobOperation::DeleteObjects { .. }))
        .collect();
    assert_eq!(blob_deletes.len(), 1);
    match &blob_deletes[0] {
        BlobOperation::DeleteObjects { bucket, keys } => {
            assert_eq!(bucket, BUCKET);
            assert_eq!(keys.len(), 3);
        }
        other => panic!("unexpected operation {:?}", other),
    }
}

/// Verify that per-entry queue failures are reported alongside successes
#[tokio::test]
async fn test_batch_delete_reports_stale_entries() {
    let deployment = Deployment::new(100);
    deployment
        .producer
        .send_message_batch(SendMessageBatchRequest::new(
            QUEUE_URL,
            vec![SendMessageBatchEntry::new("only", payload('Z', 400))],
        ))
        .await
        .unwrap();
    let queue = deployment.consumer.queue(QUEUE_URL);
    let messages = queue.receive(10).await.unwrap();

    let first = queue.delete_batch(&messages).await.unwrap();
    let second = queue.delete_batch(&messages).await.unwrap();

    assert_eq!(first.successful, vec!["0".to_string()]);
    assert!(second.successful.is_empty());
    assert_eq!(second.failed.len(), 1);
    assert_eq!(second.failed[0].id, "0");
    assert!(second.failed[0].sender_fault);
}
