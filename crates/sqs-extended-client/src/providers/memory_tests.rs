//! Tests for in-memory collaborators.

use super::*;
use crate::message::{DeleteMessageBatchEntry, MessageAttributeValue, SendMessageBatchEntry};

const QUEUE_URL: &str = "https://queue.local/test-queue";

mod queue_service {
    use super::*;

    /// Verify that sent messages are received in FIFO order.
    #[tokio::test]
    async fn test_send_then_receive_in_order() {
        let service = InMemoryQueueService::new();
        for body in ["first", "second", "third"] {
            service
                .send_message(SendMessageRequest::new(QUEUE_URL, body))
                .await
                .unwrap();
        }

        let response = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_max_number_of_messages(10))
            .await
            .unwrap();

        let bodies: Vec<&str> = response.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert_eq!(service.in_flight_count(), 3);
    }

    /// Verify that receive defaults to a single message.
    #[tokio::test]
    async fn test_receive_defaults_to_one_message() {
        let service = InMemoryQueueService::new();
        for body in ["a", "b"] {
            service
                .send_message(SendMessageRequest::new(QUEUE_URL, body))
                .await
                .unwrap();
        }

        let response = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL))
            .await
            .unwrap();

        assert_eq!(response.messages.len(), 1);
        assert_eq!(service.visible_messages(QUEUE_URL).len(), 1);
    }

    /// Verify that receiving from an unknown queue yields no messages.
    #[tokio::test]
    async fn test_receive_from_empty_queue() {
        let service = InMemoryQueueService::new();

        let response = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL))
            .await
            .unwrap();

        assert!(response.messages.is_empty());
    }

    /// Verify that only requested message attributes are returned.
    #[tokio::test]
    async fn test_attribute_filtering() {
        let service = InMemoryQueueService::new();
        service
            .send_message(
                SendMessageRequest::new(QUEUE_URL, "body")
                    .with_attribute("keep", MessageAttributeValue::string("1"))
                    .with_attribute("drop", MessageAttributeValue::string("2")),
            )
            .await
            .unwrap();
        service
            .send_message(
                SendMessageRequest::new(QUEUE_URL, "body")
                    .with_attribute("keep", MessageAttributeValue::string("1")),
            )
            .await
            .unwrap();

        let filtered = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_message_attribute_name("keep"))
            .await
            .unwrap();
        let attributes = &filtered.messages[0].message_attributes;
        assert!(attributes.contains_key("keep"));
        assert!(!attributes.contains_key("drop"));

        let unfiltered = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL))
            .await
            .unwrap();
        assert!(unfiltered.messages[0].message_attributes.is_empty());
    }

    /// Verify that delete removes in-flight messages and rejects unknown handles.
    #[tokio::test]
    async fn test_delete_message() {
        let service = InMemoryQueueService::new();
        service
            .send_message(SendMessageRequest::new(QUEUE_URL, "body"))
            .await
            .unwrap();
        let received = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL))
            .await
            .unwrap();
        let receipt = received.messages[0].receipt_handle.clone();

        service
            .delete_message(DeleteMessageRequest::new(QUEUE_URL, &receipt))
            .await
            .unwrap();
        assert_eq!(service.in_flight_count(), 0);
        assert_eq!(service.deleted_receipt_handles(), vec![receipt.clone()]);

        let again = service
            .delete_message(DeleteMessageRequest::new(QUEUE_URL, &receipt))
            .await;
        assert!(matches!(
            again,
            Err(QueueServiceError::InvalidReceiptHandle { .. })
        ));
    }

    /// Verify that batch operations report per-entry results.
    #[tokio::test]
    async fn test_batch_send_and_delete() {
        let service = InMemoryQueueService::new();
        let sent = service
            .send_message_batch(SendMessageBatchRequest::new(
                QUEUE_URL,
                vec![
                    SendMessageBatchEntry::new("a", "one"),
                    SendMessageBatchEntry::new("b", "two"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(sent.successful.len(), 2);
        assert_eq!(sent.successful[0].id, "a");
        assert_eq!(sent.successful[1].id, "b");

        let received = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_max_number_of_messages(2))
            .await
            .unwrap();

        let deleted = service
            .delete_message_batch(DeleteMessageBatchRequest::new(
                QUEUE_URL,
                vec![
                    DeleteMessageBatchEntry::new("x", &received.messages[0].receipt_handle),
                    DeleteMessageBatchEntry::new("y", "not-a-receipt"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(deleted.successful, vec!["x".to_string()]);
        assert_eq!(deleted.failed.len(), 1);
        assert_eq!(deleted.failed[0].id, "y");
        assert!(deleted.failed[0].sender_fault);
    }

    /// Verify that expiring visibility makes messages receivable again in order.
    #[tokio::test]
    async fn test_expire_visibility_redelivers() {
        let service = InMemoryQueueService::new();
        for body in ["first", "second", "third"] {
            service
                .send_message(SendMessageRequest::new(QUEUE_URL, body))
                .await
                .unwrap();
        }
        service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL).with_max_number_of_messages(2))
            .await
            .unwrap();

        assert_eq!(service.expire_visibility(QUEUE_URL), 2);

        let redelivered = service
            .receive_message(
                ReceiveMessageRequest::new(QUEUE_URL)
                    .with_max_number_of_messages(10)
                    .with_message_system_attribute_name("All"),
            )
            .await
            .unwrap();
        let bodies: Vec<&str> = redelivered.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert_eq!(
            redelivered.messages[0].attributes.get("ApproximateReceiveCount"),
            Some(&"2".to_string())
        );
    }

    #[tokio::test]
    async fn test_system_attributes_only_when_requested() {
        let service = InMemoryQueueService::new();
        for body in ["first", "second"] {
            service
                .send_message(SendMessageRequest::new(QUEUE_URL, body))
                .await
                .unwrap();
        }

        let plain = service
            .receive_message(ReceiveMessageRequest::new(QUEUE_URL))
            .await
            .unwrap();
        let counted = service
            .receive_message(
                ReceiveMessageRequest::new(QUEUE_URL)
                    .with_message_system_attribute_name("ApproximateReceiveCount"),
            )
            .await
            .unwrap();

        assert!(plain.messages[0].attributes.is_empty());
        assert_eq!(
            counted.messages[0].attributes.get("ApproximateReceiveCount"),
            Some(&"1".to_string())
        );
    }
}

mod blob_store {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = InMemoryBlobStore::new();
        store
            .put_object("bucket", "key", Bytes::from("payload"))
            .await
            .unwrap();

        let body = store.get_object("bucket", "key").await.unwrap();
        assert_eq!(body, Bytes::from("payload"));
        assert_eq!(
            store.operations(),
            vec![
                BlobOperation::Put {
                    bucket: "bucket".to_string(),
                    key: "key".to_string(),
                    size: 7,
                },
                BlobOperation::Get {
                    bucket: "bucket".to_string(),
                    key: "key".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let store = InMemoryBlobStore::new();

        let result = store.get_object("bucket", "missing").await;
        assert!(matches!(result, Err(BlobStoreError::ObjectNotFound { .. })));
    }

    /// Verify that deleting missing keys is not an error (quiet semantics).
    #[tokio::test]
    async fn test_delete_is_quiet_and_idempotent() {
        let store = InMemoryBlobStore::new();
        store.insert_object("bucket", "key", "payload");
        let keys = vec!["key".to_string(), "never-existed".to_string()];

        store.delete_objects("bucket", &keys).await.unwrap();
        store.delete_objects("bucket", &keys).await.unwrap();

        assert_eq!(store.object("bucket", "key"), None);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = InMemoryBlobStore::new();
        store.set_unavailable(true);

        let put = store.put_object("b", "k", Bytes::from("x")).await;
        let get = store.get_object("b", "k").await;
        let delete = store.delete_objects("b", &["k".to_string()]).await;

        assert!(matches!(put, Err(BlobStoreError::ConnectionFailed { .. })));
        assert!(matches!(get, Err(BlobStoreError::ConnectionFailed { .. })));
        assert!(matches!(delete, Err(BlobStoreError::ConnectionFailed { .. })));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let store = InMemoryBlobStore::new();
        store.fail_puts_containing("poison");

        assert!(store.put_object("b", "ok", Bytes::from("fine")).await.is_ok());
        assert!(store
            .put_object("b", "bad", Bytes::from("a poison pill"))
            .await
            .is_err());
        assert_eq!(store.object_count(), 1);
    }
}
