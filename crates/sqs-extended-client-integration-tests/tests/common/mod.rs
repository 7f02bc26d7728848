//! Common test utilities for extended client integration tests
//!
//! This module provides:
//! - A producer/consumer fixture sharing one in-memory queue and blob store
//! - A blob store factory that counts its invocations
//! - Opt-in tracing output controlled by `RUST_LOG`

use async_trait::async_trait;
use sqs_extended_client::providers::{InMemoryBlobStore, InMemoryQueueService};
use sqs_extended_client::{
    BlobStore, BlobStoreError, BlobStoreFactory, ExtendedClient, ExtendedClientBuilder,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/orders";
pub const BUCKET: &str = "order-payloads";

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "sqs_extended_client=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

// ============================================================================
// Fixture
// ============================================================================

/// A producer and a consumer sharing the same queue and blob store
#[allow(dead_code)]
pub struct Deployment {
    pub queue: Arc<InMemoryQueueService>,
    pub blob_store: Arc<InMemoryBlobStore>,
    pub producer: ExtendedClient,
    pub consumer: ExtendedClient,
}

impl Deployment {
    /// Producer offloading above `threshold`; consumer with offload disabled
    pub fn new(threshold: usize) -> Self {
        Self::with_blob_store(threshold, InMemoryBlobStore::new())
    }

    pub fn with_blob_store(threshold: usize, blob_store: InMemoryBlobStore) -> Self {
        init_tracing();

        let queue = Arc::new(InMemoryQueueService::new());
        let blob_store = Arc::new(blob_store);

        let producer = ExtendedClientBuilder::new(queue.clone())
            .with_blob_store(blob_store.clone())
            .with_bucket_name(BUCKET)
            .expect("valid bucket name")
            .with_message_size_threshold(threshold)
            .expect("valid threshold")
            .build();

        let consumer = ExtendedClientBuilder::new(queue.clone())
            .with_blob_store(blob_store.clone())
            .build();

        Self {
            queue,
            blob_store,
            producer,
            consumer,
        }
    }
}

/// Body of exactly `size` bytes that is easy to recognise in assertions
#[allow(dead_code)]
pub fn payload(tag: char, size: usize) -> String {
    std::iter::repeat(tag).take(size).collect()
}

// ============================================================================
// Counting Factory
// ============================================================================

/// Blob store factory recording how many times it ran
#[allow(dead_code)]
pub struct CountingFactory {
    pub store: Arc<InMemoryBlobStore>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingFactory {
    pub fn new(store: Arc<InMemoryBlobStore>) -> Self {
        Self {
            store,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStoreFactory for CountingFactory {
    async fn create(&self) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}
