//! Message types and queue service request/response shapes.
//!
//! These mirror the queue service API closely: the offload layer only ever
//! rewrites message bodies, message attributes, receipt handles and the
//! attribute-name filter of receive requests. Every other field passes through
//! untouched.

use bytes::Bytes;
use std::collections::HashMap;

// ============================================================================
// Message Attributes
// ============================================================================

/// Message attributes keyed by attribute name
pub type MessageAttributes = HashMap<String, MessageAttributeValue>;

/// Typed value of a single message attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttributeValue {
    /// Declared data type (`String`, `Number`, `Binary`, or a custom `Type.label`)
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Bytes>,
}

impl MessageAttributeValue {
    /// Create a `String` attribute
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    /// Create a `Number` attribute; the queue service carries numbers as strings
    pub fn number(value: impl ToString) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: Some(value.to_string()),
            binary_value: None,
        }
    }

    /// Create a `Binary` attribute
    pub fn binary(value: impl Into<Bytes>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            string_value: None,
            binary_value: Some(value.into()),
        }
    }
}

// ============================================================================
// Received Messages
// ============================================================================

/// A message taken from the queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub message_id: String,
    /// Token used to delete the message; extended when the body was offloaded
    pub receipt_handle: String,
    pub body: String,
    pub message_attributes: MessageAttributes,
    /// System attributes reported by the queue service
    pub attributes: HashMap<String, String>,
}

// ============================================================================
// Send
// ============================================================================

/// Request to send a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub message_body: String,
    pub message_attributes: MessageAttributes,
    pub delay_seconds: Option<i32>,
    pub message_group_id: Option<String>,
    pub message_deduplication_id: Option<String>,
}

impl SendMessageRequest {
    /// Create new send request with body
    pub fn new(queue_url: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            message_body: message_body.into(),
            message_attributes: MessageAttributes::new(),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
        }
    }

    /// Add message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    /// Delay delivery of the message
    pub fn with_delay_seconds(mut self, delay_seconds: i32) -> Self {
        self.delay_seconds = Some(delay_seconds);
        self
    }

    /// Set message group for FIFO queues
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }

    /// Set deduplication ID for FIFO queues
    pub fn with_deduplication_id(mut self, deduplication_id: impl Into<String>) -> Self {
        self.message_deduplication_id = Some(deduplication_id.into());
        self
    }
}

/// Result of sending a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageResponse {
    pub message_id: String,
    pub sequence_number: Option<String>,
}

/// One entry of a batch send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchEntry {
    /// Caller-chosen identifier, unique within the batch
    pub id: String,
    pub message_body: String,
    pub message_attributes: MessageAttributes,
    pub delay_seconds: Option<i32>,
    pub message_group_id: Option<String>,
    pub message_deduplication_id: Option<String>,
}

impl SendMessageBatchEntry {
    /// Create new batch entry with body
    pub fn new(id: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_body: message_body.into(),
            message_attributes: MessageAttributes::new(),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
        }
    }

    /// Add message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    /// Set message group for FIFO queues
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }
}

/// Request to send several messages at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchRequest {
    pub queue_url: String,
    pub entries: Vec<SendMessageBatchEntry>,
}

impl SendMessageBatchRequest {
    pub fn new(queue_url: impl Into<String>, entries: Vec<SendMessageBatchEntry>) -> Self {
        Self {
            queue_url: queue_url.into(),
            entries,
        }
    }
}

/// Successful entry of a batch send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchResultEntry {
    pub id: String,
    pub message_id: String,
    pub sequence_number: Option<String>,
}

/// Failed entry of a batch send or delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResultErrorEntry {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    /// True when the failure was caused by the request rather than the service
    pub sender_fault: bool,
}

/// Result of a batch send
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendMessageBatchResponse {
    pub successful: Vec<SendMessageBatchResultEntry>,
    pub failed: Vec<BatchResultErrorEntry>,
}

// ============================================================================
// Receive
// ============================================================================

/// Request to receive messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveMessageRequest {
    pub queue_url: String,
    pub max_number_of_messages: Option<i32>,
    pub wait_time_seconds: Option<i32>,
    pub visibility_timeout: Option<i32>,
    /// Message attributes to return; `All` or `.*` selects every attribute
    pub message_attribute_names: Vec<String>,
    /// System attributes to return, e.g. `ApproximateReceiveCount` or `All`
    pub message_system_attribute_names: Vec<String>,
}

impl ReceiveMessageRequest {
    /// Create new receive request for a queue
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_number_of_messages: None,
            wait_time_seconds: None,
            visibility_timeout: None,
            message_attribute_names: Vec::new(),
            message_system_attribute_names: Vec::new(),
        }
    }

    /// Set maximum number of messages to receive
    pub fn with_max_number_of_messages(mut self, max: i32) -> Self {
        self.max_number_of_messages = Some(max);
        self
    }

    /// Set long-polling wait time
    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    /// Set visibility timeout for received messages
    pub fn with_visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    /// Request a message attribute by name or name pattern
    pub fn with_message_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.message_attribute_names.push(name.into());
        self
    }

    /// Request a system attribute by name, or `All`
    pub fn with_message_system_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.message_system_attribute_names.push(name.into());
        self
    }

    /// Check whether the system attribute filter selects the named attribute
    pub fn requests_system_attribute(&self, name: &str) -> bool {
        self.message_system_attribute_names
            .iter()
            .any(|requested| requested == "All" || requested == name)
    }

    /// Check whether the attribute filter selects the named attribute
    ///
    /// Honors the queue service filter forms: exact names, `All`, `.*`, and
    /// prefix patterns such as `Orders.*`.
    pub fn requests_attribute(&self, name: &str) -> bool {
        self.message_attribute_names
            .iter()
            .any(|requested| attribute_filter_matches(requested, name))
    }
}

/// Match a single attribute-name filter entry against an attribute name
pub(crate) fn attribute_filter_matches(filter: &str, name: &str) -> bool {
    if filter == "All" || filter == ".*" || filter == name {
        return true;
    }

    // `Orders.*` selects `Orders.Region` but not `OrdersRegion`
    match filter.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('.') => name.starts_with(prefix),
        _ => false,
    }
}

/// Result of a receive
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiveMessageResponse {
    pub messages: Vec<Message>,
}

// ============================================================================
// Delete
// ============================================================================

/// Request to delete a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessageRequest {
    pub queue_url: String,
    pub receipt_handle: String,
}

impl DeleteMessageRequest {
    pub fn new(queue_url: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// One entry of a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessageBatchEntry {
    pub id: String,
    pub receipt_handle: String,
}

impl DeleteMessageBatchEntry {
    pub fn new(id: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// Request to delete several messages at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessageBatchRequest {
    pub queue_url: String,
    pub entries: Vec<DeleteMessageBatchEntry>,
}

impl DeleteMessageBatchRequest {
    pub fn new(queue_url: impl Into<String>, entries: Vec<DeleteMessageBatchEntry>) -> Self {
        Self {
            queue_url: queue_url.into(),
            entries,
        }
    }
}

/// Result of a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteMessageBatchResponse {
    /// Identifiers of the entries that were deleted
    pub successful: Vec<String>,
    pub failed: Vec<BatchResultErrorEntry>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
