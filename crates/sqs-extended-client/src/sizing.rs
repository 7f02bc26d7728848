//! Message size evaluation.
//!
//! The size of a message is the byte length of its body plus, for every
//! attribute, the byte lengths of its name, declared data type, string value
//! and binary value. This matches how the queue service accounts for message
//! size against its limit.

use crate::message::{MessageAttributeValue, MessageAttributes};

/// Total encoded size of a message in bytes
pub fn message_size(attributes: &MessageAttributes, body: &str) -> usize {
    let attributes_size: usize = attributes
        .iter()
        .map(|(name, value)| name.len() + attribute_value_size(value))
        .sum();

    attributes_size + body.len()
}

/// Check whether a message is strictly larger than the threshold
pub fn is_large(attributes: &MessageAttributes, body: &str, threshold: usize) -> bool {
    message_size(attributes, body) > threshold
}

fn attribute_value_size(value: &MessageAttributeValue) -> usize {
    value.data_type.len()
        + value.string_value.as_ref().map_or(0, String::len)
        + value.binary_value.as_ref().map_or(0, |b| b.len())
}

#[cfg(test)]
#[path = "sizing_tests.rs"]
mod tests;
