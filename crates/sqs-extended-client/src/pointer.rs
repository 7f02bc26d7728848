//! Pointer record and extended receipt handle codecs.
//!
//! Both formats are shared with every other implementation of the protocol
//! and must stay byte-for-byte compatible:
//!
//! - Pointer body: `["<type tag>",{"s3BucketName":"<bucket>","s3Key":"<key>"}]`
//! - Extended receipt handle:
//!   `-..s3BucketName..-<bucket>-..s3BucketName..--..s3Key..-<key>-..s3Key..-<handle>`

use crate::{MESSAGE_POINTER_CLASS, S3_BUCKET_NAME_MARKER, S3_KEY_MARKER};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// Pointer Record
// ============================================================================

/// Location of an offloaded message body in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessagePointer {
    #[serde(rename = "s3BucketName")]
    pub bucket_name: String,
    #[serde(rename = "s3Key")]
    pub key: String,
}

/// Accepted wire forms of the pointer record
#[derive(Deserialize)]
#[serde(untagged)]
enum PointerRecord {
    /// Canonical two-element array with the type tag first
    Tagged(String, MessagePointer),
    /// Older single-key object form keyed by the type tag
    Legacy(HashMap<String, MessagePointer>),
}

impl MessagePointer {
    /// Create new pointer to a blob
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            key: key.into(),
        }
    }

    /// Encode as the compact tagged-array message body
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&(MESSAGE_POINTER_CLASS, self))
    }

    /// Decode a message body into a pointer
    ///
    /// Returns `None` when the body is not a pointer record: invalid JSON, the
    /// wrong shape, or a type tag other than [`MESSAGE_POINTER_CLASS`]. Both the
    /// canonical tagged array and the legacy single-key object are accepted.
    pub fn from_json(body: &str) -> Option<Self> {
        match serde_json::from_str::<PointerRecord>(body).ok()? {
            PointerRecord::Tagged(tag, pointer) if tag == MESSAGE_POINTER_CLASS => Some(pointer),
            PointerRecord::Legacy(mut record) if record.len() == 1 => {
                record.remove(MESSAGE_POINTER_CLASS)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Extended Receipt Handle
// ============================================================================

/// Receipt handle carrying the location of the offloaded body it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedReceiptHandle {
    pub pointer: MessagePointer,
    /// Receipt handle issued by the queue service
    pub receipt_handle: String,
}

fn receipt_handle_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let bucket_marker = regex::escape(S3_BUCKET_NAME_MARKER);
            let key_marker = regex::escape(S3_KEY_MARKER);
            let pattern = format!(
                "(?s)^{bucket_marker}(.*?){bucket_marker}{key_marker}(.*?){key_marker}(.*)$"
            );
            Regex::new(&pattern).ok()
        })
        .as_ref()
}

impl ExtendedReceiptHandle {
    /// Wrap a queue receipt handle with the blob location
    pub fn new(pointer: MessagePointer, receipt_handle: impl Into<String>) -> Self {
        Self {
            pointer,
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Decode an extended receipt handle
    ///
    /// Returns `None` for plain receipt handles, i.e. anything that does not
    /// start with the bucket marker and follow the full delimiter grammar.
    pub fn parse(handle: &str) -> Option<Self> {
        if !handle.starts_with(S3_BUCKET_NAME_MARKER) {
            return None;
        }

        let captures = receipt_handle_pattern()?.captures(handle)?;
        Some(Self {
            pointer: MessagePointer::new(&captures[1], &captures[2]),
            receipt_handle: captures[3].to_string(),
        })
    }
}

impl fmt::Display for ExtendedReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{marker}{bucket}{marker}{key_marker}{key}{key_marker}{handle}",
            marker = S3_BUCKET_NAME_MARKER,
            bucket = self.pointer.bucket_name,
            key_marker = S3_KEY_MARKER,
            key = self.pointer.key,
            handle = self.receipt_handle
        )
    }
}

#[cfg(test)]
#[path = "pointer_tests.rs"]
mod tests;
