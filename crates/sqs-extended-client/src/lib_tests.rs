//! Tests for crate-level wire constants.

use super::*;

/// Verify the literals shared with other implementations of the protocol.
#[test]
fn test_wire_literals() {
    assert_eq!(RESERVED_ATTRIBUTE_NAME, "SQSLargePayloadSize");
    assert_eq!(
        MESSAGE_POINTER_CLASS,
        "com.amazon.sqs.javamessaging.MessageS3Pointer"
    );
    assert_eq!(S3_BUCKET_NAME_MARKER, "-..s3BucketName..-");
    assert_eq!(S3_KEY_MARKER, "-..s3Key..-");
}

#[test]
fn test_default_threshold_is_queue_maximum() {
    assert_eq!(MAX_MESSAGE_SIZE_THRESHOLD, 256 * 1024);
    assert_eq!(
        OffloadConfig::default().message_size_threshold(),
        MAX_MESSAGE_SIZE_THRESHOLD
    );
}
