//! Offload configuration.
//!
//! [`OffloadConfig`] is the validated per-client state: setters enforce every
//! invariant at the point of misconfiguration, before any network call.
//! [`OffloadSettings`] is the plain serde form loaded from files and the
//! environment, validated into an [`OffloadConfig`].

use crate::error::ConfigurationError;
use crate::message::MessageAttributes;
use crate::sizing;
use crate::{MAX_MESSAGE_SIZE_THRESHOLD, S3_BUCKET_NAME_MARKER, S3_KEY_MARKER};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for [`OffloadSettings::load`]
pub const ENVIRONMENT_PREFIX: &str = "SQS_EXTENDED";

// ============================================================================
// Validated Configuration
// ============================================================================

/// Per-client offload configuration
///
/// Offload is enabled iff a bucket name is set. `always_offload` can only be
/// enabled while a bucket name is set, and clearing the bucket name clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadConfig {
    bucket_name: Option<String>,
    message_size_threshold: usize,
    always_offload: bool,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            bucket_name: None,
            message_size_threshold: MAX_MESSAGE_SIZE_THRESHOLD,
            always_offload: false,
        }
    }
}

impl OffloadConfig {
    /// Create configuration with offload disabled and default threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket receiving offloaded bodies, if offload is enabled
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }

    pub fn message_size_threshold(&self) -> usize {
        self.message_size_threshold
    }

    pub fn always_offload(&self) -> bool {
        self.always_offload
    }

    /// Check if large payload support is enabled
    pub fn is_offload_enabled(&self) -> bool {
        self.bucket_name.is_some()
    }

    /// Enable offload into the given bucket
    pub fn set_bucket_name(&mut self, bucket_name: impl Into<String>) -> Result<(), ConfigurationError> {
        let bucket_name = bucket_name.into();
        validate_bucket_name(&bucket_name)?;
        self.bucket_name = Some(bucket_name);
        Ok(())
    }

    /// Disable offload
    pub fn clear_bucket_name(&mut self) {
        self.bucket_name = None;
        self.always_offload = false;
    }

    /// Set the size above which messages are offloaded
    pub fn set_message_size_threshold(&mut self, threshold: usize) -> Result<(), ConfigurationError> {
        if threshold > MAX_MESSAGE_SIZE_THRESHOLD {
            return Err(ConfigurationError::ThresholdOutOfRange {
                value: threshold,
                max: MAX_MESSAGE_SIZE_THRESHOLD,
            });
        }
        self.message_size_threshold = threshold;
        Ok(())
    }

    /// Restore the default threshold
    pub fn reset_message_size_threshold(&mut self) {
        self.message_size_threshold = MAX_MESSAGE_SIZE_THRESHOLD;
    }

    /// Offload every message regardless of size
    pub fn set_always_offload(&mut self, always_offload: bool) -> Result<(), ConfigurationError> {
        if always_offload && self.bucket_name.is_none() {
            return Err(ConfigurationError::AlwaysOffloadWithoutBucket);
        }
        self.always_offload = always_offload;
        Ok(())
    }

    /// Bucket to offload this message into, or `None` to send it inline
    pub fn offload_target(&self, attributes: &MessageAttributes, body: &str) -> Option<&str> {
        let bucket_name = self.bucket_name.as_deref()?;
        if self.always_offload || sizing::is_large(attributes, body, self.message_size_threshold) {
            Some(bucket_name)
        } else {
            None
        }
    }
}

fn validate_bucket_name(bucket_name: &str) -> Result<(), ConfigurationError> {
    if bucket_name.is_empty() {
        return Err(ConfigurationError::InvalidBucketName {
            message: "must not be empty".to_string(),
        });
    }

    // Receipt handles embedding this name must remain decodable
    if bucket_name.contains(S3_BUCKET_NAME_MARKER) || bucket_name.contains(S3_KEY_MARKER) {
        return Err(ConfigurationError::InvalidBucketName {
            message: "must not contain receipt handle markers".to_string(),
        });
    }

    Ok(())
}

// ============================================================================
// Loadable Settings
// ============================================================================

/// Offload settings as loaded from configuration sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadSettings {
    #[serde(default)]
    pub bucket_name: Option<String>,

    #[serde(default = "default_message_size_threshold")]
    pub message_size_threshold: usize,

    #[serde(default)]
    pub always_through_blob_store: bool,
}

fn default_message_size_threshold() -> usize {
    MAX_MESSAGE_SIZE_THRESHOLD
}

impl Default for OffloadSettings {
    fn default() -> Self {
        Self {
            bucket_name: None,
            message_size_threshold: MAX_MESSAGE_SIZE_THRESHOLD,
            always_through_blob_store: false,
        }
    }
}

impl OffloadSettings {
    /// Load settings from an optional file and `SQS_EXTENDED__*` environment variables
    ///
    /// Environment variables override file values, e.g.
    /// `SQS_EXTENDED__BUCKET_NAME=payloads`. The file format is derived from
    /// its extension (YAML, TOML or JSON).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(config::Environment::with_prefix(ENVIRONMENT_PREFIX).separator("__"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })
    }

    /// Validate into an offload configuration
    pub fn into_config(self) -> Result<OffloadConfig, ConfigurationError> {
        let mut config = OffloadConfig::new();
        if let Some(bucket_name) = self.bucket_name {
            config.set_bucket_name(bucket_name)?;
        }
        config.set_message_size_threshold(self.message_size_threshold)?;
        config.set_always_offload(self.always_through_blob_store)?;
        Ok(config)
    }
}

impl From<&OffloadConfig> for OffloadSettings {
    fn from(config: &OffloadConfig) -> Self {
        Self {
            bucket_name: config.bucket_name.clone(),
            message_size_threshold: config.message_size_threshold,
            always_through_blob_store: config.always_offload,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
