//! Tests for offload configuration.

use super::*;
use crate::message::MessageAttributeValue;
use std::io::Write;

mod offload_config {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OffloadConfig::default();

        assert_eq!(config.bucket_name(), None);
        assert!(!config.is_offload_enabled());
        assert_eq!(config.message_size_threshold(), 262_144);
        assert!(!config.always_offload());
    }

    #[test]
    fn test_set_bucket_enables_offload() {
        let mut config = OffloadConfig::new();
        config.set_bucket_name("payloads").unwrap();

        assert!(config.is_offload_enabled());
        assert_eq!(config.bucket_name(), Some("payloads"));
    }

    #[test]
    fn test_invalid_bucket_names_rejected() {
        let mut config = OffloadConfig::new();

        assert!(matches!(
            config.set_bucket_name(""),
            Err(ConfigurationError::InvalidBucketName { .. })
        ));
        assert!(matches!(
            config.set_bucket_name("a-..s3Key..-b"),
            Err(ConfigurationError::InvalidBucketName { .. })
        ));
        assert!(!config.is_offload_enabled());
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = OffloadConfig::new();

        assert!(config.set_message_size_threshold(0).is_ok());
        assert_eq!(config.message_size_threshold(), 0);
        assert!(config.set_message_size_threshold(262_144).is_ok());

        assert_eq!(
            config.set_message_size_threshold(262_145),
            Err(ConfigurationError::ThresholdOutOfRange {
                value: 262_145,
                max: 262_144,
            })
        );
        assert_eq!(config.message_size_threshold(), 262_144);
    }

    #[test]
    fn test_reset_threshold() {
        let mut config = OffloadConfig::new();
        config.set_message_size_threshold(10).unwrap();
        config.reset_message_size_threshold();

        assert_eq!(config.message_size_threshold(), 262_144);
    }

    #[test]
    fn test_always_offload_requires_bucket() {
        let mut config = OffloadConfig::new();

        assert_eq!(
            config.set_always_offload(true),
            Err(ConfigurationError::AlwaysOffloadWithoutBucket)
        );
        assert!(config.set_always_offload(false).is_ok());

        config.set_bucket_name("payloads").unwrap();
        assert!(config.set_always_offload(true).is_ok());
        assert!(config.always_offload());
    }

    #[test]
    fn test_clearing_bucket_clears_always_offload() {
        let mut config = OffloadConfig::new();
        config.set_bucket_name("payloads").unwrap();
        config.set_always_offload(true).unwrap();

        config.clear_bucket_name();

        assert!(!config.is_offload_enabled());
        assert!(!config.always_offload());
    }
}

mod offload_target {
    use super::*;

    fn enabled_config(threshold: usize) -> OffloadConfig {
        let mut config = OffloadConfig::new();
        config.set_bucket_name("b").unwrap();
        config.set_message_size_threshold(threshold).unwrap();
        config
    }

    #[test]
    fn test_disabled_never_offloads() {
        let mut config = OffloadConfig::new();
        config.set_message_size_threshold(0).unwrap();

        assert_eq!(config.offload_target(&MessageAttributes::new(), "large"), None);
    }

    #[test]
    fn test_small_message_stays_inline() {
        let config = enabled_config(100);
        let body = "x".repeat(50);

        assert_eq!(config.offload_target(&MessageAttributes::new(), &body), None);
    }

    #[test]
    fn test_large_message_is_offloaded() {
        let config = enabled_config(100);
        let body = "x".repeat(200);

        assert_eq!(config.offload_target(&MessageAttributes::new(), &body), Some("b"));
    }

    #[test]
    fn test_attributes_count_towards_size() {
        let config = enabled_config(100);
        let mut attributes = MessageAttributes::new();
        attributes.insert("padding".to_string(), MessageAttributeValue::string("y".repeat(60)));
        let body = "x".repeat(50);

        assert_eq!(config.offload_target(&attributes, &body), Some("b"));
    }

    #[test]
    fn test_always_offload_ignores_size() {
        let mut config = enabled_config(100);
        config.set_always_offload(true).unwrap();

        assert_eq!(config.offload_target(&MessageAttributes::new(), "hi"), Some("b"));
    }
}

mod settings {
    use super::*;

    #[test]
    fn test_default_settings_match_default_config() {
        let config = OffloadSettings::default().into_config().unwrap();
        assert_eq!(config, OffloadConfig::default());
    }

    #[test]
    fn test_into_config_validates() {
        let settings = OffloadSettings {
            bucket_name: None,
            message_size_threshold: 100,
            always_through_blob_store: true,
        };
        assert_eq!(
            settings.into_config(),
            Err(ConfigurationError::AlwaysOffloadWithoutBucket)
        );

        let settings = OffloadSettings {
            bucket_name: Some("payloads".to_string()),
            message_size_threshold: 1_000_000,
            always_through_blob_store: false,
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigurationError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_settings_round_trip_through_config() {
        let settings = OffloadSettings {
            bucket_name: Some("payloads".to_string()),
            message_size_threshold: 1024,
            always_through_blob_store: true,
        };

        let config = settings.clone().into_config().unwrap();
        assert_eq!(OffloadSettings::from(&config), settings);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "bucket_name: payloads").unwrap();
        writeln!(file, "message_size_threshold: 2048").unwrap();
        writeln!(file, "always_through_blob_store: true").unwrap();

        let settings = OffloadSettings::load(Some(file.path())).unwrap();

        assert_eq!(settings.bucket_name.as_deref(), Some("payloads"));
        assert_eq!(settings.message_size_threshold, 2048);
        assert!(settings.always_through_blob_store);
    }

    #[test]
    fn test_load_applies_serde_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "bucket_name = \"payloads\"").unwrap();

        let settings = OffloadSettings::load(Some(file.path())).unwrap();

        assert_eq!(settings.bucket_name.as_deref(), Some("payloads"));
        assert_eq!(settings.message_size_threshold, 262_144);
        assert!(!settings.always_through_blob_store);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = OffloadSettings::load(Some(Path::new("/nonexistent/offload.yaml")));
        assert!(matches!(result, Err(ConfigurationError::Parsing { .. })));
    }
}
