// Logging tests
//
// These tests verify the tracing subscriber setup used by the CLI.

use inkstamp::logging::{init_subscriber, LogFormat, LoggingConfig};

/// Test: Can initialize tracing subscriber
///
/// The subscriber is installed once per process. Every later call, with any
/// config, must return Ok instead of failing on the duplicate install.
#[test]
fn test_can_initialize_tracing_subscriber() {
    // Scenario 1: First initialization succeeds
    let result = init_subscriber(&LoggingConfig::default());
    assert!(
        result.is_ok(),
        "Tracing subscriber initialization should succeed, got error: {:?}",
        result.err()
    );

    // Scenario 2: Re-initialization is a no-op, even with a different format
    let json = LoggingConfig {
        format: LogFormat::Json,
        level: "debug".to_string(),
    };
    assert!(init_subscriber(&json).is_ok());

    // Scenario 3: Events can be emitted after initialization
    tracing::info!(component = "logging_tests", "subscriber ready");
    tracing::debug!(width = 10, height = 20, "structured fields");
}

/// Test: Logging section parses from YAML with defaults
#[test]
fn test_logging_config_yaml_defaults() {
    let config: LoggingConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level, "info");

    let config: LoggingConfig = serde_yaml::from_str("format: json").unwrap();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "info");
}

/// Test: Filter directives are validated up front
#[test]
fn test_logging_level_validation() {
    for level in ["info", "warn", "inkstamp=debug,reqwest=warn", "trace"] {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            level: level.to_string(),
        };
        assert!(config.validate().is_ok(), "level '{}' should be valid", level);
    }
}
