// Configuration module tests

use std::io::Write;
use tempfile::NamedTempFile;

use inkstamp::config::*;
use inkstamp::logging::LogFormat;
use inkstamp::watermark::{Anchor, Color, TilePolicy, WatermarkKind};

#[test]
fn test_can_deserialize_full_yaml_config() {
    std::env::set_var("INKSTAMP_TEST_FULL_CONFIG_KEY", "env-secret");
    let yaml = r##"
logging:
  format: json
  level: warn
render:
  tiling:
    vertical_factor: 2.5
    horizontal_padding_factor: 0.5
    gap_divisor: 100.0
    min_spacing: 8.0
    max_tiles: 1000
  limits:
    max_file_size: 2097152
    max_pixels: 4000000
suggestions:
  api_key: ${INKSTAMP_TEST_FULL_CONFIG_KEY}
  endpoint: http://localhost:8080/v1beta
  model: gemini-test
  timeout_seconds: 10
  snapshot_max_edge: 256
  snapshot_quality: 80
watermark:
  kind: image
  image_scale: 25
  color: "#ff8800"
  opacity: 0.5
  font_size: 8
  rotation: 45
  tiled: true
  anchor: bc
  gap: 40
"##;
    let config = Config::from_yaml_with_env(yaml).unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(
        config.render.tiling,
        TilePolicy {
            vertical_factor: 2.5,
            horizontal_padding_factor: 0.5,
            gap_divisor: 100.0,
            min_spacing: 8.0,
            max_tiles: 1000,
        }
    );
    assert_eq!(config.render.limits.max_pixels, 4_000_000);
    assert_eq!(config.suggestions.api_key(), Some("env-secret"));
    assert_eq!(
        config.suggestions.request_url(),
        "http://localhost:8080/v1beta/models/gemini-test:generateContent"
    );
    assert_eq!(config.watermark.kind, WatermarkKind::Image);
    assert_eq!(config.watermark.color, Color::new(0xff, 0x88, 0x00));
    assert_eq!(config.watermark.anchor, Anchor::BottomCenter);
    assert!(config.watermark.watermark_image.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_validates_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"watermark:\n  font_size: 45\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = Config::load(Some(temp_file.path())).unwrap_err();
    assert!(err.contains("font_size"), "got: {}", err);
}

#[test]
fn test_invalid_yaml_is_reported() {
    let err = Config::from_yaml_with_env("render: [unclosed").unwrap_err();
    assert!(!err.is_empty());

    let err = Config::from_yaml_with_env("watermark:\n  anchor: middle\n").unwrap_err();
    assert!(err.contains("anchor") || err.contains("unknown variant"), "got: {}", err);

    let err = Config::from_yaml_with_env("watermark:\n  color: \"#12\"\n").unwrap_err();
    assert!(!err.is_empty());
}

#[test]
fn test_invalid_logging_level_rejected() {
    let config = Config::from_yaml_with_env("logging:\n  level: \"app=shout[\"\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_limits_rejected() {
    let config =
        Config::from_yaml_with_env("render:\n  limits:\n    max_file_size: 0\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("max_file_size"));
}
