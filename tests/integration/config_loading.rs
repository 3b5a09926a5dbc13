//! Settings file parsing and environment overrides.

use std::path::Path;

use gr::config::{CameraConfig, DEFAULT_HOST, load_config};
use gr::{CameraError, ControllerOptions};

use crate::common::env::{with_host, without_host};
use crate::common::fixtures::TestConfig;

#[test]
fn test_full_config_file() {
    let _env = without_host();
    let config = TestConfig::with_content(
        r#"
host = "10.0.0.7"
request_timeout_ms = 2500
poll_interval_ms = 250
detect_interval_ms = 3000
auto_reconnect = false
"#,
    );

    let loaded = load_config(Some(config.path())).unwrap();
    assert_eq!(loaded.host, "10.0.0.7");
    assert_eq!(loaded.request_timeout_ms, 2500);

    let options = ControllerOptions::from(&loaded);
    assert_eq!(options.poll_interval.as_millis(), 250);
    assert_eq!(options.detect_interval.as_millis(), 3000);
    assert!(!options.auto_reconnect);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let _env = without_host();
    let config = TestConfig::with_content("poll_interval_ms = 200\n");

    let loaded = load_config(Some(config.path())).unwrap();
    assert_eq!(loaded.host, DEFAULT_HOST);
    assert_eq!(loaded.poll_interval_ms, 200);
    assert!(loaded.auto_reconnect);
}

#[test]
fn test_environment_overrides_file_host() {
    let _env = with_host("192.168.1.50");
    let config = TestConfig::with_content("host = \"10.0.0.7\"\n");

    let loaded = load_config(Some(config.path())).unwrap();
    assert_eq!(loaded.host, "192.168.1.50");
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let _env = without_host();
    let result = load_config(Some(Path::new("/nonexistent/grctl/config.toml")));
    assert!(matches!(result, Err(CameraError::ConfigNotFound { .. })));
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let _env = without_host();
    let config = TestConfig::with_content("host = [\n");
    let result = load_config(Some(config.path()));

    let err = result.unwrap_err();
    assert!(matches!(err, CameraError::ConfigParse(_)));
    assert!(err.to_string().contains("TOML"));
}

#[test]
fn test_zero_interval_rejected() {
    let _env = without_host();
    let config = TestConfig::with_content("detect_interval_ms = 0\n");
    assert!(matches!(
        load_config(Some(config.path())),
        Err(CameraError::ConfigInvalid(_))
    ));
}

#[test]
fn test_config_serializes_back_to_toml() {
    let config = CameraConfig::default();
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("host = \"192.168.0.1\""));
    assert_eq!(toml::from_str::<CameraConfig>(&text).unwrap(), config);
}
