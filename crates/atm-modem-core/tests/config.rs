use atm_modem_core::config::{DEFAULT_LINK_TEST_TERMINATOR, SUPPORTED_BAUD_RATES};
use atm_modem_core::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modem.json");

    let mut config = ModemConfig::for_port("/dev/ttyUSB1").with_baud_rate(19200);
    config.host_port = HostPort::P2;
    config.timing.response_ms = 2500;
    config.to_file(&path).unwrap();

    let loaded = ModemConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_minimal_config_file_gets_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modem.json");
    std::fs::write(&path, r#"{ "port_name": "COM4" }"#).unwrap();

    let loaded = ModemConfig::from_file(&path).unwrap();
    assert_eq!(loaded.port_name, "COM4");
    assert_eq!(loaded.baud_rate, None);
    assert_eq!(loaded.probe_rates, SUPPORTED_BAUD_RATES.to_vec());
    assert_eq!(loaded.timing, Timing::default());
    assert_eq!(loaded.link_test_terminator, DEFAULT_LINK_TEST_TERMINATOR);
    assert!(loaded.disable_echo);
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modem.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        ModemConfig::from_file(&path),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        ModemConfig::from_file(dir.path().join("absent.json")),
        Err(ConfigError::Io(_))
    ));
}
