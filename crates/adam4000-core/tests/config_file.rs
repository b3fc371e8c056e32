use std::io::Write;

use adam4000_core::config::{Config, ConfigError};
use adam4000_core::sensor::Calibration;
use pretty_assertions::assert_eq;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[adam4000]
serial_port = "/dev/ttyUSB1"
device_addr = 2

[mqtt]
address = "10.0.0.5"
port = 8883
client_id = "cold-store"
will_topic = "status/adam"
invalid_payload = "-1"

[poll]
interval_secs = 10

[log]
level = "debug"
file = "/var/log/adam4000/adam4000.log"

[[measurement]]
channel = 0
name = "humidity"
room = "A"
slope = 6.25
intercept = -24.0
min = 0.0
max = 100.0
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.adam4000.serial_port, "/dev/ttyUSB1");
    assert_eq!(config.device_address().to_string(), "02");
    assert_eq!(config.mqtt.port, 8883);
    assert_eq!(config.mqtt.client_id, "cold-store");
    assert_eq!(config.will_topic(), "status/adam");
    assert_eq!(config.mqtt.invalid_payload, "-1");
    assert_eq!(config.poll.interval_secs, 10);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.measurements.len(), 1);
    assert_eq!(
        config.measurements[0].calibration,
        Calibration::linear(6.25, -24.0).with_range(0.0, 100.0)
    );
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match Config::load(&path) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_malformed_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[adam4000\nserial_port = ").unwrap();
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
