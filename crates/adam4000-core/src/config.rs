//! Configuration file
//!
//! TOML layout:
//!
//! ```toml
//! [adam4000]
//! serial_port = "/dev/ttyUSB0"
//! device_addr = 1
//!
//! [mqtt]
//! address = "localhost"
//!
//! [poll]
//! interval_secs = 5
//!
//! [log]
//! level = "info"
//! file = "/var/log/adam4000/adam4000.log"
//!
//! [[measurement]]
//! channel = 0
//! name = "humidity"
//! room = "A"
//! slope = 6.25
//! intercept = -25.0
//! min = 0.0
//! max = 100.0
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{Channel, DeviceAddress};
use crate::publish::{Topic, DEFAULT_INVALID_PAYLOAD};
use crate::sensor::Calibration;

/// Errors raised while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub adam4000: ModuleConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Channel to topic mapping; empty means the two-room HMT100 layout
    #[serde(default, rename = "measurement")]
    pub measurements: Vec<MeasurementConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Serial device of the USB-RS485 adapter
    pub serial_port: String,
    pub device_addr: u8,
    /// First topic level
    #[serde(default = "default_module")]
    pub module: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or IP address
    pub address: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Defaults to `<module>/will`
    #[serde(default)]
    pub will_topic: Option<String>,
    #[serde(default = "default_will_message")]
    pub will_message: String,
    #[serde(default = "default_invalid_payload")]
    pub invalid_payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error or an env-filter string)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Rotated daily when set
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    pub channel: u8,
    /// Measurement name, e.g. `humidity`
    pub name: String,
    /// Room suffix, e.g. `A`
    pub room: String,
    #[serde(flatten)]
    pub calibration: Calibration,
}

fn default_module() -> String {
    "adam4017".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    format!("adam4017-{}", Uuid::new_v4().simple())
}

fn default_keep_alive() -> u64 {
    30
}

fn default_will_message() -> String {
    "MQTT client failure".to_string()
}

fn default_invalid_payload() -> String {
    DEFAULT_INVALID_PAYLOAD.to_string()
}

fn default_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl MeasurementConfig {
    pub fn new(channel: u8, name: &str, room: &str, calibration: Calibration) -> Self {
        Self {
            channel,
            name: name.to_string(),
            room: room.to_string(),
            calibration,
        }
    }
}

/// Two refrigerated rooms, each with one HMT100 (humidity then temperature)
pub fn default_measurements() -> Vec<MeasurementConfig> {
    vec![
        MeasurementConfig::new(0, "humidity", "A", Calibration::hmt100_humidity()),
        MeasurementConfig::new(1, "temperature", "A", Calibration::hmt100_temperature()),
        MeasurementConfig::new(2, "humidity", "B", Calibration::hmt100_humidity()),
        MeasurementConfig::new(3, "temperature", "B", Calibration::hmt100_temperature()),
    ]
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        if config.measurements.is_empty() {
            config.measurements = default_measurements();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn device_address(&self) -> DeviceAddress {
        DeviceAddress::new(self.adam4000.device_addr)
    }

    pub fn will_topic(&self) -> String {
        self.mqtt
            .will_topic
            .clone()
            .unwrap_or_else(|| format!("{}/will", self.adam4000.module))
    }

    pub fn topic(&self, measurement: &MeasurementConfig) -> Topic {
        Topic::new(&self.adam4000.module, &measurement.name, &measurement.room)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.adam4000.serial_port.trim().is_empty() {
            return invalid("adam4000.serial_port is empty".to_string());
        }
        let module = &self.adam4000.module;
        if module.is_empty() || module.contains(|c: char| matches!(c, '/' | '+' | '#')) {
            return invalid(format!(
                "adam4000.module '{}' is not a valid topic level",
                self.adam4000.module
            ));
        }
        if self.mqtt.address.trim().is_empty() {
            return invalid("mqtt.address is empty".to_string());
        }
        if self.mqtt.client_id.trim().is_empty() || self.mqtt.client_id.starts_with(' ') {
            return invalid("mqtt.client_id must not be empty or start with a space".to_string());
        }
        if self.poll.interval_secs == 0 {
            return invalid("poll.interval_secs must be at least 1".to_string());
        }

        let mut topics = HashSet::new();
        for m in &self.measurements {
            if Channel::new(m.channel).is_none() {
                return invalid(format!(
                    "measurement '{}{}': channel {} is outside 0..={}",
                    m.name,
                    m.room,
                    m.channel,
                    Channel::MAX
                ));
            }
            if let Err(e) = m.calibration.validate() {
                return invalid(format!("measurement '{}{}': {}", m.name, m.room, e));
            }
            let topic = self.topic(m);
            if !topics.insert(topic.clone()) {
                return invalid(format!("duplicate topic '{}'", topic));
            }
        }

        Ok(())
    }
}
