//! Measurement publishing
//!
//! Publication is fire-and-forget: sinks report failures, but the polling cycle
//! only logs them.

use std::fmt;

use thiserror::Error;
use tracing::info;

/// Payload published instead of a measurement when a reading is unusable
pub const DEFAULT_INVALID_PAYLOAD: &str = "invalid";

/// Publish topic `<module>/<measurement><room>`, e.g. `adam4017/temperatureA`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(module: &str, measurement: &str, room: &str) -> Self {
        Self(format!("{}/{}{}", module, measurement, room))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value handed to a sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PublishValue {
    Reading { value: f64, decimals: u32 },
    /// Bus error or implausible measurement
    Invalid,
}

impl PublishValue {
    /// Text payload, with `invalid` standing in for unusable readings
    pub fn payload(&self, invalid: &str) -> String {
        match self {
            PublishValue::Reading { value, decimals } => {
                format!("{:.*}", *decimals as usize, value)
            }
            PublishValue::Invalid => invalid.to_string(),
        }
    }
}

/// Errors reported by a sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Destination for measurements
pub trait MeasurementSink {
    fn publish(&mut self, topic: &Topic, value: &PublishValue) -> Result<(), SinkError>;
}

/// Sink that only logs, for dry runs
#[derive(Debug, Clone)]
pub struct LogSink {
    invalid_payload: String,
}

impl LogSink {
    pub fn new(invalid_payload: impl Into<String>) -> Self {
        Self {
            invalid_payload: invalid_payload.into(),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(DEFAULT_INVALID_PAYLOAD)
    }
}

impl MeasurementSink for LogSink {
    fn publish(&mut self, topic: &Topic, value: &PublishValue) -> Result<(), SinkError> {
        info!(topic = %topic, payload = %value.payload(&self.invalid_payload), "dry run publish");
        Ok(())
    }
}
