//! # ADAM-4000 Core Library
//!
//! Communication with ADAM-4017 analog input modules over RS-485.
//!
//! This library provides:
//! - The ADAM-4000 ASCII protocol (frames, checksums, response parsing)
//! - RTS-controlled half-duplex transport over a USB-RS485 adapter
//! - A module driver for analog, configuration, firmware and name reads
//! - Sensor calibration and measurement publishing
//!
//! ## Example
//!
//! ```rust,ignore
//! use adam4000_core::prelude::*;
//!
//! let mut module = Adam4017::open("/dev/ttyUSB0", DeviceAddress::new(1));
//! println!("Module name: {}", module.read_module_name()?);
//!
//! match module.read_analog_in(0)? {
//!     AnalogReading::Value(ma) => println!("AI0: {} mA", ma),
//!     AnalogReading::Invalid(e) => println!("AI0: invalid ({})", e),
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod module;
pub mod poll;
pub mod protocol;
pub mod publish;
pub mod sensor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigError, MeasurementConfig};
    pub use crate::module::{Adam4017, AnalogReading, DriverError, DriverState};
    pub use crate::poll::{MeasurementPoint, PollReport, Poller};
    pub use crate::protocol::{Channel, DeviceAddress, ParseError};
    pub use crate::publish::{LogSink, MeasurementSink, PublishValue, SinkError, Topic};
    pub use crate::sensor::{Calibration, Measurement};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
