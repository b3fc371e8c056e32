//! ADAM-4017 module driver
//!
//! Composes frame building, the RS-485 transport and response parsing into the
//! four operations the module supports here: analog read, configuration read,
//! firmware version read and module name read.
//!
//! A driver is either `Ready` (serial port open) or `Unavailable` (the port could
//! not be opened). An unavailable driver fails every operation immediately with
//! [`DriverError::Unavailable`] without touching any I/O.

mod config;

pub use config::{DataFormat, InputRange, ModuleConfiguration};

use thiserror::Error;
use tracing::{debug, error, info, info_span, trace, warn, Span};

use crate::protocol::{
    open_serial, parse, Channel, CommandFrame, Delimiter, DeviceAddress, ModuleCommand,
    ParseError, Rs485Channel, SerialChannel, Transport, TransportError, TransportStats,
};

/// Errors returned by the module driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("module unavailable: {0}")]
    OpenFailure(String),

    #[error("module unavailable: serial port is not open")]
    Unavailable,

    #[error("invalid analog channel {0} (expected 0..=3)")]
    InvalidChannel(u8),

    #[error("invalid response: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Serial port open, operations perform I/O
    Ready,
    /// Serial port could not be opened, operations fail fast
    Unavailable,
}

/// Result of one analog read
///
/// Bus errors (silence, truncation, checksum mismatch) do not abort polling; they
/// come back as `Invalid` so the caller can publish a sentinel and carry on.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalogReading {
    /// Value in the module's engineering units (e.g. mA)
    Value(f64),
    /// The exchange did not produce a usable value
    Invalid(ParseError),
}

impl AnalogReading {
    pub fn value(&self) -> Option<f64> {
        match self {
            AnalogReading::Value(v) => Some(*v),
            AnalogReading::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, AnalogReading::Value(_))
    }
}

/// Driver for one ADAM-4017 module
///
/// Owns the serial connection exclusively. The port is opened on construction
/// and closed exactly once when the driver is dropped.
pub struct Adam4017<C: Rs485Channel = SerialChannel> {
    address: DeviceAddress,
    transport: Option<Transport<C>>,
    span: Span,
}

impl Adam4017<SerialChannel> {
    /// Open the module at `address` on `port`
    ///
    /// An open failure is logged and produces an `Unavailable` driver.
    pub fn open(port: &str, address: DeviceAddress) -> Self {
        match Self::try_open(port, address) {
            Ok(driver) => driver,
            Err(e) => {
                error!(port, address = %address, "could not open serial port: {}", e);
                Self::unavailable(address)
            }
        }
    }

    /// Open the module at `address` on `port`, reporting an open failure
    pub fn try_open(port: &str, address: DeviceAddress) -> Result<Self, DriverError> {
        let channel = open_serial(port).map_err(|e| DriverError::OpenFailure(e.to_string()))?;
        info!(port, address = %address, "serial port opened");
        Ok(Self::with_channel(channel, address))
    }
}

impl<C: Rs485Channel> Adam4017<C> {
    /// Driver over an already open channel
    pub fn with_channel(channel: C, address: DeviceAddress) -> Self {
        Self {
            address,
            transport: Some(Transport::new(channel)),
            span: info_span!("adam4017", address = %address),
        }
    }

    /// Driver that never attempts I/O
    pub fn unavailable(address: DeviceAddress) -> Self {
        Self {
            address,
            transport: None,
            span: info_span!("adam4017", address = %address),
        }
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn state(&self) -> DriverState {
        if self.transport.is_some() {
            DriverState::Ready
        } else {
            DriverState::Unavailable
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == DriverState::Ready
    }

    /// Transport counters, if the port is open
    pub fn stats(&self) -> Option<TransportStats> {
        self.transport.as_ref().map(|t| t.stats())
    }

    /// Read analog input `channel` (0..=3)
    pub fn read_analog_in(&mut self, channel: u8) -> Result<AnalogReading, DriverError> {
        let channel = Channel::new(channel).ok_or(DriverError::InvalidChannel(channel))?;
        self.read_channel(channel)
    }

    /// Read one analog input channel
    pub fn read_channel(&mut self, channel: Channel) -> Result<AnalogReading, DriverError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let frame = CommandFrame::analog_read(self.address, channel);
        debug!(channel = %channel, frame = %frame, "reading analog input");

        let raw = self.transport()?.exchange(&frame)?;

        let reading = match parse(&raw, Delimiter::Analog).and_then(|r| {
            trace!(payload = %r.payload, checksum = %r.checksum, "checksum passed");
            r.analog_value()
        }) {
            Ok(value) => {
                info!(channel = %channel, value, "analog reading");
                AnalogReading::Value(value)
            }
            Err(e) => {
                warn!(
                    channel = %channel,
                    response = %raw.escape_ascii(),
                    "invalid data received: {}",
                    e
                );
                AnalogReading::Invalid(e)
            }
        };

        Ok(reading)
    }

    /// Read every analog input in channel order
    pub fn read_all_analog(&mut self) -> Result<Vec<(Channel, AnalogReading)>, DriverError> {
        Channel::all()
            .map(|channel| Ok((channel, self.read_channel(channel)?)))
            .collect()
    }

    /// Raw reply to the configuration command (`!AATTCCFF` + checksum + CR)
    pub fn read_configuration(&mut self) -> Result<String, DriverError> {
        self.send_command(ModuleCommand::ReadConfiguration)
    }

    /// Raw reply to the firmware version command
    pub fn read_firmware_version(&mut self) -> Result<String, DriverError> {
        self.send_command(ModuleCommand::ReadFirmwareVersion)
    }

    /// Raw reply to the module name command
    pub fn read_module_name(&mut self) -> Result<String, DriverError> {
        self.send_command(ModuleCommand::ReadModuleName)
    }

    /// Read and decode the module configuration
    pub fn configuration(&mut self) -> Result<ModuleConfiguration, DriverError> {
        let raw = self.read_configuration()?;
        Ok(ModuleConfiguration::from_response(&raw)?)
    }

    /// Send a non-analog command and return the reply text unmodified
    fn send_command(&mut self, command: ModuleCommand) -> Result<String, DriverError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let frame = CommandFrame::command(self.address, command);
        debug!(frame = %frame, "enquiring {}", command.description());

        let raw = self.transport()?.exchange(&frame)?;
        if raw.is_empty() {
            warn!("no reply to {} request", command.description());
        }

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn transport(&mut self) -> Result<&mut Transport<C>, DriverError> {
        self.transport.as_mut().ok_or(DriverError::Unavailable)
    }
}

impl<C: Rs485Channel> Drop for Adam4017<C> {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            let _enter = self.span.enter();
            debug!(exchanges = transport.stats().exchanges, "closing serial port");
            drop(transport);
        }
    }
}
