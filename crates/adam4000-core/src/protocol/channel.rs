//! RS-485 channel handling
//!
//! The USB-RS485 adapter switches its line driver with the RTS signal: RTS high
//! puts the adapter in transmit mode, RTS low releases the bus so the module can
//! answer.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

use super::{TransportError, BAUD_RATE, READ_TIMEOUT};

/// A byte stream with a direction-control line
pub trait Rs485Channel: Read + Write + Send {
    /// Drive the direction line: `true` enables the line driver (transmit)
    fn set_transmit(&mut self, enabled: bool) -> io::Result<()>;

    /// Set timeout for subsequent read/write operations
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discard any bytes already received
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing Rs485Channel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Name of the underlying device, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Rs485Channel for SerialChannel {
    fn set_transmit(&mut self, enabled: bool) -> io::Result<()> {
        self.port
            .write_request_to_send(enabled)
            .map_err(io::Error::other)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::other)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}

/// Open `path` at 9600-8-N-1 without flow control, in receive mode
pub fn open_serial(path: &str) -> Result<SerialChannel, TransportError> {
    let port = serialport::new(path, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| TransportError::Open {
            port: path.to_string(),
            reason: e.to_string(),
        })?;

    let mut channel = SerialChannel::new(port);
    channel.set_transmit(false)?;
    Ok(channel)
}

/// Sort key placing USB serial adapters first, then numbered by suffix
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    (1, 0, basename.to_string())
}

/// Names of the serial ports present on this machine, USB adapters first
pub fn list_ports() -> Vec<String> {
    let mut names: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort_by_key(|n| port_sort_key(n));
    names.dedup();
    names
}
