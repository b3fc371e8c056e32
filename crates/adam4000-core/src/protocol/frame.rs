//! Command frames
//!
//! Builds the ASCII request frames sent to the module.
//!
//! Frame format: `<prefix><address><argument><checksum><CR>`
//! - prefix: `#` for analog reads, `$` for everything else
//! - address: two uppercase hex digits
//! - argument: channel digit (analog read) or command letter
//! - checksum: two uppercase hex digits over everything before it

use std::fmt;

use super::{checksum, TERMINATOR};

/// Bus address of a module (rendered as two uppercase hex digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const fn new(address: u8) -> Self {
        Self(address)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DeviceAddress {
    fn from(address: u8) -> Self {
        Self(address)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// Analog input channel of an ADAM-4017 (0..=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Highest channel number wired on the modules this crate drives
    pub const MAX: u8 = 3;

    /// Create a channel, checking that it is in the range 0..=3
    pub fn new(channel: u8) -> Option<Self> {
        (channel <= Self::MAX).then_some(Self(channel))
    }

    /// All channels in ascending order
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..=Self::MAX).map(Channel)
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    fn digit(&self) -> u8 {
        b'0' + self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-analog commands supported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleCommand {
    /// Read configuration ('2')
    ReadConfiguration,
    /// Read firmware version ('F')
    ReadFirmwareVersion,
    /// Read module name ('M')
    ReadModuleName,
}

impl ModuleCommand {
    /// Command letter placed after the address
    pub fn code(&self) -> u8 {
        match self {
            ModuleCommand::ReadConfiguration => b'2',
            ModuleCommand::ReadFirmwareVersion => b'F',
            ModuleCommand::ReadModuleName => b'M',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModuleCommand::ReadConfiguration => "configuration",
            ModuleCommand::ReadFirmwareVersion => "firmware version",
            ModuleCommand::ReadModuleName => "module name",
        }
    }
}

/// A complete, checksummed request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: Vec<u8>,
}

impl CommandFrame {
    /// Prefix for analog input reads
    pub const ANALOG_PREFIX: u8 = b'#';
    /// Prefix for every other command
    pub const COMMAND_PREFIX: u8 = b'$';

    /// `#AAC<CK>\r`
    pub fn analog_read(address: DeviceAddress, channel: Channel) -> Self {
        Self::seal(Self::ANALOG_PREFIX, address, channel.digit())
    }

    /// `$AAX<CK>\r`
    pub fn command(address: DeviceAddress, command: ModuleCommand) -> Self {
        Self::seal(Self::COMMAND_PREFIX, address, command.code())
    }

    fn seal(prefix: u8, address: DeviceAddress, argument: u8) -> Self {
        let mut bytes = Vec::with_capacity(7);
        bytes.push(prefix);
        bytes.extend_from_slice(address.to_string().as_bytes());
        bytes.push(argument);

        let ck = checksum::compute(&bytes);
        bytes.extend_from_slice(ck.as_bytes());
        bytes.push(TERMINATOR);

        Self { bytes }
    }

    /// Raw bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame content without checksum and terminator
    pub fn content(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 3]
    }

    /// Checksum field of the frame
    pub fn checksum(&self) -> &[u8] {
        let n = self.bytes.len();
        &self.bytes[n - 3..n - 1]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes.escape_ascii())
    }
}
