//! Configuration reply decoding
//!
//! The `$AA2` command answers `!AATTCCFF` followed by the checksum:
//! - AA: module address
//! - TT: input range code
//! - CC: baud rate code
//! - FF: data format bit field

use crate::protocol::{checksum, parse, Delimiter, DeviceAddress, ParseError};

/// Input range of the analog inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRange {
    PlusMinus10V,
    PlusMinus5V,
    PlusMinus1V,
    PlusMinus500mV,
    PlusMinus150mV,
    PlusMinus20mA,
    /// Code not documented for the ADAM-4017
    Unknown(u8),
}

impl InputRange {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x08 => InputRange::PlusMinus10V,
            0x09 => InputRange::PlusMinus5V,
            0x0A => InputRange::PlusMinus1V,
            0x0B => InputRange::PlusMinus500mV,
            0x0C => InputRange::PlusMinus150mV,
            0x0D => InputRange::PlusMinus20mA,
            other => InputRange::Unknown(other),
        }
    }
}

/// Encoding of analog values in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    EngineeringUnits,
    PercentOfFullScale,
    TwosComplementHex,
    Unknown(u8),
}

/// Decoded reply to the configuration command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleConfiguration {
    pub address: DeviceAddress,
    pub input_range: InputRange,
    /// Raw baud rate code; see [`ModuleConfiguration::baud_rate`]
    pub baud_code: u8,
    pub data_format: DataFormat,
    /// Module appends checksums to its replies
    pub checksum_enabled: bool,
    /// Integration time tuned for 50 Hz mains (60 Hz when false)
    pub reject_50hz: bool,
}

impl ModuleConfiguration {
    /// Decode a raw configuration reply (checksum and CR included)
    pub fn from_response(raw: &str) -> Result<Self, ParseError> {
        let response = parse(raw.as_bytes(), Delimiter::Command)?;
        let payload = response.payload.as_bytes();
        if payload.len() < 8 {
            return Err(ParseError::Malformed);
        }

        let field = |i: usize| checksum::decode(&payload[i..i + 2]).ok_or(ParseError::Malformed);

        let address = DeviceAddress::new(field(0)?);
        let input_range = InputRange::from_code(field(2)?);
        let baud_code = field(4)?;
        let format = field(6)?;

        let data_format = match format & 0x03 {
            0b00 => DataFormat::EngineeringUnits,
            0b01 => DataFormat::PercentOfFullScale,
            0b10 => DataFormat::TwosComplementHex,
            other => DataFormat::Unknown(other),
        };

        Ok(Self {
            address,
            input_range,
            baud_code,
            data_format,
            checksum_enabled: format & 0x40 != 0,
            reject_50hz: format & 0x80 != 0,
        })
    }

    /// Line speed selected by the baud rate code
    pub fn baud_rate(&self) -> Option<u32> {
        match self.baud_code {
            0x03 => Some(1200),
            0x04 => Some(2400),
            0x05 => Some(4800),
            0x06 => Some(9600),
            0x07 => Some(19200),
            0x08 => Some(38400),
            0x09 => Some(57600),
            0x0A => Some(115200),
            _ => None,
        }
    }
}
