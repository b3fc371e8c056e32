//! ADAM-4000 ASCII Protocol
//!
//! Implements the ASCII command/response protocol spoken by the ADAM-4017 analog
//! input module over a half-duplex RS-485 link.
//!
//! Every frame is printable ASCII followed by a two-digit hex checksum and a
//! carriage return:
//! - Request:  `#AAC<CK>\r` (analog read) or `$AAX<CK>\r` (configuration, firmware, name)
//! - Response: `>DDDDDDD<CK>\r` (analog read) or `!...<CK>\r` (everything else)

pub mod channel;
pub mod checksum;
mod error;
pub mod frame;
pub mod response;
mod transport;

pub use channel::{open_serial, Rs485Channel, SerialChannel};
pub use error::{ParseError, TransportError};
pub use frame::{Channel, CommandFrame, DeviceAddress, ModuleCommand};
pub use response::{parse, Delimiter, ParsedResponse};
pub use transport::{Transport, TransportStats};

use std::time::Duration;

/// Line speed of the module (9600-8-N-1)
pub const BAUD_RATE: u32 = 9600;

/// Read timeout for a single response
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Give up on a write that has not completed after this long
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Time the line driver stays enabled after writing a frame.
///
/// A 6-byte frame takes ~6.25ms on the wire at 9600 baud, and the module starts
/// answering shortly after the CR arrives.
pub const TX_SETTLE_DELAY: Duration = Duration::from_millis(8);

/// Frame terminator
pub const TERMINATOR: u8 = b'\r';

/// Upper bound on the bytes accumulated for one response
pub const MAX_RESPONSE_LEN: usize = 64;
