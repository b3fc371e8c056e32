//! Protocol errors

use thiserror::Error;

/// Reasons a raw response could not be turned into a payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response delimiter not found")]
    NoDelimiter,

    #[error("response terminator not found")]
    NoTerminator,

    #[error("malformed response")]
    Malformed,

    #[error("checksum mismatch: computed {expected}, received {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Errors raised by the serial transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("could not open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
