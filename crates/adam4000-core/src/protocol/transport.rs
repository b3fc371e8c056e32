//! Half-duplex request/response exchange
//!
//! One call to [`Transport::exchange`] is one complete bus transaction:
//!
//! 1. RTS high (line driver enabled)
//! 2. write the frame
//! 3. hold the driver for [`TX_SETTLE_DELAY`] so the last byte leaves the wire
//! 4. RTS low (receive mode)
//! 5. read until CR or [`READ_TIMEOUT`]
//!
//! The settle delay is a fixed property of the link. Releasing RTS early truncates
//! the request, releasing it late collides with the module's answer.
//!
//! Timeouts are not errors here: a silent or slow module just produces a short or
//! empty response, which the response parser classifies.

use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::{
    CommandFrame, Rs485Channel, TransportError, MAX_RESPONSE_LEN, READ_TIMEOUT, TERMINATOR,
    TX_SETTLE_DELAY, WRITE_TIMEOUT,
};

/// Cumulative exchange counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub exchanges: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Exchanges that produced no bytes at all
    pub silent_responses: u64,
}

/// Exclusive owner of an RS-485 channel
///
/// `exchange` takes `&mut self`, so at most one transaction is ever in flight.
/// Sharing a transport between threads requires wrapping it in a mutex, which
/// then covers the whole write/settle/read sequence.
pub struct Transport<C: Rs485Channel> {
    channel: C,
    stats: TransportStats,
}

impl<C: Rs485Channel> Transport<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            stats: TransportStats::default(),
        }
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Send `frame` and return whatever the module answered
    ///
    /// The returned bytes end with CR when a complete line arrived. They may be
    /// empty or partial when the read timed out.
    pub fn exchange(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, TransportError> {
        // A late answer to an earlier request must not be matched to this one
        if let Err(e) = self.channel.clear_input() {
            debug!("exchange: could not clear input buffer: {}", e);
        }

        self.channel.set_timeout(WRITE_TIMEOUT)?;

        debug!(frame = %frame, "exchange: enabling line driver");
        trace!("exchange: frame occupies the line for {:?}", wire_time(frame.len()));
        self.channel.set_transmit(true)?;

        let write_result = self.channel.write_all(frame.as_bytes());

        std::thread::sleep(TX_SETTLE_DELAY);

        debug!("exchange: disabling line driver");
        let release_result = self.channel.set_transmit(false);

        match write_result {
            Ok(()) => {
                self.stats.bytes_sent = self.stats.bytes_sent.saturating_add(frame.len() as u64);
            }
            Err(ref e) if is_timeout(e) => {
                warn!(frame = %frame, "exchange: write timed out after {:?}", WRITE_TIMEOUT);
            }
            Err(e) => return Err(e.into()),
        }
        release_result?;

        let response = self.read_line()?;

        self.stats.exchanges = self.stats.exchanges.saturating_add(1);
        self.stats.bytes_received = self
            .stats
            .bytes_received
            .saturating_add(response.len() as u64);
        if response.is_empty() {
            self.stats.silent_responses = self.stats.silent_responses.saturating_add(1);
        }

        debug!(response = %response.escape_ascii(), "exchange: raw response");
        Ok(response)
    }

    /// Read until the terminator, the read deadline, or the length cap
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        self.channel.set_timeout(READ_TIMEOUT)?;

        let deadline = Instant::now() + READ_TIMEOUT;
        let mut response = Vec::new();
        let mut buffer = [0u8; 32];

        loop {
            match self.channel.read(&mut buffer) {
                Ok(0) => {
                    trace!("read_line: EOF");
                    break;
                }
                Ok(n) => {
                    let chunk = &buffer[..n];
                    if let Some(pos) = chunk.iter().position(|&b| b == TERMINATOR) {
                        response.extend_from_slice(&chunk[..=pos]);
                        break;
                    }
                    response.extend_from_slice(chunk);
                    if response.len() >= MAX_RESPONSE_LEN {
                        warn!(
                            "read_line: no terminator within {} bytes, giving up",
                            MAX_RESPONSE_LEN
                        );
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if is_timeout(e) => {
                    trace!("read_line: timed out with {} bytes", response.len());
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                trace!("read_line: deadline reached with {} bytes", response.len());
                break;
            }
        }

        Ok(response)
    }
}

impl<C: Rs485Channel> Drop for Transport<C> {
    fn drop(&mut self) {
        // Leave the bus released; the port itself closes when the channel drops
        if let Err(e) = self.channel.set_transmit(false) {
            debug!("transport drop: could not release line driver: {}", e);
        }
        debug!(exchanges = self.stats.exchanges, "transport closed");
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Time a frame of `len` bytes spends on the wire at the module's baud rate
pub fn wire_time(len: usize) -> Duration {
    // start + 8 data + stop
    let bits = (len as u64) * 10;
    Duration::from_micros(bits * 1_000_000 / u64::from(super::BAUD_RATE))
}
