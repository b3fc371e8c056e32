//! Simulated RS-485 bus for driver tests

#![allow(dead_code)]

use adam4000_core::protocol::{checksum, Rs485Channel};
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// What the bus saw
#[derive(Default)]
pub struct BusLog {
    pub written: Vec<Vec<u8>>,
    pub rts: Vec<bool>,
    pub clears: usize,
    pending: Vec<u8>,
}

/// Channel whose replies come from a responder closure
#[derive(Clone)]
pub struct MockBus {
    log: Arc<Mutex<BusLog>>,
    responder: Arc<Mutex<Responder>>,
}

impl MockBus {
    pub fn new(responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        Self {
            log: Arc::new(Mutex::new(BusLog::default())),
            responder: Arc::new(Mutex::new(Box::new(responder))),
        }
    }

    /// Replies with `responses` in order, then stays silent
    pub fn scripted(responses: Vec<Vec<u8>>) -> Self {
        let mut queue = responses.into_iter();
        Self::new(move |_| queue.next().unwrap_or_default())
    }

    /// Module answering analog reads with the given per-channel values;
    /// `None` channels stay silent
    pub fn simulated(values: [Option<f64>; 4]) -> Self {
        Self::new(move |request| {
            if request.first() != Some(&b'#') || request.len() < 4 {
                return Vec::new();
            }
            let channel = (request[3] - b'0') as usize;
            match values.get(channel).copied().flatten() {
                Some(value) => analog_reply(value),
                None => Vec::new(),
            }
        })
    }

    /// Bytes already waiting in the receive buffer before the next exchange
    pub fn inject_stale(&self, bytes: &[u8]) {
        self.log.lock().unwrap().pending.extend_from_slice(bytes);
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.log.lock().unwrap().written.clone()
    }

    pub fn rts(&self) -> Vec<bool> {
        self.log.lock().unwrap().rts.clone()
    }

    pub fn clears(&self) -> usize {
        self.log.lock().unwrap().clears
    }
}

/// `body` followed by its checksum and CR
pub fn framed(body: &str) -> Vec<u8> {
    let mut raw = body.as_bytes().to_vec();
    raw.extend_from_slice(checksum::compute(body.as_bytes()).as_bytes());
    raw.push(b'\r');
    raw
}

/// Analog read reply in engineering units (`>+dd.ddd`)
pub fn analog_reply(value: f64) -> Vec<u8> {
    framed(&format!(">{:+07.3}", value))
}

impl Read for MockBus {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut log = self.log.lock().unwrap();
        if log.pending.is_empty() {
            return Err(io::Error::new(ErrorKind::TimedOut, "timed out"));
        }
        let n = buf.len().min(log.pending.len());
        buf[..n].copy_from_slice(&log.pending[..n]);
        log.pending.drain(..n);
        Ok(n)
    }
}

impl Write for MockBus {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let reply = {
            let mut responder = self.responder.lock().unwrap();
            (*responder)(buf)
        };
        let mut log = self.log.lock().unwrap();
        log.written.push(buf.to_vec());
        log.pending.extend_from_slice(&reply);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Rs485Channel for MockBus {
    fn set_transmit(&mut self, enabled: bool) -> io::Result<()> {
        self.log.lock().unwrap().rts.push(enabled);
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.pending.clear();
        log.clears += 1;
        Ok(())
    }
}
