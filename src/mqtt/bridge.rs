//! Serial-to-MQTT forwarding.
//!
//! Bytes read from the serial port are staged in a fixed-capacity buffer and
//! published as one message when a line ends or the buffer fills, whichever
//! comes first. The full-buffer flush bounds publish latency for output that
//! never ends a line.

use std::collections::VecDeque;
use std::sync::mpsc;

/// A non-blocking byte producer polled once per step.
pub trait ByteSource {
    /// Next available byte, or `None` when nothing is pending right now.
    fn read_byte(&mut self) -> Option<u8>;
}

impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

impl ByteSource for mpsc::Receiver<u8> {
    fn read_byte(&mut self) -> Option<u8> {
        self.try_recv().ok()
    }
}

#[cfg(feature = "esp32")]
impl<'d> ByteSource for esp_idf_hal::uart::UartDriver<'d> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.read(&mut buf, esp_idf_hal::delay::NON_BLOCK) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }
}

/// Fixed-capacity staging buffer between the serial port and the broker.
pub struct SerialBridge {
    buf: Vec<u8>,
    capacity: usize,
}

impl SerialBridge {
    /// Create a buffer holding at most `capacity` bytes (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one byte.
    ///
    /// Returns the staged bytes when this byte ends a line (`\n` or `\r`) or
    /// fills the buffer; the buffer is empty afterwards.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.buf.push(byte);
        if byte == b'\n' || byte == b'\r' || self.buf.len() >= self.capacity {
            return Some(self.take());
        }
        None
    }

    /// Remove and return everything staged.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.buf, Vec::with_capacity(self.capacity))
    }

    /// Drop everything staged.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
