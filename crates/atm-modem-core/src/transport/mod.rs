//! Byte transports
//!
//! The protocol engine only needs a duplex byte stream whose baud rate can be
//! changed by closing and reopening it. No framing or timeout semantics are
//! assumed here: every wait is imposed by the engine before it reads.

mod mock;
mod serial;

pub use mock::{MockEvent, MockLog, MockTransport};
pub use serial::{list_ports, PortInfo, SerialTransport};

use crate::error::TransportError;

/// Duplex byte stream to the modem
pub trait Transport {
    /// Open (or reopen) the link at `baud_rate`
    fn open(&mut self, baud_rate: u32) -> Result<(), TransportError>;

    /// Close the link. Closing a closed transport is a no-op.
    fn close(&mut self);

    /// Whether the link is open
    fn is_open(&self) -> bool;

    /// Write every byte of `data`
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Number of bytes that can be read without blocking
    fn bytes_available(&mut self) -> Result<usize, TransportError>;

    /// Read up to `n` bytes that are already available
    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Read whatever is currently buffered
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let n = self.bytes_available()?;
        if n == 0 {
            return Ok(Vec::new());
        }
        self.read(n)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        (**self).open(baud_rate)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        (**self).bytes_available()
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(n)
    }
}
