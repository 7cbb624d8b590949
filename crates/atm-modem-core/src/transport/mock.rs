//! Scripted transport for tests
//!
//! Records every open/close/write into a shared log and plays back reply
//! chunks. At most one queued chunk becomes readable per
//! `bytes_available` poll, so a reply can be made to dribble in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;
use crate::error::TransportError;

/// Something the engine did to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Opened at this baud rate
    Open(u32),
    /// Closed
    Close,
    /// One write, byte for byte
    Write(Vec<u8>),
}

/// Shared view of a [`MockTransport`]'s event log
#[derive(Debug, Clone, Default)]
pub struct MockLog(Arc<Mutex<Vec<MockEvent>>>);

impl MockLog {
    fn lock(&self) -> MutexGuard<'_, Vec<MockEvent>> {
        // A panicking test thread must not hide the log from the others
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, event: MockEvent) {
        self.lock().push(event);
    }

    /// Every event so far, in order
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().clone()
    }

    /// Every write, decoded as text
    pub fn writes(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Write(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    /// Number of writes
    pub fn write_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, MockEvent::Write(_)))
            .count()
    }

    /// Baud rates of every open, in order
    pub fn opens(&self) -> Vec<u32> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Open(rate) => Some(*rate),
                _ => None,
            })
            .collect()
    }

    /// Number of closes
    pub fn close_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, MockEvent::Close))
            .count()
    }

    /// Forget everything logged so far
    pub fn clear(&self) {
        self.lock().clear();
    }
}

type Responder = Box<dyn FnMut(&[u8], u32) -> Vec<Vec<u8>> + Send>;

/// Scripted stand-in for a serial link
pub struct MockTransport {
    log: MockLog,
    responder: Option<Responder>,
    pending: VecDeque<Vec<u8>>,
    available: VecDeque<u8>,
    baud_rate: Option<u32>,
    fail_writes: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A transport that never answers
    pub fn new() -> Self {
        Self {
            log: MockLog::default(),
            responder: None,
            pending: VecDeque::new(),
            available: VecDeque::new(),
            baud_rate: None,
            fail_writes: false,
        }
    }

    /// Answer each write with the chunks returned by `responder`, which also
    /// sees the baud rate the link is open at
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&[u8], u32) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// A modem that acknowledges `+++` and `ATO` at any baud rate and answers
    /// every other line with `reply`
    pub fn answering(reply: &'static str) -> Self {
        Self::new().with_responder(move |data, _| {
            if data == b"+++" {
                vec![b"\r\nOK\r\n".to_vec()]
            } else if data == b"ATO\r\n" {
                vec![b"\r\nCONNECT\r\n".to_vec()]
            } else {
                vec![reply.as_bytes().to_vec()]
            }
        })
    }

    /// Make every write fail with an I/O error
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Queue a reply chunk that becomes readable on a later poll
    pub fn queue(&mut self, chunk: impl AsRef<[u8]>) {
        self.pending.push_back(chunk.as_ref().to_vec());
    }

    /// Queue `polls` polls on which nothing new arrives
    pub fn queue_silence(&mut self, polls: usize) {
        for _ in 0..polls {
            self.pending.push_back(Vec::new());
        }
    }

    /// Handle on the event log that outlives the transport
    pub fn log(&self) -> MockLog {
        self.log.clone()
    }

    /// Rate of the current open, if open
    pub fn baud_rate(&self) -> Option<u32> {
        self.baud_rate
    }
}

impl Transport for MockTransport {
    fn open(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        self.log.push(MockEvent::Open(baud_rate));
        self.baud_rate = Some(baud_rate);
        self.pending.clear();
        self.available.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.log.push(MockEvent::Close);
        self.baud_rate = None;
    }

    fn is_open(&self) -> bool {
        self.baud_rate.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let baud_rate = self.baud_rate.ok_or(TransportError::NotOpen)?;
        if self.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        self.log.push(MockEvent::Write(data.to_vec()));
        if let Some(responder) = self.responder.as_mut() {
            self.pending.extend(responder(data, baud_rate));
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        if self.baud_rate.is_none() {
            return Err(TransportError::NotOpen);
        }
        if let Some(chunk) = self.pending.pop_front() {
            self.available.extend(chunk);
        }
        Ok(self.available.len())
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        if self.baud_rate.is_none() {
            return Err(TransportError::NotOpen);
        }
        let n = n.min(self.available.len());
        Ok(self.available.drain(..n).collect())
    }
}
