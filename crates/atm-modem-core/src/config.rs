//! Session configuration
//!
//! Timing constants mirror the vendor's escape-sequence and response
//! requirements. They are plain data so long-range links can stretch them
//! without touching the protocol logic.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Baud rates the modem's serial ports accept, in probe order
pub const SUPPORTED_BAUD_RATES: [u32; 7] = [1200, 2400, 4800, 9600, 19200, 57600, 115200];

/// Default link-test terminator: the final pass/fail/timeout line
pub const DEFAULT_LINK_TEST_TERMINATOR: &str = r"(?i)(pass|fail|timeout)[^\r\n]*\r\n$";

/// Default multi-rate test terminator: the summary line closing the sweep
pub const DEFAULT_RATE_TEST_TERMINATOR: &str = r"(?i)(rate test (complete|done|aborted)|timeout)[^\r\n]*\r\n$";

/// Which of the modem's two serial ports the host is cabled to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HostPort {
    /// Serial port 1
    #[default]
    P1,
    /// Serial port 2
    P2,
}

impl HostPort {
    /// Port number as the modem numbers it
    pub fn number(self) -> u8 {
        match self {
            HostPort::P1 => 1,
            HostPort::P2 => 2,
        }
    }
}

/// Fixed waits used by the mode state machine and response accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Silence required before the escape sequence (ms)
    pub guard_ms: u64,
    /// Wait after the escape sequence or online command before reading (ms)
    pub response_ms: u64,
    /// Idle-timeout policy: wait after a command before reading (ms)
    pub settle_ms: u64,
    /// Pattern policy: sleep between polls (ms)
    pub poll_interval_ms: u64,
    /// Pattern policy: maximum number of polls before giving up
    pub max_polls: u32,
    /// Per-read timeout handed to the serial driver (ms)
    pub read_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            guard_ms: 1000,
            response_ms: 500,
            settle_ms: 500,
            poll_interval_ms: 100,
            max_polls: 600,
            read_timeout_ms: 1000,
        }
    }
}

impl Timing {
    /// Zero waits, for simulators and tests
    pub fn immediate() -> Self {
        Self {
            guard_ms: 0,
            response_ms: 0,
            settle_ms: 0,
            poll_interval_ms: 0,
            max_polls: 50,
            read_timeout_ms: 0,
        }
    }

    /// Silence before `+++`
    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }

    /// Wait after `+++` or `ATO`
    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    /// Idle-policy reply wait
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Pattern-policy poll spacing
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Serial driver read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Modem session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Fixed baud rate; `None` probes `probe_rates`
    pub baud_rate: Option<u32>,
    /// Candidate rates for auto-bauding, tried in order
    pub probe_rates: Vec<u32>,
    /// Modem serial port the host is attached to
    pub host_port: HostPort,
    /// Protocol waits
    pub timing: Timing,
    /// Regex closing a link-test transcript
    pub link_test_terminator: String,
    /// Regex closing a multi-rate test transcript
    pub rate_test_terminator: String,
    /// Turn off character echo on the host port once connected. Replies
    /// lead with the echoed command while it is on, which breaks
    /// parameter reads.
    pub disable_echo: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: None,
            probe_rates: SUPPORTED_BAUD_RATES.to_vec(),
            host_port: HostPort::P1,
            timing: Timing::default(),
            link_test_terminator: DEFAULT_LINK_TEST_TERMINATOR.to_string(),
            rate_test_terminator: DEFAULT_RATE_TEST_TERMINATOR.to_string(),
            disable_echo: true,
        }
    }
}

impl ModemConfig {
    /// Defaults for a named port, probing for the baud rate
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Use a fixed baud rate instead of probing
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// Replace the protocol waits
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save as pretty-printed JSON
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
