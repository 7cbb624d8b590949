//! Error types
//!
//! One enum per failure family, plus [`ModemError`] which every public
//! session operation returns so callers can match on the family they care
//! about.

use thiserror::Error;

use crate::protocol::Mode;

/// Failures of the underlying byte stream
#[derive(Error, Debug)]
pub enum TransportError {
    /// The serial driver reported a failure
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Read or write before `open`
    #[error("Transport is not open")]
    NotOpen,

    /// Operating system I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        TransportError::Serial(e.to_string())
    }
}

/// A caller-supplied value fell outside a parameter's accepted domain.
///
/// Raised before anything is written to the transport.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid value {value} for {parameter}: accepted values are {accepted}")]
pub struct ValidationError {
    /// Parameter or argument name
    pub parameter: String,
    /// The rejected value as the caller supplied it
    pub value: String,
    /// Human readable description of the accepted domain
    pub accepted: String,
}

impl ValidationError {
    /// Rejection of `value` for `parameter`, with `accepted` describing the
    /// domain
    pub fn new(
        parameter: impl Into<String>,
        value: impl ToString,
        accepted: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.to_string(),
            accepted: accepted.into(),
        }
    }
}

/// Errors in the command/response exchange with the modem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The modem did not acknowledge a mode switch
    #[error("Entering {target} mode failed: no line terminator in reply")]
    ModeEntryFailed {
        /// Mode that was requested
        target: Mode,
    },

    /// Nothing arrived in reply to `command`
    #[error("No response to {command:?}")]
    NoResponse {
        /// Command keyword
        command: String,
    },

    /// A reply line could not be interpreted
    #[error("Unexpected response to {command:?}: {line:?}")]
    UnexpectedResponse {
        /// Command keyword
        command: String,
        /// The raw line, or the whole reply when a line was missing
        line: String,
    },
}

/// Errors while establishing a session
#[derive(Error, Debug)]
pub enum ConnectError {
    /// No candidate rate completed the escape/online handshake
    #[error("No modem detected (tried baud rates {tried:?})")]
    NoModemDetected {
        /// Rates tried, in order
        tried: Vec<u32>,
    },

    /// The probe was given an empty list of rates
    #[error("No candidate baud rates to probe")]
    NoCandidates,
}

/// Failures loading or saving a [`ModemConfig`](crate::config::ModemConfig) file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("Config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid configuration
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error returned by session operations
#[derive(Error, Debug)]
pub enum ModemError {
    /// Rejected before anything was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Command/response exchange failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Session establishment failure
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Byte stream failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration file failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<std::io::Error> for ModemError {
    fn from(e: std::io::Error) -> Self {
        ModemError::Transport(TransportError::Io(e))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ModemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_parameter_and_domain() {
        let err = ValidationError::new("TxPower", 9, "1-8");
        let msg = err.to_string();
        assert!(msg.contains("TxPower"));
        assert!(msg.contains('9'));
        assert!(msg.contains("1-8"));
    }

    #[test]
    fn test_unexpected_response_keeps_raw_line() {
        let err = ProtocolError::UnexpectedResponse {
            command: "@RingBuf".to_string(),
            line: "garbage".to_string(),
        };
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_umbrella_conversions() {
        let err: ModemError = ProtocolError::ModeEntryFailed {
            target: Mode::Configuration,
        }
        .into();
        assert!(matches!(
            err,
            ModemError::Protocol(ProtocolError::ModeEntryFailed { .. })
        ));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: ModemError = io.into();
        assert!(matches!(err, ModemError::Transport(TransportError::Io(_))));
    }
}
