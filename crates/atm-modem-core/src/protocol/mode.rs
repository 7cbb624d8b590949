//! Configuration/Online mode state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;

use super::{ESCAPE_SEQUENCE, LINE_TERMINATOR, ONLINE_COMMAND};
use crate::config::Timing;
use crate::error::{ProtocolError, Result};
use crate::transport::Transport;

/// Modem operating mode as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// AT commands are interpreted as configuration requests
    Configuration,
    /// Bytes are payload relayed over the acoustic link
    Online,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Configuration => f.write_str("configuration"),
            Mode::Online => f.write_str("online"),
        }
    }
}

/// Tracks the modem's mode and performs the two entry handshakes.
///
/// The mode only changes here, and only after the modem has answered.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: Mode,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    /// State after opening a link: assumed Online until proven otherwise
    pub fn new() -> Self {
        Self { mode: Mode::Online }
    }

    /// Mode last confirmed by the modem
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Escape to Configuration mode with the guarded `+++` sequence.
    ///
    /// The escape is only recognised after a silent guard interval, so the
    /// guard wait must never be skipped.
    pub fn enter_configuration<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timing: &Timing,
    ) -> Result<()> {
        if self.mode == Mode::Configuration {
            return Ok(());
        }

        thread::sleep(timing.guard());
        transport.write(ESCAPE_SEQUENCE)?;
        thread::sleep(timing.response());

        self.finish_transition(transport, Mode::Configuration)
    }

    /// Return to Online mode with `ATO`
    pub fn enter_online<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timing: &Timing,
    ) -> Result<()> {
        if self.mode == Mode::Online {
            return Ok(());
        }

        transport.write(format!("{}{}", ONLINE_COMMAND, LINE_TERMINATOR).as_bytes())?;
        thread::sleep(timing.response());

        self.finish_transition(transport, Mode::Online)
    }

    /// Record that the modem acknowledged a dial with `CONNECT` and is now
    /// Online
    pub(crate) fn dialled(&mut self) {
        if self.mode != Mode::Online {
            tracing::info!("modem entered {} mode after dial", Mode::Online);
        }
        self.mode = Mode::Online;
    }

    fn finish_transition<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        target: Mode,
    ) -> Result<()> {
        let reply = transport.read_available()?;
        let text = String::from_utf8_lossy(&reply);
        tracing::debug!("{} mode reply: {:?}", target, text);

        if text.contains(LINE_TERMINATOR) {
            tracing::info!("modem entered {} mode", target);
            self.mode = target;
            Ok(())
        } else {
            tracing::warn!("modem did not acknowledge {} mode", target);
            Err(ProtocolError::ModeEntryFailed { target }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModemError;
    use crate::transport::MockTransport;

    fn open(mut mock: MockTransport) -> MockTransport {
        mock.open(9600).unwrap();
        mock
    }

    #[test]
    fn test_initial_mode_is_online() {
        assert_eq!(ModeMachine::new().mode(), Mode::Online);
    }

    #[test]
    fn test_round_trip_sends_two_escapes() {
        let mut mock = open(MockTransport::answering("OK\r\n"));
        let log = mock.log();
        let timing = Timing::immediate();
        let mut machine = ModeMachine::new();

        machine.enter_configuration(&mut mock, &timing).unwrap();
        machine.enter_online(&mut mock, &timing).unwrap();
        machine.enter_configuration(&mut mock, &timing).unwrap();
        machine.enter_configuration(&mut mock, &timing).unwrap();

        assert_eq!(machine.mode(), Mode::Configuration);
        let escapes = log.writes().iter().filter(|w| *w == "+++").count();
        assert_eq!(escapes, 2);
        assert_eq!(log.writes(), vec!["+++", "ATO\r\n", "+++"]);
    }

    #[test]
    fn test_enter_online_is_noop_when_online() {
        let mut mock = open(MockTransport::new());
        let log = mock.log();
        let mut machine = ModeMachine::new();
        machine.enter_online(&mut mock, &Timing::immediate()).unwrap();
        assert_eq!(log.write_count(), 0);
    }

    #[test]
    fn test_silent_modem_fails_escape() {
        let mut mock = open(MockTransport::new());
        let mut machine = ModeMachine::new();
        let result = machine.enter_configuration(&mut mock, &Timing::immediate());

        assert!(matches!(
            result,
            Err(ModemError::Protocol(ProtocolError::ModeEntryFailed {
                target: Mode::Configuration
            }))
        ));
        assert_eq!(machine.mode(), Mode::Online);
    }

    #[test]
    fn test_reply_without_terminator_fails_online_entry() {
        let mut mock = open(MockTransport::new().with_responder(|data, _| {
            if data == b"+++" {
                vec![b"OK\r\n".to_vec()]
            } else {
                vec![b"ERR".to_vec()]
            }
        }));
        let timing = Timing::immediate();
        let mut machine = ModeMachine::new();
        machine.enter_configuration(&mut mock, &timing).unwrap();

        let result = machine.enter_online(&mut mock, &timing);
        assert!(matches!(
            result,
            Err(ModemError::Protocol(ProtocolError::ModeEntryFailed {
                target: Mode::Online
            }))
        ));
        assert_eq!(machine.mode(), Mode::Configuration);
    }
}
