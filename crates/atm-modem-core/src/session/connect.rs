//! Session establishment: explicit baud rate or auto-bauding probe

use std::thread;

use super::{Session, Terminators};
use crate::codec::params::{self, BAUD_RATES};
use crate::config::ModemConfig;
use crate::error::{ConnectError, ModemError, Result};
use crate::protocol::{ModeMachine, LINE_TERMINATOR, ONLINE_COMMAND};
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Bind a session to `transport`.
    ///
    /// Uses `config.baud_rate` when set and probes `config.probe_rates`
    /// otherwise. Every rate is validated before the transport is opened.
    pub fn connect(transport: T, config: ModemConfig) -> Result<Self> {
        match config.baud_rate {
            Some(rate) => Self::open_at(transport, config, rate),
            None => {
                let candidates = config.probe_rates.clone();
                Self::probe(transport, config, &candidates)
            }
        }
    }

    /// Open at a fixed rate and put the modem back Online
    pub fn open_at(mut transport: T, config: ModemConfig, baud_rate: u32) -> Result<Self> {
        BAUD_RATES.check_int("baud_rate", i64::from(baud_rate))?;
        let terminators = Terminators::compile(&config)?;

        transport.open(baud_rate)?;
        tracing::info!("opened {} at {} baud", config.port_name, baud_rate);

        // Whatever state the modem was left in, ATO lands it Online
        transport.write(format!("{}{}", ONLINE_COMMAND, LINE_TERMINATOR).as_bytes())?;
        thread::sleep(config.timing.response());
        let discarded = transport.read_available()?;
        tracing::debug!(
            "discarded {:?} after initial online command",
            String::from_utf8_lossy(&discarded)
        );

        Self::bound(
            transport,
            ModeMachine::new(),
            baud_rate,
            config,
            terminators,
        )
        .settle_echo()
    }

    /// Try each candidate rate in order, using an escape/online round trip
    /// as the liveness check.
    ///
    /// A candidate that fails the handshake is closed before the next one is
    /// opened. Transport failures are not handshake failures and end the
    /// probe immediately.
    pub fn probe(mut transport: T, config: ModemConfig, candidates: &[u32]) -> Result<Self> {
        if candidates.is_empty() {
            return Err(ConnectError::NoCandidates.into());
        }
        for &rate in candidates {
            BAUD_RATES.check_int("baud_rate", i64::from(rate))?;
        }
        let terminators = Terminators::compile(&config)?;

        for &rate in candidates {
            tracing::debug!("probing {} at {} baud", config.port_name, rate);
            transport.open(rate)?;

            let mut mode = ModeMachine::new();
            let handshake = mode
                .enter_configuration(&mut transport, &config.timing)
                .and_then(|()| mode.enter_online(&mut transport, &config.timing));

            match handshake {
                Ok(()) => {
                    tracing::info!("modem detected on {} at {} baud", config.port_name, rate);
                    return Self::bound(transport, mode, rate, config, terminators).settle_echo();
                }
                Err(ModemError::Protocol(e)) => {
                    tracing::warn!("no modem at {} baud: {}", rate, e);
                    transport.close();
                }
                Err(e) => return Err(e),
            }
        }

        Err(ConnectError::NoModemDetected {
            tried: candidates.to_vec(),
        }
        .into())
    }

    /// Turn host-port echo off when configured to, then return Online
    fn settle_echo(mut self) -> Result<Self> {
        if !self.config.disable_echo {
            return Ok(self);
        }
        let echo = params::echo_char(self.config.host_port);
        self.set(echo, false)?;
        self.mode
            .enter_online(&mut self.transport, &self.config.timing)?;
        tracing::info!("character echo disabled on {}", echo.name());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostPort, Timing};
    use crate::error::ValidationError;
    use crate::protocol::Mode;
    use crate::transport::{MockEvent, MockTransport};

    /// Acknowledges handshakes only at `live_rate`
    fn modem_at(live_rate: u32) -> MockTransport {
        MockTransport::new().with_responder(move |data, baud| {
            if baud != live_rate {
                return vec![b"\xf0\x0f".to_vec()];
            }
            match data {
                b"+++" => vec![b"\r\nOK\r\n".to_vec()],
                b"ATO\r\n" => vec![b"\r\nCONNECT\r\n".to_vec()],
                _ => Vec::new(),
            }
        })
    }

    fn probing_config(rates: &[u32]) -> ModemConfig {
        let mut config = ModemConfig::for_port("mock").with_timing(Timing::immediate());
        config.probe_rates = rates.to_vec();
        config
    }

    #[test]
    fn test_probe_skips_dead_rate() {
        let mock = modem_at(9600);
        let log = mock.log();

        let session = Session::connect(mock, probing_config(&[1200, 9600])).unwrap();

        assert_eq!(session.baud_rate(), 9600);
        assert_eq!(session.mode(), Mode::Online);
        assert_eq!(log.opens(), vec![1200, 9600]);
        assert_eq!(log.close_count(), 1);

        let events = log.events();
        let close_at = events.iter().position(|e| *e == MockEvent::Close).unwrap();
        let second_open = events
            .iter()
            .position(|e| *e == MockEvent::Open(9600))
            .unwrap();
        assert!(close_at < second_open);
    }

    #[test]
    fn test_probe_exhausted() {
        let mock = modem_at(57600);
        let log = mock.log();
        let result = Session::connect(mock, probing_config(&[1200, 9600]));

        match result {
            Err(ModemError::Connect(ConnectError::NoModemDetected { tried })) => {
                assert_eq!(tried, vec![1200, 9600]);
            }
            other => panic!("expected NoModemDetected, got {:?}", other.err()),
        }
        assert_eq!(log.close_count(), 2);
    }

    #[test]
    fn test_probe_without_candidates() {
        let result = Session::connect(MockTransport::new(), probing_config(&[]));
        assert!(matches!(
            result,
            Err(ModemError::Connect(ConnectError::NoCandidates))
        ));
    }

    #[test]
    fn test_auto_baud_rejects_unsupported_candidate_before_opening() {
        let mock = modem_at(9600);
        let log = mock.log();
        match Session::connect(mock, probing_config(&[9600, 4801])) {
            Err(ModemError::Validation(ValidationError { parameter, value, .. })) => {
                assert_eq!(parameter, "baud_rate");
                assert_eq!(value, "4801");
            }
            other => panic!("expected validation error, got {:?}", other.err()),
        }
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_unsupported_explicit_rate_never_opens() {
        let mock = modem_at(9600);
        let log = mock.log();
        let config = ModemConfig::for_port("mock")
            .with_baud_rate(4801)
            .with_timing(Timing::immediate());

        match Session::connect(mock, config) {
            Err(ModemError::Validation(ValidationError { parameter, value, .. })) => {
                assert_eq!(parameter, "baud_rate");
                assert_eq!(value, "4801");
            }
            other => panic!("expected validation error, got {:?}", other.err()),
        }
        assert!(log.opens().is_empty());
    }

    #[test]
    fn test_explicit_rate_goes_online_then_disables_echo() {
        let mock = MockTransport::answering("OK\r\n");
        let log = mock.log();
        let config = ModemConfig::for_port("mock")
            .with_baud_rate(19200)
            .with_timing(Timing::immediate());

        let session = Session::connect(mock, config).unwrap();
        assert_eq!(session.baud_rate(), 19200);
        assert_eq!(session.mode(), Mode::Online);
        assert_eq!(log.opens(), vec![19200]);
        assert_eq!(
            log.writes(),
            vec!["ATO\r\n", "+++", "@P1EchoChar=Dis\r\n", "ATO\r\n"]
        );
    }

    #[test]
    fn test_echo_left_alone_when_not_configured() {
        let mock = MockTransport::answering("OK\r\n");
        let log = mock.log();
        let mut config = ModemConfig::for_port("mock")
            .with_baud_rate(19200)
            .with_timing(Timing::immediate());
        config.disable_echo = false;

        Session::connect(mock, config).unwrap();
        assert_eq!(log.writes(), vec!["ATO\r\n"]);
    }

    #[test]
    fn test_echo_disabled_on_host_port_two() {
        let mock = modem_at(9600);
        let log = mock.log();
        let mut config = probing_config(&[9600]);
        config.host_port = HostPort::P2;

        Session::connect(mock, config).unwrap();
        assert!(log.writes().contains(&"@P2EchoChar=Dis\r\n".to_string()));
        assert!(!log.writes().contains(&"@P1EchoChar=Dis\r\n".to_string()));
    }

    #[test]
    fn test_bad_terminator_pattern_is_validation_error() {
        let mock = MockTransport::new();
        let log = mock.log();
        let mut config = ModemConfig::for_port("mock").with_baud_rate(9600);
        config.link_test_terminator = "(unclosed".to_string();

        let result = Session::connect(mock, config);
        assert!(matches!(result, Err(ModemError::Validation(_))));
        assert!(log.events().is_empty());
    }
}
