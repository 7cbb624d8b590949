//! Modem session
//!
//! A [`Session`] owns the transport, the mode state machine and the current
//! link baud rate. Every operation runs to completion before the next one
//! starts; callers sharing a session across threads must serialise access
//! themselves (e.g. behind a `Mutex`).

mod connect;
mod ops;
mod report;

pub use report::{Metric, TestOutcome, TestReport};

use regex::Regex;
use std::thread;

use crate::codec::{Param, ParamCodec, ParamValue, ParameterSpec};
use crate::config::ModemConfig;
use crate::error::{Result, ValidationError};
use crate::protocol::{accumulate, AtCommand, Mode, ModeMachine, Response};
use crate::transport::Transport;

/// Compiled reply terminators for the pattern-framed tests
#[derive(Debug, Clone)]
struct Terminators {
    link_test: Regex,
    rate_test: Regex,
}

impl Terminators {
    fn compile(config: &ModemConfig) -> std::result::Result<Self, ValidationError> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern)
                .map_err(|_| ValidationError::new(name, pattern, "a valid regular expression"))
        };
        Ok(Self {
            link_test: compile("link_test_terminator", &config.link_test_terminator)?,
            rate_test: compile("rate_test_terminator", &config.rate_test_terminator)?,
        })
    }
}

/// A live connection to an acoustic modem
pub struct Session<T: Transport> {
    transport: T,
    mode: ModeMachine,
    baud_rate: u32,
    config: ModemConfig,
    terminators: Terminators,
    /// Online-mode bytes read past the end of a line
    rx_pending: Vec<u8>,
}

impl<T: Transport> Session<T> {
    fn bound(
        transport: T,
        mode: ModeMachine,
        baud_rate: u32,
        config: ModemConfig,
        terminators: Terminators,
    ) -> Self {
        Self {
            transport,
            mode,
            baud_rate,
            config,
            terminators,
            rx_pending: Vec::new(),
        }
    }

    /// Current mode as last confirmed by the modem
    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    /// Baud rate the host side of the link is running at
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Configuration the session was opened with
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// The underlying transport, for inspection
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Close the link and hand the transport back
    pub fn close(mut self) -> T {
        tracing::info!("closing modem session at {} baud", self.baud_rate);
        self.transport.close();
        self.transport
    }

    /// Switch to Configuration mode if needed and run one AT command.
    ///
    /// Nothing is written when the escape handshake fails. Exactly one
    /// command write and one reply read follow otherwise; failed commands are
    /// never retried.
    pub fn execute(&mut self, command: &AtCommand) -> Result<Response> {
        self.mode
            .enter_configuration(&mut self.transport, &self.config.timing)?;

        let wire = command.to_wire();
        tracing::debug!("-> {:?}", wire);
        self.transport.write(wire.as_bytes())?;

        accumulate(
            &mut self.transport,
            &self.config.timing,
            &command.termination(),
            command.keyword(),
        )
    }

    /// Query a parameter
    pub fn get<C: ParamCodec>(&mut self, param: &Param<C>) -> Result<C::Decoded> {
        let spec = &param.spec;
        let response = self.execute(&AtCommand::new(spec.keyword))?;
        let line = response.line(spec.keyword, spec.line)?;
        Ok(param.decode(line)?)
    }

    /// Query a parameter through its untyped descriptor
    pub fn get_value(&mut self, spec: &ParameterSpec) -> Result<ParamValue> {
        let response = self.execute(&AtCommand::new(spec.keyword))?;
        let line = response.line(spec.keyword, spec.line)?;
        Ok(spec.decode_value(line)?)
    }

    /// Validate and assign a parameter.
    ///
    /// An invalid value fails before the transport is touched. Changing the
    /// baud rate of the port the host is attached to reopens the link at the
    /// new rate before returning.
    pub fn set<C: ParamCodec>(&mut self, param: &Param<C>, value: C::Value) -> Result<()> {
        let spec = &param.spec;
        let wire = param.encode(&value)?;

        let response = self.execute(&AtCommand::new(spec.keyword).with_value(&wire))?;
        tracing::debug!("{} = {} -> {:?}", spec.name, wire, response.lines());

        if spec.baud_of_port == Some(self.config.host_port.number()) {
            let rate = wire
                .parse::<u32>()
                .map_err(|_| ValidationError::new(spec.name, &wire, spec.domain.to_string()))?;
            self.follow_baud_rate(rate)?;
        }
        Ok(())
    }

    /// Reopen the transport at the rate the modem has just switched to
    fn follow_baud_rate(&mut self, rate: u32) -> Result<()> {
        self.transport.close();
        self.transport.open(rate)?;
        tracing::info!("link baud rate changed {} -> {}", self.baud_rate, rate);
        self.baud_rate = rate;
        self.rx_pending.clear();
        Ok(())
    }

    /// Send payload over the acoustic link, returning to Online mode first
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.mode
            .enter_online(&mut self.transport, &self.config.timing)?;
        tracing::debug!("payload -> {} bytes", data.len());
        self.transport.write(data)?;
        Ok(())
    }

    /// Read up to `n` payload bytes, or everything available when `n` is None
    pub fn read(&mut self, n: Option<usize>) -> Result<Vec<u8>> {
        self.mode
            .enter_online(&mut self.transport, &self.config.timing)?;

        let mut data = std::mem::take(&mut self.rx_pending);
        match n {
            Some(n) if data.len() >= n => {
                self.rx_pending = data.split_off(n);
            }
            Some(n) => {
                let wanted = n - data.len();
                let available = self.transport.bytes_available()?;
                if available > 0 {
                    data.extend(self.transport.read(wanted.min(available))?);
                }
            }
            None => data.extend(self.transport.read_available()?),
        }
        Ok(data)
    }

    /// Read one payload line, without its terminator.
    ///
    /// Polls for at most the configured bound; returns `None` if no complete
    /// line arrived, keeping any partial line for the next read.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.mode
            .enter_online(&mut self.transport, &self.config.timing)?;

        for _ in 0..self.config.timing.max_polls {
            if let Some(pos) = self.rx_pending.iter().position(|&b| b == b'\n') {
                let rest = self.rx_pending.split_off(pos + 1);
                let line = std::mem::replace(&mut self.rx_pending, rest);
                let text = String::from_utf8_lossy(&line);
                return Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()));
            }
            let chunk = self.transport.read_available()?;
            if chunk.is_empty() {
                thread::sleep(self.config.timing.poll_interval());
            } else {
                self.rx_pending.extend(chunk);
            }
        }
        Ok(None)
    }
}
