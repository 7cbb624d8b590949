//! Named modem operations: actions, addressed remote commands, acoustic
//! tests and status queries

use super::{Session, TestReport};
use crate::codec::params::{
    ADDRESSES, BIT_RATES, POWER_LEVELS, REGISTERS, REGISTER_VALUES, SERIAL_PORTS,
};
use crate::codec::Domain;
use crate::error::{ProtocolError, Result, ValidationError};
use crate::protocol::AtCommand;
use crate::transport::Transport;

fn check(domain: &Domain, parameter: &str, value: u8) -> std::result::Result<u8, ValidationError> {
    domain.check_int(parameter, i64::from(value))?;
    Ok(value)
}

/// Text after the first `sep` in `line`, with `strip` characters removed
/// from both ends
fn field_after<'a>(
    command: &str,
    line: &'a str,
    sep: char,
    strip: &[char],
) -> std::result::Result<&'a str, ProtocolError> {
    line.split_once(sep)
        .map(|(_, rest)| rest.trim_matches(|c: char| c == ' ' || strip.contains(&c)))
        .ok_or_else(|| ProtocolError::UnexpectedResponse {
            command: command.to_string(),
            line: line.to_string(),
        })
}

fn parse_field<V: std::str::FromStr>(
    command: &str,
    line: &str,
    field: &str,
) -> std::result::Result<V, ProtocolError> {
    field.parse().map_err(|_| ProtocolError::UnexpectedResponse {
        command: command.to_string(),
        line: line.to_string(),
    })
}

impl<T: Transport> Session<T> {
    fn action(&mut self, keyword: &str) -> Result<Vec<String>> {
        let response = self.execute(&AtCommand::new(keyword))?;
        tracing::info!("{} -> {:?}", keyword, response.lines());
        Ok(response.into_lines())
    }

    /// Bare `AT`; the reply lines are returned as sent
    pub fn attention(&mut self) -> Result<Vec<String>> {
        self.action("AT")
    }

    /// Reboot the local modem's firmware
    pub fn reboot(&mut self) -> Result<Vec<String>> {
        self.action("ATES")
    }

    /// Start the modem's firmware update loader
    pub fn update_firmware(&mut self) -> Result<Vec<String>> {
        self.action("ATEU")
    }

    /// Restore factory settings
    pub fn factory_reset(&mut self) -> Result<Vec<String>> {
        self.action("AT&F")
    }

    /// Drop the acoustic link
    pub fn hang_up(&mut self) -> Result<Vec<String>> {
        self.action("ATH")
    }

    /// Store the current settings in flash
    pub fn write_settings(&mut self) -> Result<Vec<String>> {
        self.action("AT&W")
    }

    /// Reboot the remote modem at `address`
    pub fn remote_reset(&mut self, address: u8) -> Result<Vec<String>> {
        let address = check(&ADDRESSES, "address", address)?;
        self.action(&format!("AT$ES{}", address))
    }

    /// Open an acoustic link to `address`.
    ///
    /// The modem goes Online when it answers `CONNECT`, and the session
    /// follows. Any other reply (`NO CARRIER`, `ERROR`) leaves both in
    /// Configuration mode.
    pub fn dial(&mut self, address: u8) -> Result<Vec<String>> {
        let address = check(&ADDRESSES, "address", address)?;
        let lines = self.action(&format!("ATD{}", address))?;
        if lines.iter().any(|line| line.starts_with("CONNECT")) {
            self.mode.dialled();
        }
        Ok(lines)
    }

    /// Send a break to serial `port` of the remote modem
    pub fn remote_break(&mut self, address: u8, port: u8) -> Result<Vec<String>> {
        let address = check(&ADDRESSES, "address", address)?;
        let port = check(&SERIAL_PORTS, "port", port)?;
        self.action(&format!("AT$K{},{}", address, port))
    }

    /// Set the remote modem's transmit power level
    pub fn remote_power(&mut self, address: u8, level: u8) -> Result<Vec<String>> {
        let address = check(&ADDRESSES, "address", address)?;
        let level = check(&POWER_LEVELS, "level", level)?;
        self.action(&format!("AT$P{},{}", address, level))
    }

    /// Set the remote modem's acoustic bit rate
    pub fn remote_rate(&mut self, address: u8, rate: u8) -> Result<Vec<String>> {
        let address = check(&ADDRESSES, "address", address)?;
        let rate = check(&BIT_RATES, "rate", rate)?;
        self.action(&format!("AT$A{},{}", address, rate))
    }

    /// Acoustic link test against `address`
    pub fn link_test(&mut self, address: u8) -> Result<TestReport> {
        let address = check(&ADDRESSES, "address", address)?;
        let command =
            AtCommand::new(format!("ATX{}", address)).until(self.terminators.link_test.clone());
        self.run_test(address, command)
    }

    /// Multi-rate test against `address`
    pub fn rate_test(&mut self, address: u8) -> Result<TestReport> {
        let address = check(&ADDRESSES, "address", address)?;
        let command =
            AtCommand::new(format!("ATY{}", address)).until(self.terminators.rate_test.clone());
        self.run_test(address, command)
    }

    fn run_test(&mut self, address: u8, command: AtCommand) -> Result<TestReport> {
        let response = self.execute(&command)?;
        let report = TestReport::from_response(address, response);
        tracing::info!(
            "{} finished: {:?} with {} metrics",
            command,
            report.outcome,
            report.metrics.len()
        );
        Ok(report)
    }

    /// Read S-register `register`
    pub fn read_register(&mut self, register: u8) -> Result<i64> {
        let register = check(&REGISTERS, "register", register)?;
        let keyword = format!("ATS{}?", register);
        let response = self.execute(&AtCommand::new(keyword.as_str()))?;
        let line = response.line(&keyword, 0)?;
        // Some firmware echoes "S<n>=<value>"
        let field = line.rsplit('=').next().unwrap_or(line).trim();
        Ok(parse_field(&keyword, line, field)?)
    }

    /// Set S-register `register` to `value`
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<Vec<String>> {
        let register = check(&REGISTERS, "register", register)?;
        let value = check(&REGISTER_VALUES, "value", value)?;
        self.action(&format!("ATS{}={}", register, value))
    }

    /// Firmware identification: every `ATI` line but the closing one
    pub fn firmware_version(&mut self) -> Result<Vec<String>> {
        let response = self.execute(&AtCommand::new("ATI"))?;
        if response.is_empty() {
            return Err(ProtocolError::NoResponse {
                command: "ATI".to_string(),
            }
            .into());
        }
        let mut lines = response.into_lines();
        lines.pop();
        Ok(lines)
    }

    /// Serial number from the `ATI` banner
    pub fn serial_number(&mut self) -> Result<u32> {
        let response = self.execute(&AtCommand::new("ATI"))?;
        let line = response.line("ATI", 3)?;
        let field = field_after("ATI", line, ':', &[])?;
        Ok(parse_field("ATI", line, field)?)
    }

    /// Supply voltage in volts
    pub fn voltage(&mut self) -> Result<f64> {
        self.status_reading(1, 'V')
    }

    /// Internal temperature in degrees C
    pub fn temperature(&mut self) -> Result<f64> {
        self.status_reading(2, 'C')
    }

    fn status_reading(&mut self, index: usize, unit: char) -> Result<f64> {
        let response = self.execute(&AtCommand::new("ATV"))?;
        let line = response.line("ATV", index)?;
        let field = field_after("ATV", line, '=', &[unit])?;
        Ok(parse_field("ATV", line, field)?)
    }

    /// Raw `ATC` mode report
    pub fn mode_report(&mut self) -> Result<Vec<String>> {
        Ok(self.execute(&AtCommand::new("ATC"))?.into_lines())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModemConfig, Timing};
    use crate::error::ModemError;
    use crate::protocol::Mode;
    use crate::session::TestOutcome;
    use crate::transport::MockTransport;

    fn session(reply: &'static str) -> (Session<MockTransport>, crate::transport::MockLog) {
        let mock = MockTransport::answering(reply);
        let log = mock.log();
        let config = ModemConfig::for_port("mock")
            .with_baud_rate(9600)
            .with_timing(Timing::immediate());
        let session = Session::connect(mock, config).unwrap();
        log.clear();
        (session, log)
    }

    #[test]
    fn test_addressed_command_wire_forms() {
        let (mut s, log) = session("OK\r\n");
        s.remote_reset(7).unwrap();
        s.remote_break(7, 2).unwrap();
        s.remote_power(255, 8).unwrap();
        s.remote_rate(0, 13).unwrap();

        assert_eq!(
            log.writes(),
            vec!["+++", "AT$ES7\r\n", "AT$K7,2\r\n", "AT$P255,8\r\n", "AT$A0,13\r\n"]
        );
    }

    #[test]
    fn test_addressed_command_validation() {
        let (mut s, log) = session("OK\r\n");
        assert!(matches!(s.remote_reset(250), Err(ModemError::Validation(_))));
        assert!(matches!(s.remote_break(1, 3), Err(ModemError::Validation(_))));
        assert!(matches!(s.remote_power(1, 0), Err(ModemError::Validation(_))));
        assert!(matches!(s.remote_rate(1, 14), Err(ModemError::Validation(_))));
        assert_eq!(log.write_count(), 0);
    }

    #[test]
    fn test_dial_leaves_session_online() {
        let (mut s, log) = session("CONNECT\r\n");
        s.dial(3).unwrap();
        assert_eq!(s.mode(), Mode::Online);

        // The next command escapes again
        s.hang_up().unwrap();
        assert_eq!(log.writes(), vec!["+++", "ATD3\r\n", "+++", "ATH\r\n"]);
    }

    #[test]
    fn test_rejected_dial_stays_in_configuration() {
        let (mut s, log) = session("NO CARRIER\r\n");
        assert_eq!(s.dial(3).unwrap(), vec!["NO CARRIER"]);
        assert_eq!(s.mode(), Mode::Configuration);

        // No second escape for the next command
        s.hang_up().unwrap();
        assert_eq!(log.writes(), vec!["+++", "ATD3\r\n", "ATH\r\n"]);
    }

    #[test]
    fn test_register_access() {
        let (mut s, log) = session("S12=42\r\n");
        assert_eq!(s.read_register(12).unwrap(), 42);
        s.write_register(12, 7).unwrap();
        assert_eq!(log.writes(), vec!["+++", "ATS12?\r\n", "ATS12=7\r\n"]);
    }

    #[test]
    fn test_status_queries() {
        let (mut s, _) = session("Battery\r\nVoltage = 12.3 V\r\nTemp = 21.5 C\r\n");
        assert_eq!(s.voltage().unwrap(), 12.3);
        assert_eq!(s.temperature().unwrap(), 21.5);
    }

    #[test]
    fn test_firmware_identification() {
        let (mut s, _) = session(
            "ATM-900 Series\r\nVersion 2.1.0\r\nBuilt Mar 3 2016\r\nSerial Number: 1234\r\nOK\r\n",
        );
        assert_eq!(
            s.firmware_version().unwrap(),
            vec![
                "ATM-900 Series",
                "Version 2.1.0",
                "Built Mar 3 2016",
                "Serial Number: 1234"
            ]
        );
        assert_eq!(s.serial_number().unwrap(), 1234);
    }

    #[test]
    fn test_malformed_status_line() {
        let (mut s, _) = session("header\r\nno reading here\r\n");
        match s.voltage() {
            Err(ModemError::Protocol(ProtocolError::UnexpectedResponse { line, .. })) => {
                assert_eq!(line, "no reading here");
            }
            other => panic!("expected UnexpectedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_link_test_report() {
        let (mut s, log) = session("Ranging\r\nRange = 1520.5 m\r\nSNR = 18 dB\r\nPASS\r\n");
        let report = s.link_test(5).unwrap();

        assert_eq!(log.writes(), vec!["+++", "ATX5\r\n"]);
        assert_eq!(report.address, 5);
        assert_eq!(report.outcome, TestOutcome::Passed);
        assert_eq!(report.metric("snr").map(|m| m.value), Some(18.0));
    }

    #[test]
    fn test_unterminated_rate_test_is_incomplete() {
        let (mut s, _) = session("Rate 2: BER = 0\r\n");
        let report = s.rate_test(5).unwrap();
        assert_eq!(report.outcome, TestOutcome::Incomplete);
        assert_eq!(report.lines, vec!["Rate 2: BER = 0"]);
    }
}
