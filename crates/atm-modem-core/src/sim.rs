//! Simulated modem
//!
//! An in-memory ATM-900 that speaks the AT protocol over the [`Transport`]
//! interface, for exercising sessions without hardware. It keeps its own
//! mode, baud rate, settings table and S-registers, answers in the vendor's
//! reply shapes, and only understands the host at its own baud rate.
//!
//! Online-mode payload is looped back as if echoed by the remote modem.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};

use crate::codec::params::{self, ALL};
use crate::codec::{Domain, ParameterSpec, Rule};
use crate::config::HostPort;
use crate::error::TransportError;
use crate::protocol::{Mode, ESCAPE_SEQUENCE, LINE_TERMINATOR};
use crate::transport::Transport;

/// What the host receives when its baud rate does not match the modem's
const LINE_NOISE: &[u8] = b"\xfe\x80\x1c\xf8";

/// Acoustic bit rates swept by the multi-rate test
const RATE_TEST_RATES: [u8; 4] = [2, 5, 9, 13];

/// In-memory modem implementing [`Transport`]
pub struct SimulatedModem {
    /// Rate the modem's host-side port runs at
    baud_rate: u32,
    host_port: HostPort,
    /// Rate the host opened the link at, if open
    link_rate: Option<u32>,
    mode: Mode,
    settings: HashMap<&'static str, String>,
    registers: HashMap<u8, u8>,
    /// Addresses of remote modems within acoustic range
    remotes: Vec<u8>,
    serial_number: u32,
    /// Unterminated command text
    inbox: Vec<u8>,
    /// Reply chunks; one becomes readable per poll
    outbox: VecDeque<Vec<u8>>,
    available: VecDeque<u8>,
    rng: StdRng,
}

impl SimulatedModem {
    /// A modem listening at `baud_rate`, with factory settings and one
    /// remote modem at address 1
    pub fn new(baud_rate: u32) -> Self {
        let mut modem = Self {
            baud_rate,
            host_port: HostPort::P1,
            link_rate: None,
            mode: Mode::Online,
            settings: HashMap::new(),
            registers: HashMap::new(),
            remotes: vec![1],
            serial_number: 90210,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            available: VecDeque::new(),
            rng: StdRng::seed_from_u64(0x41_54_4d),
        };
        modem.factory_defaults();
        modem
    }

    /// Cable the host to serial port 2 instead of 1
    pub fn with_host_port(mut self, port: HostPort) -> Self {
        self.host_port = port;
        self.factory_defaults();
        self
    }

    /// Add a remote modem within acoustic range
    pub fn with_remote(mut self, address: u8) -> Self {
        if !self.remotes.contains(&address) {
            self.remotes.push(address);
        }
        self
    }

    /// Reseed the jitter applied to test transcripts
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Turn character echo on the host port on or off
    pub fn with_echo(mut self, echo: bool) -> Self {
        let keyword = params::echo_char(self.host_port).keyword();
        let value = if echo { "Ena" } else { "Dis" };
        self.settings.insert(keyword, value.to_string());
        self
    }

    /// Mode the simulated modem is in
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Rate the host-side port currently runs at
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Current wire value of a setting, by keyword or name
    pub fn setting(&self, name: &str) -> Option<&str> {
        lookup(name).and_then(|spec| self.settings.get(spec.keyword).map(String::as_str))
    }

    fn factory_defaults(&mut self) {
        self.settings = ALL
            .iter()
            .map(|spec| (spec.keyword, self.default_value(spec)))
            .collect();
        self.registers.clear();
    }

    fn default_value(&self, spec: &ParameterSpec) -> String {
        if let Some(port) = spec.baud_of_port {
            let rate = if port == self.host_port.number() {
                self.baud_rate
            } else {
                9600
            };
            return rate.to_string();
        }
        match (spec.rule, spec.domain) {
            (Rule::Enable, _) => "Dis".to_string(),
            (Rule::Text, _) => "00:00:00".to_string(),
            (Rule::Scaled(factor), Domain::Stepped { min, .. }) => {
                ((min * factor).round() as i64).to_string()
            }
            (_, Domain::Stepped { min, .. }) => format!("{}", min),
            (_, domain) => domain
                .values()
                .and_then(|values| values.first().copied())
                .unwrap_or(0)
                .to_string(),
        }
    }

    fn echoing(&self) -> bool {
        let keyword = params::echo_char(self.host_port).keyword();
        self.settings.get(keyword).map(String::as_str) == Some("Ena")
    }

    fn reply(&mut self, lines: &[String]) {
        let mut text = String::from(LINE_TERMINATOR);
        for line in lines {
            text.push_str(line);
            text.push_str(LINE_TERMINATOR);
        }
        self.outbox.push_back(text.into_bytes());
    }

    fn reply_line(&mut self, line: &str) {
        self.reply(&[line.to_string()]);
    }

    /// Queue a transcript one line per poll, as it would arrive acoustically
    fn transcript(&mut self, lines: Vec<String>) {
        for line in lines {
            self.outbox
                .push_back(format!("{}{}", line, LINE_TERMINATOR).into_bytes());
        }
    }

    fn receive(&mut self, data: &[u8]) {
        if self.link_rate != Some(self.baud_rate) {
            self.outbox.push_back(LINE_NOISE.to_vec());
            return;
        }

        if data == ESCAPE_SEQUENCE {
            self.mode = Mode::Configuration;
            self.inbox.clear();
            self.reply_line("OK");
            return;
        }

        match self.mode {
            Mode::Online => self.outbox.push_back(data.to_vec()),
            Mode::Configuration => {
                self.inbox.extend_from_slice(data);
                while let Some(pos) = self.inbox.windows(2).position(|w| w == b"\r\n") {
                    let line: Vec<u8> = self.inbox.drain(..pos + 2).collect();
                    let command = String::from_utf8_lossy(&line[..pos]).trim().to_string();

                    // Echo goes out ahead of the reply, in the same burst
                    let echo = self.echoing();
                    let first_reply = self.outbox.len();
                    self.command(&command);
                    if echo {
                        let mut burst = line;
                        if let Some(reply) = self.outbox.get(first_reply) {
                            burst.extend_from_slice(reply);
                            self.outbox[first_reply] = burst;
                        } else {
                            self.outbox.push_back(burst);
                        }
                    }
                }
            }
        }
    }

    fn command(&mut self, command: &str) {
        tracing::debug!("simulated modem <- {:?}", command);
        let upper = command.to_ascii_uppercase();

        if command.starts_with('@') {
            self.parameter(command);
        } else if upper == "ATO" {
            self.mode = Mode::Online;
            self.reply_line("CONNECT");
        } else if upper == "AT" || upper == "ATES" || upper == "ATEU" || upper == "AT&W" {
            self.reply_line("OK");
        } else if upper == "ATH" {
            self.reply_line("DISCONNECTED");
        } else if upper == "AT&F" {
            self.factory_defaults();
            self.reply_line("OK");
        } else if upper == "ATI" {
            let lines = self.identification();
            self.reply(&lines);
        } else if upper == "ATV" {
            let volts = 12.4 + self.rng.gen_range(-0.05..0.05);
            let temp = 18.5 + self.rng.gen_range(-0.5..0.5);
            self.reply(&[
                "Status".to_string(),
                format!("Voltage = {:.2} V", volts),
                format!("Temp = {:.1} C", temp),
            ]);
        } else if upper == "ATC" {
            let lines = self.mode_report();
            self.reply(&lines);
        } else if let Some(rest) = upper.strip_prefix("ATS") {
            self.register(rest);
        } else if let Some(address) = upper.strip_prefix("ATD").and_then(|a| a.parse().ok()) {
            self.dial(address);
        } else if let Some(address) = upper.strip_prefix("ATX").and_then(|a| a.parse().ok()) {
            let lines = self.link_test(address);
            self.transcript(lines);
        } else if let Some(address) = upper.strip_prefix("ATY").and_then(|a| a.parse().ok()) {
            let lines = self.rate_test(address);
            self.transcript(lines);
        } else if upper.starts_with("AT$") {
            self.remote_command(&upper[3..]);
        } else {
            self.reply_line("ERROR");
        }
    }

    fn parameter(&mut self, command: &str) {
        let (keyword, value) = match command.split_once('=') {
            Some((keyword, value)) => (keyword, Some(value.trim())),
            None => (command, None),
        };
        let Some(spec) = lookup(keyword) else {
            self.reply_line("ERROR");
            return;
        };

        match value {
            None => {
                let stored = self.settings.get(spec.keyword).cloned().unwrap_or_default();
                let line = match spec.rule {
                    Rule::Coded => {
                        let code = stored.parse::<i64>().unwrap_or(0);
                        format!("{} ({})", code, code_name(spec, code))
                    }
                    _ => stored,
                };
                self.reply_line(&line);
            }
            Some(value) => {
                self.settings.insert(spec.keyword, value.to_string());
                self.reply_line("OK");
                if spec.baud_of_port == Some(self.host_port.number()) {
                    if let Ok(rate) = value.parse::<u32>() {
                        tracing::debug!("simulated modem now at {} baud", rate);
                        self.baud_rate = rate;
                    }
                }
            }
        }
    }

    fn register(&mut self, rest: &str) {
        if let Some(n) = rest.strip_suffix('?').and_then(|n| n.parse::<u8>().ok()) {
            let value = self.registers.get(&n).copied().unwrap_or(0);
            self.reply_line(&format!("S{}={}", n, value));
            return;
        }
        let assignment = rest
            .split_once('=')
            .and_then(|(n, v)| Some((n.parse::<u8>().ok()?, v.parse::<u8>().ok()?)));
        match assignment {
            Some((n, value)) => {
                self.registers.insert(n, value);
                self.reply_line("OK");
            }
            None => self.reply_line("ERROR"),
        }
    }

    fn dial(&mut self, address: u8) {
        if self.remotes.contains(&address) {
            self.mode = Mode::Online;
            self.reply_line(&format!("CONNECT {}", address));
        } else {
            self.reply_line("NO CARRIER");
        }
    }

    fn remote_command(&mut self, args: &str) {
        let address = args
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .split(',')
            .next()
            .and_then(|a| a.parse::<u8>().ok());
        match address {
            Some(a) if self.remotes.contains(&a) || a == 255 => self.reply_line("OK"),
            Some(_) => self.reply_line("NO REPLY"),
            None => self.reply_line("ERROR"),
        }
    }

    fn identification(&self) -> Vec<String> {
        vec![
            "Teledyne Benthos ATM-900 Series".to_string(),
            "Firmware Version 8.10.0".to_string(),
            "Build 2219".to_string(),
            format!("Serial Number: {}", self.serial_number),
            "OK".to_string(),
        ]
    }

    fn mode_report(&self) -> Vec<String> {
        let setting = |keyword: &str| self.settings.get(keyword).cloned().unwrap_or_default();
        vec![
            format!("Local Address: {}", setting(params::LOCAL_ADDR.keyword())),
            format!("Remote Address: {}", setting(params::REMOTE_ADDR.keyword())),
            format!("Tx Rate: {}", setting(params::TX_RATE.keyword())),
            format!("Tx Power: {}", setting(params::TX_POWER.keyword())),
            format!("Host Baud: {}", self.baud_rate),
        ]
    }

    fn snr(&mut self, base: f64) -> f64 {
        base + self.rng.gen_range(-1.5..1.5)
    }

    fn link_test(&mut self, address: u8) -> Vec<String> {
        let mut lines = vec![format!("Link test to modem {}", address)];
        if !self.remotes.contains(&address) {
            lines.push("Link test FAILED: no reply".to_string());
            return lines;
        }
        let range = 1500.0 + self.rng.gen_range(-25.0..25.0);
        let snr = self.snr(18.0);
        lines.push(format!("Range = {:.1} m", range));
        lines.push(format!("SNR = {:.1} dB", snr));
        lines.push(format!("AGC = {}", self.rng.gen_range(30..60)));
        lines.push("Link test PASSED".to_string());
        lines
    }

    fn rate_test(&mut self, address: u8) -> Vec<String> {
        let mut lines = vec![format!("Multi-rate test to modem {}", address)];
        if !self.remotes.contains(&address) {
            lines.push("Rate test aborted: no reply".to_string());
            return lines;
        }
        for rate in RATE_TEST_RATES {
            let snr = self.snr(22.0 - f64::from(rate));
            let errors = if snr < 12.0 { 3 } else { 0 };
            lines.push(format!(
                "Rate {}: SNR = {:.1} dB; Errors = {}",
                rate, snr, errors
            ));
        }
        lines.push("Rate test complete".to_string());
        lines
    }
}

/// Look a parameter up by keyword or name
fn lookup(name: &str) -> Option<&'static ParameterSpec> {
    params::find(name).or_else(|| {
        ALL.iter()
            .copied()
            .find(|spec| spec.keyword.eq_ignore_ascii_case(name))
    })
}

/// Names the modem prints next to coded values
fn code_name(spec: &ParameterSpec, code: i64) -> String {
    let name = match (spec.name, code) {
        ("P1FlowCtl" | "P2FlowCtl", 0) => "None",
        ("P1FlowCtl" | "P2FlowCtl", 1) => "SW",
        ("P1FlowCtl" | "P2FlowCtl", 2) => "HW",
        ("P1FlowCtl" | "P2FlowCtl", 3) => "HW-LP",
        ("P1Protocol", 0) => "RS-232",
        ("P1Protocol", 1) => "RS-422",
        ("Dst1" | "Dst2", 1) => "P1",
        ("Dst1" | "Dst2", 2) => "P2",
        _ => return format!("Setting {}", code),
    };
    name.to_string()
}

impl Transport for SimulatedModem {
    fn open(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        self.link_rate = Some(baud_rate);
        self.inbox.clear();
        self.outbox.clear();
        self.available.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.link_rate = None;
    }

    fn is_open(&self) -> bool {
        self.link_rate.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.link_rate.is_none() {
            return Err(TransportError::NotOpen);
        }
        self.receive(data);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        if self.link_rate.is_none() {
            return Err(TransportError::NotOpen);
        }
        if let Some(chunk) = self.outbox.pop_front() {
            self.available.extend(chunk);
        }
        Ok(self.available.len())
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        if self.link_rate.is_none() {
            return Err(TransportError::NotOpen);
        }
        let n = n.min(self.available.len());
        Ok(self.available.drain(..n).collect())
    }
}
