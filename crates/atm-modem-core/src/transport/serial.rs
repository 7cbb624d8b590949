//! Serial port transport
//!
//! Physical RS-232/RS-422 link to the modem, backed by the `serialport` crate.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;

use super::Transport;
use crate::error::TransportError;

/// Device name stems of USB-serial adapters, listed ahead of other ports
const USB_SERIAL_STEMS: [&str; 2] = ["ttyUSB", "ttyACM"];

/// A serial port the modem might be on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub name: String,
    /// USB product string, when the port is a USB adapter that reports one
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let product = match info.port_type {
            SerialPortType::UsbPort(usb) => usb.product,
            _ => None,
        };
        Self {
            name: info.port_name,
            product,
        }
    }
}

/// USB adapters first, then by name stem and numeric suffix, so that
/// `COM3` precedes `COM10`
fn port_sort_key(name: &str) -> (usize, String, u32) {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = basename.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = basename[stem.len()..].parse().unwrap_or(0);
    let group = USB_SERIAL_STEMS
        .iter()
        .position(|s| *s == stem)
        .unwrap_or(USB_SERIAL_STEMS.len());
    (group, stem.to_string(), number)
}

/// Serial ports on this machine, USB adapters first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(found) => found.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("serial port enumeration failed: {}", e);
            Vec::new()
        }
    };
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports.dedup_by(|a, b| a.name == b.name);
    ports
}

/// 8N1, no flow control, DTR/RTS asserted
fn configure_port(port: &mut dyn SerialPort) -> Result<(), TransportError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;

    // Some RS-232 level shifters are powered from the control lines
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("configure_port: failed to set DTR high: {} (continuing)", e);
    }
    if let Err(e) = port.write_request_to_send(true) {
        tracing::debug!("configure_port: failed to set RTS high: {} (continuing)", e);
    }

    Ok(())
}

/// Serial link to a modem
pub struct SerialTransport {
    port_name: String,
    read_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a transport for `port_name`; nothing is opened yet
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            read_timeout: Duration::from_millis(1000),
            port: None,
        }
    }

    /// Per-read timeout handed to the driver
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Device this transport opens
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        // Release the OS handle before reopening the same device
        self.port = None;

        let mut port = serialport::new(&self.port_name, baud_rate)
            .timeout(self.read_timeout)
            .open()?;
        configure_port(port.as_mut())?;
        port.clear(serialport::ClearBuffer::All)?;

        tracing::debug!("opened {} at {} baud", self.port_name, baud_rate);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("closed {}", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let port = self.port()?;
        let mut buffer = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        buffer.truncate(filled);
        Ok(buffer)
    }
}
