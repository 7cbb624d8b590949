//! # ATM Modem Core Library
//!
//! Host-side driver for ATM-900 series acoustic telemetry modems.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The Configuration/Online mode state machine and its `+++` / `ATO`
//!   handshakes
//! - AT command execution with settle-time or pattern-terminated framing
//! - A validated, typed codec for every configuration parameter
//! - Auto-bauding connection probe
//! - Serial, scripted and simulated transports
//!
//! ## Example
//!
//! ```rust,ignore
//! use atm_modem_core::prelude::*;
//! use atm_modem_core::codec::params;
//!
//! let config = ModemConfig::for_port("/dev/ttyUSB0");
//! let transport = SerialTransport::new(&config.port_name);
//!
//! // Probe the supported baud rates for a live modem
//! let mut modem = Session::connect(transport, config)?;
//!
//! modem.set(&params::TX_POWER, 6)?;
//! let report = modem.link_test(1)?;
//! println!("link test: {:?}", report.outcome);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod sim;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::codec::{CodedValue, Param, ParamValue, ParameterSpec};
    pub use crate::config::{HostPort, ModemConfig, Timing};
    pub use crate::error::{
        ConfigError, ConnectError, ModemError, ProtocolError, Result, TransportError,
        ValidationError,
    };
    pub use crate::protocol::{AtCommand, Mode, Response};
    pub use crate::session::{Metric, Session, TestOutcome, TestReport};
    pub use crate::sim::SimulatedModem;
    pub use crate::transport::{MockTransport, SerialTransport, Transport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
