//! AT command protocol
//!
//! Mode switching, command framing and response accumulation for the
//! ATM-900 family's text protocol. Responses carry no length or checksum,
//! so framing is either a fixed settle wait or a terminator pattern.

mod accumulator;
pub mod command;
mod mode;

pub use accumulator::{accumulate, split_lines, Response, Termination};
pub use command::AtCommand;
pub use mode::{Mode, ModeMachine};

/// Line terminator for commands and responses
pub const LINE_TERMINATOR: &str = "\r\n";

/// Escape sequence requesting Configuration mode
pub const ESCAPE_SEQUENCE: &[u8] = b"+++";

/// Command returning the modem to Online mode
pub const ONLINE_COMMAND: &str = "ATO";
