//! Response accumulation
//!
//! Collects a modem reply after a command has been written. The modem gives
//! no length or end-of-reply marker, so a reply is either whatever arrived
//! within a fixed settle wait, or everything up to a caller supplied
//! terminator pattern.

use regex::Regex;
use std::thread;

use super::LINE_TERMINATOR;
use crate::config::Timing;
use crate::error::{ProtocolError, Result};
use crate::transport::Transport;

/// How the end of a reply is recognised
#[derive(Debug, Clone)]
pub enum Termination {
    /// Wait the settle interval once, then take what is buffered
    Idle,
    /// Poll until the accumulated text matches
    Pattern(Regex),
}

/// Lines of one modem reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    lines: Vec<String>,
    complete: bool,
}

impl Response {
    /// Wrap split reply lines
    pub fn new(lines: Vec<String>, complete: bool) -> Self {
        Self { lines, complete }
    }

    /// Reply lines, terminators removed
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Take the reply lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// True when nothing arrived
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// False when a pattern-terminated read ran out of polls before the
    /// pattern matched
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Line `index`, failing as `NoResponse` for an empty reply and as
    /// `UnexpectedResponse` when the reply is too short
    pub fn line(&self, command: &str, index: usize) -> std::result::Result<&str, ProtocolError> {
        if self.lines.is_empty() {
            return Err(ProtocolError::NoResponse {
                command: command.to_string(),
            });
        }
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ProtocolError::UnexpectedResponse {
                command: command.to_string(),
                line: self.lines.join(" | "),
            })
    }
}

/// Split raw reply text into lines.
///
/// Line terminators and spaces are stripped from both ends of the reply,
/// the rest is split on `\r\n` and each line loses its trailing spaces.
pub fn split_lines(text: &str) -> Vec<String> {
    let trimmed = text.trim_matches(|c: char| c == '\r' || c == '\n' || c == ' ');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(LINE_TERMINATOR)
        .map(|line| line.trim_end_matches(' ').to_string())
        .collect()
}

/// Read the reply to `command` using `termination`
pub fn accumulate<T: Transport + ?Sized>(
    transport: &mut T,
    timing: &Timing,
    termination: &Termination,
    command: &str,
) -> Result<Response> {
    match termination {
        Termination::Idle => {
            thread::sleep(timing.settle());
            let bytes = transport.read_available()?;
            let text = String::from_utf8_lossy(&bytes);
            tracing::debug!("reply to {:?}: {:?}", command, text);
            Ok(Response::new(split_lines(&text), true))
        }
        Termination::Pattern(pattern) => accumulate_until(transport, timing, pattern, command),
    }
}

fn accumulate_until<T: Transport + ?Sized>(
    transport: &mut T,
    timing: &Timing,
    pattern: &Regex,
    command: &str,
) -> Result<Response> {
    let mut buffer: Vec<u8> = Vec::new();

    for poll in 0..timing.max_polls {
        let chunk = transport.read_available()?;
        if !chunk.is_empty() {
            buffer.extend_from_slice(&chunk);
            let text = String::from_utf8_lossy(&buffer);
            if pattern.is_match(&text) {
                tracing::debug!(
                    "reply to {:?} terminated after {} polls: {:?}",
                    command,
                    poll + 1,
                    text
                );
                return Ok(Response::new(split_lines(&text), true));
            }
        }
        thread::sleep(timing.poll_interval());
    }

    if buffer.is_empty() {
        return Err(ProtocolError::NoResponse {
            command: command.to_string(),
        }
        .into());
    }

    let text = String::from_utf8_lossy(&buffer);
    tracing::warn!(
        "reply to {:?} did not match {:?} within {} polls, returning {} partial bytes",
        command,
        pattern.as_str(),
        timing.max_polls,
        buffer.len()
    );
    Ok(Response::new(split_lines(&text), false))
}
