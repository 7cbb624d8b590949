//! AT command composition

use regex::Regex;
use std::fmt;

use super::{Termination, LINE_TERMINATOR};

/// One request to the modem: a keyword, an optional value to assign and an
/// optional pattern closing the reply.
///
/// `AtCommand::new("@P1Baud").with_value(9600)` goes out as
/// `@P1Baud=9600\r\n`; without a value it is a query.
#[derive(Debug, Clone)]
pub struct AtCommand {
    keyword: String,
    value: Option<String>,
    terminator: Option<Regex>,
}

impl AtCommand {
    /// Query `keyword`, reading the reply after the settle wait
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: None,
            terminator: None,
        }
    }

    /// Assign `value` (already in wire form)
    pub fn with_value(mut self, value: impl fmt::Display) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Read the reply until `pattern` matches instead of after the settle wait
    pub fn until(mut self, pattern: Regex) -> Self {
        self.terminator = Some(pattern);
        self
    }

    /// Command keyword, e.g. `@P1Baud` or `ATD`
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Value being assigned, if any
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// How the reply to this command is framed
    pub fn termination(&self) -> Termination {
        match &self.terminator {
            Some(pattern) => Termination::Pattern(pattern.clone()),
            None => Termination::Idle,
        }
    }

    /// Text written to the transport
    pub fn to_wire(&self) -> String {
        let mut wire = match &self.value {
            Some(value) => format!(
                "{}={}",
                self.keyword.trim_end_matches(LINE_TERMINATOR),
                value
            ),
            None => self.keyword.clone(),
        };
        if !wire.ends_with(LINE_TERMINATOR) {
            wire.push_str(LINE_TERMINATOR);
        }
        wire
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_wire().trim_end_matches(LINE_TERMINATOR))
    }
}
