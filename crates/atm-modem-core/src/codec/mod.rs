//! Parameter codec
//!
//! Every configuration parameter is a static [`ParameterSpec`]: a wire
//! keyword, a domain of accepted values and a rule for turning values into
//! wire text and reply lines back into values. The typed wrapper
//! [`Param`] picks the Rust types a parameter reads and writes.
//!
//! Writes are validated against the domain, in human units, before any
//! command is built. Reads decode one reply line.

pub mod params;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{ProtocolError, ValidationError};

const EPSILON: f64 = 1e-6;

/// Values a parameter accepts, in human units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// `true`/`false`
    Boolean,
    /// Union of inclusive integer spans
    Spans(&'static [(i64, i64)]),
    /// Explicit integer set
    Set(&'static [i64]),
    /// `min..=max` in increments of `step`
    Stepped {
        /// Smallest accepted value
        min: f64,
        /// Largest accepted value
        max: f64,
        /// Spacing of accepted values above `min`
        step: f64,
    },
    /// `HH:MM:SS` no later than 23:59:59
    ClockTime,
}

impl Domain {
    /// Whether the integer `value` is accepted
    pub fn contains_int(&self, value: i64) -> bool {
        match self {
            Domain::Spans(spans) => spans.iter().any(|&(lo, hi)| lo <= value && value <= hi),
            Domain::Set(set) => set.contains(&value),
            Domain::Stepped { .. } => self.contains_float(value as f64),
            Domain::Boolean | Domain::ClockTime => false,
        }
    }

    /// Whether `value` is accepted; stepped domains allow a small rounding
    /// tolerance
    pub fn contains_float(&self, value: f64) -> bool {
        match *self {
            Domain::Stepped { min, max, step } => {
                if !value.is_finite() || value < min - EPSILON || value > max + EPSILON {
                    return false;
                }
                let steps = (value - min) / step;
                (steps - steps.round()).abs() < EPSILON
            }
            _ => value.fract() == 0.0 && self.contains_int(value as i64),
        }
    }

    /// Every accepted integer, for discrete domains
    pub fn values(&self) -> Option<Vec<i64>> {
        match *self {
            Domain::Spans(spans) => Some(spans.iter().flat_map(|&(lo, hi)| lo..=hi).collect()),
            Domain::Set(set) => Some(set.to_vec()),
            Domain::Stepped { min, max, step } if step.fract() == 0.0 && min.fract() == 0.0 => {
                let count = ((max - min) / step).round() as i64;
                Some((0..=count).map(|i| min as i64 + i * step as i64).collect())
            }
            _ => None,
        }
    }

    /// Snap an accepted value onto its step grid
    fn snap(&self, value: f64) -> f64 {
        match *self {
            Domain::Stepped { min, step, .. } => min + ((value - min) / step).round() * step,
            _ => value,
        }
    }

    /// Decimal places needed to print values of this domain
    fn decimals(&self) -> usize {
        match *self {
            Domain::Stepped { min, step, .. } => decimals_of(step).max(decimals_of(min)),
            _ => 0,
        }
    }

    /// Check an integer argument, naming it in the error
    pub fn check_int(&self, parameter: &str, value: i64) -> Result<i64, ValidationError> {
        if self.contains_int(value) {
            Ok(value)
        } else {
            Err(ValidationError::new(parameter, value, self.to_string()))
        }
    }
}

fn decimals_of(value: f64) -> usize {
    let text = format!("{}", value);
    text.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Boolean => f.write_str("true or false"),
            Domain::Spans(spans) => {
                let parts: Vec<String> = spans
                    .iter()
                    .map(|&(lo, hi)| {
                        if lo == hi {
                            lo.to_string()
                        } else {
                            format!("{}-{}", lo, hi)
                        }
                    })
                    .collect();
                f.write_str(&parts.join(", "))
            }
            Domain::Set(set) => {
                let parts: Vec<String> = set.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(", "))
            }
            Domain::Stepped { min, max, step } => {
                write!(f, "{}-{} in steps of {}", min, max, step)
            }
            Domain::ClockTime => f.write_str("HH:MM:SS up to 23:59:59"),
        }
    }
}

/// How values map to and from the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// `Ena` / `Dis`
    Enable,
    /// Reply `"<code> (<name>)"`, written as the bare code
    Coded,
    /// Bare integer or float, unchanged
    Plain,
    /// Wire value is the human value times `factor`
    Scaled(f64),
    /// Free text
    Text,
}

/// Static descriptor of one configuration parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    /// Name used in errors and listings
    pub name: &'static str,
    /// Wire keyword, e.g. `@P1Baud`
    pub keyword: &'static str,
    /// Encode/decode rule
    pub rule: Rule,
    /// Accepted values, in human units
    pub domain: Domain,
    /// Reply line holding the value
    pub line: usize,
    /// Set when this is the baud rate of modem serial port N
    pub baud_of_port: Option<u8>,
}

impl ParameterSpec {
    const fn new(name: &'static str, keyword: &'static str, rule: Rule, domain: Domain) -> Self {
        Self {
            name,
            keyword,
            rule,
            domain,
            line: 0,
            baud_of_port: None,
        }
    }

    fn invalid(&self, value: impl ToString) -> ValidationError {
        ValidationError::new(self.name, value, self.domain.to_string())
    }

    fn unexpected(&self, line: &str) -> ProtocolError {
        ProtocolError::UnexpectedResponse {
            command: self.keyword.to_string(),
            line: line.to_string(),
        }
    }

    /// Decode a reply line according to the rule, without a typed wrapper
    pub fn decode_value(&self, line: &str) -> Result<ParamValue, ProtocolError> {
        match self.rule {
            Rule::Enable => decode_enable(self, line).map(ParamValue::Bool),
            Rule::Coded => decode_coded(self, line).map(ParamValue::Coded),
            Rule::Plain => match decode_integer(self, line) {
                Ok(v) => Ok(ParamValue::Int(v)),
                Err(_) => decode_float(self, line).map(ParamValue::Float),
            },
            Rule::Scaled(factor) => {
                decode_float(self, line).map(|raw| ParamValue::Float(raw / factor))
            }
            Rule::Text => Ok(ParamValue::Text(line.trim().to_string())),
        }
    }
}

/// A coded-enum reply: numeric code plus the modem's name for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedValue {
    /// Numeric code, as written
    pub code: i64,
    /// Name the modem prints next to the code
    pub name: String,
}

impl fmt::Display for CodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// Untyped decoded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// `Ena` / `Dis`
    Bool(bool),
    /// Bare integer
    Int(i64),
    /// Decimal, or a scaled value in human units
    Float(f64),
    /// `code (name)`
    Coded(CodedValue),
    /// Free text such as a clock time
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(true) => f.write_str("Ena"),
            ParamValue::Bool(false) => f.write_str("Dis"),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Coded(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

fn decode_enable(spec: &ParameterSpec, line: &str) -> Result<bool, ProtocolError> {
    if line.contains("Ena") {
        Ok(true)
    } else if line.contains("Dis") {
        Ok(false)
    } else {
        Err(spec.unexpected(line))
    }
}

fn decode_coded(spec: &ParameterSpec, line: &str) -> Result<CodedValue, ProtocolError> {
    let trimmed = line.trim();
    let (code, name) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    let code = code.parse::<i64>().map_err(|_| spec.unexpected(line))?;
    let name = name.trim_matches(|c: char| c == ' ' || c == '(' || c == ')');
    Ok(CodedValue {
        code,
        name: name.to_string(),
    })
}

fn decode_integer(spec: &ParameterSpec, line: &str) -> Result<i64, ProtocolError> {
    let trimmed = line.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 => Ok(v as i64),
        _ => Err(spec.unexpected(line)),
    }
}

fn decode_float(spec: &ParameterSpec, line: &str) -> Result<f64, ProtocolError> {
    line.trim()
        .parse::<f64>()
        .map_err(|_| spec.unexpected(line))
}

/// Encode/decode behaviour of a typed parameter
pub trait ParamCodec {
    /// What callers write
    type Value;
    /// What reads return
    type Decoded;

    /// Validate `value` against the parameter's domain and produce wire text
    fn encode(spec: &ParameterSpec, value: &Self::Value) -> Result<String, ValidationError>;

    /// Decode one reply line
    fn decode(spec: &ParameterSpec, line: &str) -> Result<Self::Decoded, ProtocolError>;
}

/// Boolean parameters sent as `Ena` / `Dis`
#[derive(Debug, Clone, Copy)]
pub struct Enable;

impl ParamCodec for Enable {
    type Value = bool;
    type Decoded = bool;

    fn encode(_spec: &ParameterSpec, value: &bool) -> Result<String, ValidationError> {
        Ok(if *value { "Ena" } else { "Dis" }.to_string())
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<bool, ProtocolError> {
        decode_enable(spec, line)
    }
}

/// Coded enums: written as a code, read back as `code (name)`
#[derive(Debug, Clone, Copy)]
pub struct Coded;

impl ParamCodec for Coded {
    type Value = i64;
    type Decoded = CodedValue;

    fn encode(spec: &ParameterSpec, value: &i64) -> Result<String, ValidationError> {
        if spec.domain.contains_int(*value) {
            Ok(value.to_string())
        } else {
            Err(spec.invalid(value))
        }
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<CodedValue, ProtocolError> {
        decode_coded(spec, line)
    }
}

/// Plain integers
#[derive(Debug, Clone, Copy)]
pub struct Integer;

impl ParamCodec for Integer {
    type Value = i64;
    type Decoded = i64;

    fn encode(spec: &ParameterSpec, value: &i64) -> Result<String, ValidationError> {
        if spec.domain.contains_int(*value) {
            Ok(value.to_string())
        } else {
            Err(spec.invalid(value))
        }
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<i64, ProtocolError> {
        decode_integer(spec, line)
    }
}

/// Plain decimals, e.g. seconds with a fractional step
#[derive(Debug, Clone, Copy)]
pub struct Decimal;

impl ParamCodec for Decimal {
    type Value = f64;
    type Decoded = f64;

    fn encode(spec: &ParameterSpec, value: &f64) -> Result<String, ValidationError> {
        if !spec.domain.contains_float(*value) {
            return Err(spec.invalid(value));
        }
        let snapped = spec.domain.snap(*value);
        Ok(format!("{:.*}", spec.domain.decimals(), snapped))
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<f64, ProtocolError> {
        decode_float(spec, line)
    }
}

/// Fixed-point values: the wire carries an integer count of sub-units
#[derive(Debug, Clone, Copy)]
pub struct Scaled;

impl Scaled {
    fn factor(spec: &ParameterSpec) -> f64 {
        match spec.rule {
            Rule::Scaled(factor) => factor,
            _ => 1.0,
        }
    }
}

impl ParamCodec for Scaled {
    type Value = f64;
    type Decoded = f64;

    fn encode(spec: &ParameterSpec, value: &f64) -> Result<String, ValidationError> {
        if !spec.domain.contains_float(*value) {
            return Err(spec.invalid(value));
        }
        let raw = (spec.domain.snap(*value) * Self::factor(spec)).round() as i64;
        Ok(raw.to_string())
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<f64, ProtocolError> {
        decode_float(spec, line).map(|raw| raw / Self::factor(spec))
    }
}

/// `HH:MM:SS` time values
#[derive(Debug, Clone, Copy)]
pub struct ClockTime;

impl ClockTime {
    fn parse(text: &str) -> Option<(u32, u32, u32)> {
        let mut parts = text.trim().split(':').map(|p| p.trim().parse::<u32>());
        let (h, m, s) = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
        if parts.next().is_some() || h > 23 || m > 59 || s > 59 {
            return None;
        }
        Some((h, m, s))
    }
}

impl ParamCodec for ClockTime {
    type Value = String;
    type Decoded = String;

    fn encode(spec: &ParameterSpec, value: &String) -> Result<String, ValidationError> {
        let (h, m, s) = Self::parse(value).ok_or_else(|| spec.invalid(value))?;
        Ok(format!("{:02}:{:02}:{:02}", h, m, s))
    }

    fn decode(spec: &ParameterSpec, line: &str) -> Result<String, ProtocolError> {
        Self::parse(line)
            .map(|(h, m, s)| format!("{:02}:{:02}:{:02}", h, m, s))
            .ok_or_else(|| spec.unexpected(line))
    }
}

/// A parameter whose reads and writes are typed by codec `C`
#[derive(Debug, Clone, Copy)]
pub struct Param<C> {
    /// Untyped descriptor
    pub spec: ParameterSpec,
    codec: PhantomData<fn() -> C>,
}

impl<C: ParamCodec> Param<C> {
    const fn from_spec(spec: ParameterSpec) -> Self {
        Self {
            spec,
            codec: PhantomData,
        }
    }

    /// Parameter name, e.g. `TxPower`
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Wire keyword, e.g. `@TxPower`
    pub fn keyword(&self) -> &'static str {
        self.spec.keyword
    }

    /// Validate `value` and produce its wire text
    pub fn encode(&self, value: &C::Value) -> Result<String, ValidationError> {
        C::encode(&self.spec, value)
    }

    /// Decode one reply line
    pub fn decode(&self, line: &str) -> Result<C::Decoded, ProtocolError> {
        C::decode(&self.spec, line)
    }
}

impl Param<Enable> {
    /// `Ena`/`Dis` parameter
    pub const fn enable(name: &'static str, keyword: &'static str) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Enable, Domain::Boolean))
    }
}

impl Param<Coded> {
    /// `code (name)` parameter accepting codes in `domain`
    pub const fn coded(name: &'static str, keyword: &'static str, domain: Domain) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Coded, domain))
    }
}

impl Param<Integer> {
    /// Bare integer parameter
    pub const fn integer(name: &'static str, keyword: &'static str, domain: Domain) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Plain, domain))
    }

    /// Baud rate of modem serial port `port`; the session follows changes to
    /// the port it is attached to
    pub const fn baud(name: &'static str, keyword: &'static str, port: u8) -> Self {
        let mut spec = ParameterSpec::new(name, keyword, Rule::Plain, params::BAUD_RATES);
        spec.baud_of_port = Some(port);
        Self::from_spec(spec)
    }
}

impl Param<Decimal> {
    /// Bare decimal parameter
    pub const fn decimal(name: &'static str, keyword: &'static str, domain: Domain) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Plain, domain))
    }
}

impl Param<Scaled> {
    /// Parameter stored on the wire as the human value times `factor`
    pub const fn scaled(
        name: &'static str,
        keyword: &'static str,
        factor: f64,
        domain: Domain,
    ) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Scaled(factor), domain))
    }
}

impl Param<ClockTime> {
    /// `HH:MM:SS` parameter
    pub const fn clock_time(name: &'static str, keyword: &'static str) -> Self {
        Self::from_spec(ParameterSpec::new(name, keyword, Rule::Text, Domain::ClockTime))
    }
}
