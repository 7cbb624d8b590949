//! Link and multi-rate test results

use serde::{Deserialize, Serialize};

use crate::protocol::Response;

/// How an acoustic test ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestOutcome {
    /// The transcript reported success
    Passed,
    /// The transcript closed without reporting success
    Failed,
    /// The transcript never reached its closing line
    Incomplete,
}

/// A `name = value [unit]` figure reported in a test transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Figure name as printed, e.g. `SNR`
    pub name: String,
    /// Numeric value
    pub value: f64,
    /// Unit following the value, if any
    pub unit: Option<String>,
}

/// Structured result of `ATX` / `ATY`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Remote modem tested
    pub address: u8,
    /// How the test ended
    pub outcome: TestOutcome,
    /// Figures found in the transcript, in order
    pub metrics: Vec<Metric>,
    /// Full transcript
    pub lines: Vec<String>,
}

impl TestReport {
    /// Classify a test transcript and pull out its figures
    pub fn from_response(address: u8, response: Response) -> Self {
        let outcome = if !response.is_complete() {
            TestOutcome::Incomplete
        } else {
            classify(response.lines())
        };
        let lines = response.into_lines();
        let metrics = lines.iter().flat_map(|line| parse_metrics(line)).collect();
        Self {
            address,
            outcome,
            metrics,
            lines,
        }
    }

    /// Shorthand for `outcome == Passed`
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }

    /// First metric called `name` (case-insensitive)
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

/// The closing line decides: anything mentioning failure or a timeout wins
/// over a pass
fn classify(lines: &[String]) -> TestOutcome {
    let Some(last) = lines.last() else {
        return TestOutcome::Incomplete;
    };
    let last = last.to_ascii_lowercase();
    if last.contains("fail") || last.contains("timeout") || last.contains("abort") {
        TestOutcome::Failed
    } else {
        TestOutcome::Passed
    }
}

/// Pull `name = value unit` / `name: value unit` pairs out of one line.
/// Pairs may be separated by commas or semicolons.
fn parse_metrics(line: &str) -> Vec<Metric> {
    line.split([',', ';'])
        .filter_map(|field| {
            let (name, rest) = field.split_once('=').or_else(|| field.split_once(':'))?;
            // "Rate 9: BER = 0.001" names the metric BER
            let name = name.rsplit(':').next().unwrap_or(name).trim();
            if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return None;
            }
            let mut tokens = rest.split_whitespace();
            let value = tokens.next()?.parse::<f64>().ok()?;
            Some(Metric {
                name: name.to_string(),
                value,
                unit: tokens.next().map(str::to_string),
            })
        })
        .collect()
}
