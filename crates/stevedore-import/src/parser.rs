//! Extraction of message/warning/error counters from the import
//! command's free-text output.

use std::fmt;

use regex::Regex;
use thiserror::Error;

/// Counter categories reported by the import command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Messages,
    Warnings,
    Errors,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::Messages => write!(f, "messages"),
            Counter::Warnings => write!(f, "warnings"),
            Counter::Errors => write!(f, "errors"),
        }
    }
}

/// One or more counter patterns did not match exactly once with a
/// parseable integer. All three patterns are always evaluated, so the
/// error names every counter that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("output did not match the expected count patterns: {}", format_failed(.failed))]
pub struct ParseError {
    pub failed: Vec<Counter>,
}

fn format_failed(failed: &[Counter]) -> String {
    failed
        .iter()
        .map(Counter::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Counts parsed from one invocation's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub messages: u64,
    pub warnings: u64,
    pub errors: u64,
}

impl ImportCounts {
    pub fn is_empty(&self) -> bool {
        self.messages == 0 && self.warnings == 0 && self.errors == 0
    }

    pub fn total(&self) -> u64 {
        self.messages + self.warnings + self.errors
    }
}

/// Applies the three fixed textual patterns of the form
/// `There are <N> <noun>`. Pure: parsing the same text twice yields the
/// same result.
pub struct OutputParser {
    messages: Regex,
    warnings: Regex,
    errors: Regex,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    pub fn new() -> Self {
        Self {
            messages: Regex::new("There are ([0-9]+?) message").expect("hard-coded pattern"),
            warnings: Regex::new("There are ([0-9]+?) warning").expect("hard-coded pattern"),
            errors: Regex::new("There are ([0-9]+?) error").expect("hard-coded pattern"),
        }
    }

    pub fn parse(&self, raw: &str) -> Result<ImportCounts, ParseError> {
        let messages = extract(&self.messages, raw);
        let warnings = extract(&self.warnings, raw);
        let errors = extract(&self.errors, raw);

        let mut failed = Vec::new();
        if messages.is_none() {
            failed.push(Counter::Messages);
        }
        if warnings.is_none() {
            failed.push(Counter::Warnings);
        }
        if errors.is_none() {
            failed.push(Counter::Errors);
        }
        if !failed.is_empty() {
            return Err(ParseError { failed });
        }

        Ok(ImportCounts {
            messages: messages.unwrap_or_default(),
            warnings: warnings.unwrap_or_default(),
            errors: errors.unwrap_or_default(),
        })
    }
}

/// A counter is valid only when its pattern matches exactly once and the
/// captured group parses as an integer.
fn extract(pattern: &Regex, raw: &str) -> Option<u64> {
    let mut captures = pattern.captures_iter(raw);
    let first = captures.next()?;
    if captures.next().is_some() {
        return None;
    }
    first[1].parse().ok()
}
