//! Argument values carried by compiled instructions.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single instruction argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(untagged)]
pub enum Arg {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Number(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Null => write!(f, "null"),
            Arg::Bool(value) => write!(f, "{value}"),
            Arg::Number(value) => write!(f, "{}", format_number(*value)),
            Arg::Str(value) => write!(f, "{value}"),
        }
    }
}

/// What a suspended scenario is waiting for.
///
/// Delays are expressed in the scenario's configured time unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(untagged)]
pub enum WaitFor {
    Delay(f64),
    Event(String),
}

impl WaitFor {
    pub fn event(name: impl Into<String>) -> Self {
        WaitFor::Event(name.into())
    }

    /// Numeric text becomes a delay, anything else an event name.
    pub fn from_token(token: &str) -> Self {
        match parse_number(token) {
            Some(delay) => WaitFor::Delay(delay),
            None => WaitFor::Event(token.to_string()),
        }
    }

    pub fn from_arg(arg: &Arg) -> Option<Self> {
        match arg {
            Arg::Number(delay) => Some(WaitFor::Delay(*delay)),
            Arg::Str(token) => Some(WaitFor::from_token(token)),
            _ => None,
        }
    }
}

impl From<&str> for WaitFor {
    fn from(value: &str) -> Self {
        WaitFor::Event(value.to_string())
    }
}

impl From<f64> for WaitFor {
    fn from(value: f64) -> Self {
        WaitFor::Delay(value)
    }
}

impl fmt::Display for WaitFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitFor::Delay(delay) => write!(f, "{}", format_number(*delay)),
            WaitFor::Event(name) => write!(f, "{name}"),
        }
    }
}

/// Host hook replacing the default token coercion.
///
/// Receives the raw token and the opaque `args_convert_scope` value.
pub type ArgConverter = dyn Fn(&str, Option<&serde_json::Value>) -> Arg;

/// Parses a token as a finite number, ignoring surrounding whitespace.
pub fn parse_number(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Default coercion applied to command arguments when conversion is enabled.
pub fn convert_token(token: &str) -> Arg {
    match token {
        "true" => Arg::Bool(true),
        "false" => Arg::Bool(false),
        "null" => Arg::Null,
        _ => match parse_number(token) {
            Some(value) => Arg::Number(value),
            None => Arg::Str(token.to_string()),
        },
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
