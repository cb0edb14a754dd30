//! Runtime configuration and per-call options.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ScenarioError, ScenarioResult};

/// Default inline command syntax: `#` followed by letters.
pub const DEFAULT_PREFIX: &str = "^#([a-zA-Z]+)";

/// Unit used for numeric waits. Persisted as `0` (ms) or `1` (s).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    pub fn code(self) -> u8 {
        match self {
            TimeUnit::Milliseconds => 0,
            TimeUnit::Seconds => 1,
        }
    }

    pub fn from_code(code: u8) -> ScenarioResult<Self> {
        match code {
            0 => Ok(TimeUnit::Milliseconds),
            1 => Ok(TimeUnit::Seconds),
            other => Err(ScenarioError::InvalidTimeUnit(other.to_string())),
        }
    }

    pub fn to_millis(self, amount: f64) -> f64 {
        match self {
            TimeUnit::Milliseconds => amount,
            TimeUnit::Seconds => amount * 1000.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ScenarioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ms" | "0" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "1" => Ok(TimeUnit::Seconds),
            other => Err(ScenarioError::InvalidTimeUnit(other.to_string())),
        }
    }
}

impl Serialize for TimeUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for TimeUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => TimeUnit::from_code(code),
            Repr::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Compiled command-prefix pattern; capture group 1 is the command name.
#[derive(Clone)]
pub struct CommandPrefix {
    source: String,
    regex: Regex,
}

impl CommandPrefix {
    pub fn new(pattern: &str) -> ScenarioResult<Self> {
        let regex = Regex::new(pattern).map_err(|err| ScenarioError::InvalidPrefix {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        if regex.captures_len() < 2 {
            return Err(ScenarioError::InvalidPrefix {
                pattern: pattern.to_string(),
                message: "pattern has no capture group".to_string(),
            });
        }
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the lower-cased command name when `token` uses inline syntax.
    pub fn command_name(&self, token: &str) -> Option<String> {
        let captures = self.regex.captures(token)?;
        let name = captures.get(1)?.as_str();
        Some(name.to_lowercase())
    }
}

impl Default for CommandPrefix {
    fn default() -> Self {
        Self {
            source: DEFAULT_PREFIX.to_string(),
            regex: Regex::new(DEFAULT_PREFIX).expect("default prefix is a valid regex"),
        }
    }
}

impl PartialEq for CommandPrefix {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for CommandPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandPrefix").field(&self.source).finish()
    }
}

impl Serialize for CommandPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for CommandPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        CommandPrefix::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Construction-time configuration, loadable from TOML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub time_unit: TimeUnit,
    pub prefix: CommandPrefix,
    pub args_convert: bool,
    pub args_convert_scope: Option<serde_json::Value>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::default(),
            prefix: CommandPrefix::default(),
            args_convert: true,
            args_convert_scope: None,
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(input: &str) -> ScenarioResult<Self> {
        toml::from_str(input).map_err(|err| ScenarioError::Config(err.to_string()))
    }
}

/// Overrides applied by `Scenario::load`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub time_unit: Option<String>,
    pub prefix: Option<String>,
    pub args_convert: Option<bool>,
    pub args_convert_scope: Option<serde_json::Value>,
}

impl LoadOptions {
    pub fn time_unit(mut self, unit: impl Into<String>) -> Self {
        self.time_unit = Some(unit.into());
        self
    }

    pub fn prefix(mut self, pattern: impl Into<String>) -> Self {
        self.prefix = Some(pattern.into());
        self
    }

    pub fn args_convert(mut self, enabled: bool) -> Self {
        self.args_convert = Some(enabled);
        self
    }
}

/// Options for `Scenario::start`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartOptions {
    /// Label to start at; empty means the first instruction.
    pub label: String,
}

impl StartOptions {
    pub fn at(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}
