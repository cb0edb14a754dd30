//! Persisted runtime state.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::InstMem;
use crate::value::WaitFor;

/// Everything needed to rebuild a scenario mid-run, except the host scope
/// object itself (only the state it exports).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSnapshot {
    /// Running flag.
    pub state: bool,
    pub pause: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitFor>,
    #[serde(default)]
    pub scope: Value,
    /// 0 = milliseconds, 1 = seconds.
    pub time_unit: u8,
    pub prefix: String,
    pub args_convert: bool,
    #[serde(default)]
    pub args_convert_scope: Option<Value>,
    #[serde(default)]
    pub handlers: BTreeMap<String, Value>,
    #[serde(default)]
    pub inst_mem: InstMem,
    /// Remaining milliseconds of an active delay wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<f64>,
}

impl ScenarioSnapshot {
    pub fn from_json(input: &str) -> ScenarioResult<Self> {
        serde_json::from_str(input).map_err(|err| ScenarioError::from_json_error(input, &err))
    }

    pub fn to_json_string(&self) -> ScenarioResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| ScenarioError::Serialization {
            message: err.to_string(),
            src: String::new(),
            span: (0, 0).into(),
        })
    }

    /// JSON Schema describing the snapshot format.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ScenarioSnapshot)
    }
}
