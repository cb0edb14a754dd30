use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::Instruction;

use super::{raw_args, LABEL};

/// Persisted label table plus the last two labels executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelState {
    pub labels: BTreeMap<String, usize>,
    pub last: String,
    pub pre: String,
}

/// The `label,<name>` command.
///
/// Compiling registers `name` at the slot the instruction is stored in, so
/// a jump lands on the label instruction itself. Running it only updates
/// the last/previous label bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct LabelCmd {
    state: LabelState,
}

impl LabelCmd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, tokens: &[String], index: usize) -> ScenarioResult<Option<Instruction>> {
        let name = match tokens.get(1) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                return Err(ScenarioError::invalid_arguments(LABEL, "missing label name"));
            }
        };
        self.state.labels.insert(name, index);
        Ok(Some(Instruction::new(LABEL, index, raw_args(&tokens[..2]))))
    }

    /// Index of `label`; the empty label is the program start.
    pub fn get_index(&self, label: &str) -> Option<usize> {
        if label.is_empty() {
            return Some(0);
        }
        self.state.labels.get(label).copied()
    }

    /// Records `name` as the current label and returns the previous one.
    pub fn enter(&mut self, name: &str) -> &str {
        self.state.pre = std::mem::replace(&mut self.state.last, name.to_string());
        &self.state.pre
    }

    pub fn last_label(&self) -> &str {
        &self.state.last
    }

    pub fn previous_label(&self) -> &str {
        &self.state.pre
    }

    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.state.labels
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.state).unwrap_or(Value::Null)
    }

    pub fn reset_from_json(&mut self, state: Option<&Value>) -> ScenarioResult<()> {
        self.state = match state {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|err| ScenarioError::HandlerState {
                    command: LABEL.to_string(),
                    message: err.to_string(),
                })?
            }
            None => LabelState::default(),
        };
        Ok(())
    }
}
