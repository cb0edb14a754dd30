//! Host execution context for the generic `-` command.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::control::Control;
use crate::error::{ScenarioError, ScenarioResult};
use crate::value::{Arg, WaitFor};

/// Result of a scope call.
#[derive(Clone, Debug, PartialEq)]
pub enum CallOutcome {
    Done,
    /// Suspend the scenario until this wait is continued.
    Wait(WaitFor),
}

/// Receiver of `-,<method>,args...` rows.
pub trait ScenarioScope {
    fn invoke(
        &mut self,
        method: &str,
        args: &[Arg],
        control: &mut Control<'_>,
    ) -> ScenarioResult<CallOutcome>;

    /// Opaque state persisted with the scenario.
    fn to_json(&self) -> Value {
        Value::Null
    }

    fn reset_from_json(&mut self, _state: &Value) -> ScenarioResult<()> {
        Ok(())
    }
}

type Method = Box<dyn FnMut(&[Arg], &mut Control<'_>) -> ScenarioResult<CallOutcome>>;
type Fallback = Box<dyn FnMut(&str, &[Arg], &mut Control<'_>) -> ScenarioResult<CallOutcome>>;

/// Scope backed by a table of named closures.
#[derive(Default)]
pub struct MethodScope {
    methods: BTreeMap<String, Method>,
    fallback: Option<Fallback>,
}

impl MethodScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(
        mut self,
        name: &str,
        method: impl FnMut(&[Arg], &mut Control<'_>) -> ScenarioResult<CallOutcome> + 'static,
    ) -> Self {
        self.insert(name, method);
        self
    }

    pub fn insert(
        &mut self,
        name: &str,
        method: impl FnMut(&[Arg], &mut Control<'_>) -> ScenarioResult<CallOutcome> + 'static,
    ) {
        self.methods.insert(name.to_string(), Box::new(method));
    }

    /// Handler for names with no registered method.
    pub fn fallback(
        mut self,
        fallback: impl FnMut(&str, &[Arg], &mut Control<'_>) -> ScenarioResult<CallOutcome> + 'static,
    ) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl ScenarioScope for MethodScope {
    fn invoke(
        &mut self,
        method: &str,
        args: &[Arg],
        control: &mut Control<'_>,
    ) -> ScenarioResult<CallOutcome> {
        if let Some(callback) = self.methods.get_mut(method) {
            return callback(args, control);
        }
        match self.fallback.as_mut() {
            Some(fallback) => fallback(method, args, control),
            None => Err(ScenarioError::UnknownMethod(method.to_string())),
        }
    }
}

impl std::fmt::Debug for MethodScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodScope")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
