//! Command handlers and the registry that dispatches to them.
//!
//! A handler turns one token row into an [`Instruction`] at compile time and
//! executes that instruction later through an [`ExecContext`]. The `label`
//! handler is not a trait object: the runtime needs direct access to its
//! table for `goto`, `start` and `get_index`, so the registry owns it as a
//! concrete [`LabelCmd`].

mod builtin;
mod label;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::control::Control;
use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::Instruction;
use crate::scope::{CallOutcome, ScenarioScope};
use crate::value::{convert_token, Arg, ArgConverter};

pub use builtin::{CustomCmd, ExitCmd, GotoCmd, PrintCmd, WaitCmd};
pub use label::{LabelCmd, LabelState};

/// Built-in command names.
pub const LABEL: &str = "label";
pub const WAIT: &str = "wait";
pub const CUSTOM: &str = "-";
pub const GOTO: &str = "goto";
pub const EXIT: &str = "exit";
pub const PRINT: &str = "print";

/// Compile and run capabilities of a command.
pub trait CommandHandler {
    /// Compiles a row whose first token is the command name. `Ok(None)`
    /// means the row produces no instruction.
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>>;

    fn run(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()>;

    /// Handler-internal state to persist, if any.
    fn to_json(&self) -> Option<Value> {
        None
    }

    /// Restores persisted state; `None` resets to the initial state.
    fn reset_from_json(&mut self, _state: Option<&Value>) -> ScenarioResult<()> {
        Ok(())
    }
}

/// Argument conversion settings visible while compiling.
pub struct CompileContext<'a> {
    pub args_convert: bool,
    pub converter: Option<&'a ArgConverter>,
    pub convert_scope: Option<&'a Value>,
}

impl CompileContext<'_> {
    /// Converts a raw token according to the current settings.
    pub fn convert(&self, token: &str) -> Arg {
        if !self.args_convert {
            return Arg::Str(token.to_string());
        }
        match self.converter {
            Some(converter) => converter(token, self.convert_scope),
            None => convert_token(token),
        }
    }
}

impl Default for CompileContext<'_> {
    fn default() -> Self {
        Self {
            args_convert: true,
            converter: None,
            convert_scope: None,
        }
    }
}

/// What a running handler may touch: the runtime through [`Control`] and the
/// host scope.
pub struct ExecContext<'a> {
    pub control: Control<'a>,
    scope: Option<&'a mut Box<dyn ScenarioScope>>,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(control: Control<'a>, scope: Option<&'a mut Box<dyn ScenarioScope>>) -> Self {
        Self { control, scope }
    }

    pub fn has_scope(&self) -> bool {
        self.scope.is_some()
    }

    /// Calls `method` on the host scope.
    pub fn invoke(&mut self, method: &str, args: &[Arg]) -> ScenarioResult<CallOutcome> {
        match self.scope.as_mut() {
            Some(scope) => scope.invoke(method, args, &mut self.control),
            None => Err(ScenarioError::MissingScope(method.to_string())),
        }
    }
}

/// Command name to handler table.
pub struct CommandRegistry {
    label: LabelCmd,
    handlers: BTreeMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Registry with every built-in command.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(WAIT, WaitCmd);
        registry.register(CUSTOM, CustomCmd);
        registry.register(GOTO, GotoCmd);
        registry.register(EXIT, ExitCmd);
        registry.register(PRINT, PrintCmd);
        registry
    }

    /// Registry holding only the mandatory `label` handler.
    pub fn empty() -> Self {
        Self {
            label: LabelCmd::new(),
            handlers: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a handler; names are matched lower-case.
    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) {
        self.handlers.insert(name.to_lowercase(), Box::new(handler));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(&name.to_lowercase()).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        name == LABEL || self.handlers.contains_key(name)
    }

    /// Handler registered under `name`. `label` is reached through
    /// [`CommandRegistry::label`] instead.
    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.handlers.get(name).map(|handler| handler.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn CommandHandler>> {
        self.handlers.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(LABEL).chain(self.handlers.keys().map(String::as_str))
    }

    pub fn label(&self) -> &LabelCmd {
        &self.label
    }

    pub fn label_mut(&mut self) -> &mut LabelCmd {
        &mut self.label
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut LabelCmd, &mut BTreeMap<String, Box<dyn CommandHandler>>) {
        (&mut self.label, &mut self.handlers)
    }

    /// Compiles a row with the handler named by `tokens[0]`. Returns `None`
    /// when no such handler exists.
    pub fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        ctx: &CompileContext<'_>,
    ) -> Option<ScenarioResult<Option<Instruction>>> {
        let name = tokens.first()?;
        if name == LABEL {
            return Some(self.label.compile(tokens, index));
        }
        let handler = self.handlers.get_mut(name.as_str())?;
        Some(handler.compile(tokens, index, ctx))
    }

    pub fn to_json(&self) -> BTreeMap<String, Value> {
        let mut state = BTreeMap::new();
        state.insert(LABEL.to_string(), self.label.to_json());
        for (name, handler) in &self.handlers {
            if let Some(value) = handler.to_json() {
                state.insert(name.clone(), value);
            }
        }
        state
    }

    /// Cascades state to every handler; `None` resets all of them.
    pub fn reset_from_json(&mut self, state: Option<&BTreeMap<String, Value>>) -> ScenarioResult<()> {
        let entry = |name: &str| state.and_then(|map| map.get(name));
        self.label.reset_from_json(entry(LABEL))?;
        for (name, handler) in self.handlers.iter_mut() {
            handler.reset_from_json(entry(name.as_str()))?;
        }
        Ok(())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("label", &self.label)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the instruction args from raw tokens without conversion.
pub(crate) fn raw_args(tokens: &[String]) -> Vec<Arg> {
    tokens.iter().map(|token| Arg::Str(token.clone())).collect()
}

#[cfg(test)]
#[path = "../tests/registry_tests.rs"]
mod tests;
