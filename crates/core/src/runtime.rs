//! Scenario runtime: loads scripts and drives the fetch-execute loop.

use serde_json::Value;

use crate::command::{CommandHandler, CommandRegistry, CompileContext, ExecContext, LABEL};
use crate::compiler::Compiler;
use crate::config::{CommandPrefix, LoadOptions, ScenarioConfig, StartOptions, TimeUnit};
use crate::control::{Control, JumpTarget, RunState};
use crate::csv::tokenize;
use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::{InstMem, Instruction};
use crate::notify::{Diagnostic, Notifier, ScenarioEvent, SubscriptionId};
use crate::scope::ScenarioScope;
use crate::state::ScenarioSnapshot;
use crate::timer::TimerArena;
use crate::value::{Arg, WaitFor};

/// A compiled CSV scenario and its execution state.
///
/// Script-level faults (unknown commands, unknown labels, failing scope
/// calls) never surface as `Err`; they are emitted on the error channel, so
/// callers that care must subscribe with [`Scenario::on_error`].
pub struct Scenario {
    mem: InstMem,
    handlers: CommandRegistry,
    scope: Option<Box<dyn ScenarioScope>>,
    detached_scope_state: Value,
    run: RunState,
    timers: TimerArena,
    config: ScenarioConfig,
    converter: Option<Box<crate::value::ArgConverter>>,
    notifier: Notifier,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            mem: InstMem::new(),
            handlers: CommandRegistry::new(),
            scope: None,
            detached_scope_state: Value::Null,
            run: RunState::default(),
            timers: TimerArena::new(),
            config,
            converter: None,
            notifier: Notifier::new(),
        }
    }

    /// Restores a scenario from a snapshot, attaching `scope` first so it
    /// receives its persisted state.
    pub fn from_json(
        snapshot: &ScenarioSnapshot,
        scope: Option<Box<dyn ScenarioScope>>,
    ) -> ScenarioResult<Self> {
        let mut scenario = Self::new(ScenarioConfig::default());
        scenario.scope = scope;
        scenario.reset_from_json(snapshot)?;
        Ok(scenario)
    }

    // ----- registry and hooks -----

    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) {
        self.handlers.register(name, handler);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.unregister(name)
    }

    pub fn handlers(&self) -> &CommandRegistry {
        &self.handlers
    }

    /// Replaces the default argument coercion.
    pub fn set_arg_converter(
        &mut self,
        converter: impl Fn(&str, Option<&Value>) -> Arg + 'static,
    ) {
        self.converter = Some(Box::new(converter));
    }

    pub fn set_scope(&mut self, scope: Option<Box<dyn ScenarioScope>>) {
        self.scope = scope;
        self.detached_scope_state = Value::Null;
    }

    pub fn on_log(&mut self, callback: impl FnMut(&Diagnostic) + 'static) -> SubscriptionId {
        self.notifier.on_log(callback)
    }

    pub fn on_error(&mut self, callback: impl FnMut(&Diagnostic) + 'static) -> SubscriptionId {
        self.notifier.on_error(callback)
    }

    pub fn on_event(&mut self, callback: impl FnMut(&ScenarioEvent) + 'static) -> SubscriptionId {
        self.notifier.on_event(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // ----- loading -----

    /// Replaces the program with `script`. Does not start it.
    ///
    /// Fails only on configuration problems: an unknown time unit, a bad
    /// prefix pattern, or a missing `wait`/`-` handler.
    pub fn load(
        &mut self,
        script: &str,
        scope: Option<Box<dyn ScenarioScope>>,
        options: &LoadOptions,
    ) -> ScenarioResult<()> {
        self.clean()?;
        if let Some(unit) = &options.time_unit {
            self.config.time_unit = unit.parse()?;
        }
        if let Some(prefix) = &options.prefix {
            self.config.prefix = CommandPrefix::new(prefix)?;
        }
        if let Some(args_convert) = options.args_convert {
            self.config.args_convert = args_convert;
        }
        if let Some(convert_scope) = &options.args_convert_scope {
            self.config.args_convert_scope = Some(convert_scope.clone());
        }
        self.set_scope(scope);
        self.append(script)
    }

    /// Compiles `script` onto the end of the current program.
    ///
    /// On a missing `wait`/`-` handler the rows compiled before the failing
    /// one are kept, and their row errors are still reported.
    pub fn append(&mut self, script: &str) -> ScenarioResult<()> {
        let rows = tokenize(script);
        let mut errors = Vec::new();
        let result = {
            let mut compiler = Compiler {
                prefix: &self.config.prefix,
                registry: &mut self.handlers,
                mem: &mut self.mem,
                ctx: CompileContext {
                    args_convert: self.config.args_convert,
                    converter: self.converter.as_deref(),
                    convert_scope: self.config.args_convert_scope.as_ref(),
                },
            };
            compiler.compile_rows(rows, &mut errors)
        };
        let mut control = self.control();
        for message in errors {
            control.error(message);
        }
        result?;
        if control.is_debug_mode() {
            let count = control.instructions().len();
            control.log(format!("Compiled {count} instructions"));
        }
        Ok(())
    }

    fn clean(&mut self) -> ScenarioResult<()> {
        self.stop();
        self.mem.reset_from_json(None);
        self.handlers.reset_from_json(None)
    }

    // ----- run control -----

    /// Starts at `options.label` (the first instruction when empty).
    /// Returns false, after reporting on the error channel, when the label
    /// does not exist.
    pub fn start(&mut self, options: &StartOptions) -> bool {
        self.stop();
        self.run.wait = None;
        if let Some(handle) = self.run.timer.take() {
            self.timers.remove(handle);
        }
        let mut control = self.control();
        if control.is_debug_mode() {
            control.log(format!("Start at Label: {}", options.label));
        }
        if !control.goto(options.label.as_str()) {
            return false;
        }
        self.run.running = true;
        tracing::debug!(label = %options.label, "scenario started");
        self.run_next_cmd();
        true
    }

    pub fn stop(&mut self) {
        self.control().stop();
    }

    pub fn pause(&mut self) {
        self.control().pause();
    }

    pub fn resume(&mut self) {
        self.control().resume();
    }

    /// Emits `Complete` and stops.
    pub fn complete(&mut self) {
        self.control().complete();
    }

    pub fn goto(&mut self, target: impl Into<JumpTarget>) -> bool {
        self.control().goto(target)
    }

    pub fn get_index(&mut self, label: &str) -> Option<usize> {
        self.control().get_index(label)
    }

    pub fn wait(&mut self, target: WaitFor) {
        self.control().wait(target);
    }

    /// Resumes a scenario waiting on exactly `target`; anything else is
    /// ignored.
    pub fn continue_with(&mut self, target: impl Into<WaitFor>) {
        let target = target.into();
        if self.control().continue_with(&target) {
            self.run_next_cmd();
        }
    }

    /// Advances the timer clock by `delta_ms`, continuing the scenario when
    /// its delay elapses.
    pub fn update(&mut self, delta_ms: f64) {
        for (handle, payload) in self.timers.advance(delta_ms) {
            if self.run.timer == Some(handle) {
                self.run.timer = None;
                self.continue_with(payload);
            }
        }
    }

    /// Stops, drops subscribers and clears the program.
    pub fn shutdown(&mut self) {
        self.stop();
        self.timers.clear();
        self.notifier.clear();
        self.mem.reset_from_json(None);
        // A fresh label table never fails to reset.
        let _ = self.handlers.reset_from_json(None);
        self.scope = None;
        self.detached_scope_state = Value::Null;
    }

    fn run_next_cmd(&mut self) {
        // Handlers only reach the runtime through `Control`, which cannot
        // call back in here; the flag keeps the loop single-entry anyway.
        if self.run.in_loop {
            return;
        }
        self.run.in_loop = true;
        while self.run.running && !self.run.paused && self.run.wait.is_none() {
            let instruction = self.mem.get().cloned();
            self.mem.set_next_index(None);
            let Some(instruction) = instruction else {
                self.control().complete();
                break;
            };
            self.dispatch(&instruction);
        }
        self.run.in_loop = false;
    }

    fn dispatch(&mut self, instruction: &Instruction) {
        let Self {
            mem,
            handlers,
            scope,
            run,
            timers,
            config,
            notifier,
            ..
        } = self;
        let (labels, table) = handlers.parts_mut();
        tracing::trace!(index = instruction.index, command = %instruction.command, "dispatch");
        let control = Control {
            mem,
            labels,
            run,
            timers,
            time_unit: config.time_unit,
            notifier,
        };
        let mut ctx = ExecContext::new(control, scope.as_mut());
        let result = if instruction.command == LABEL {
            ctx.control.enter_label(instruction);
            Ok(())
        } else {
            match table.get_mut(&instruction.command) {
                Some(handler) => handler.run(instruction, &mut ctx),
                None => Err(ScenarioError::CommandFailed {
                    command: instruction.command.clone(),
                    message: "no handler registered".to_string(),
                }),
            }
        };
        if let Err(err) = result {
            ctx.control
                .error(format!("Instruction {}: {err}", instruction.index));
        }
    }

    fn control(&mut self) -> Control<'_> {
        Control {
            mem: &mut self.mem,
            labels: self.handlers.label_mut(),
            run: &mut self.run,
            timers: &mut self.timers,
            time_unit: self.config.time_unit,
            notifier: &mut self.notifier,
        }
    }

    // ----- accessors -----

    pub fn is_running(&self) -> bool {
        self.run.running
    }

    pub fn is_paused(&self) -> bool {
        self.run.paused
    }

    pub fn wait_event(&self) -> Option<&WaitFor> {
        self.run.wait.as_ref()
    }

    pub fn next_index(&self) -> usize {
        self.mem.next_index()
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.mem.instructions()
    }

    pub fn last_label(&self) -> &str {
        self.handlers.label().last_label()
    }

    pub fn previous_label(&self) -> &str {
        self.handlers.label().previous_label()
    }

    pub fn is_debug_mode(&self) -> bool {
        self.notifier.has_log_listeners()
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.config.time_unit
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ----- persistence -----

    pub fn to_json(&self) -> ScenarioSnapshot {
        ScenarioSnapshot {
            state: self.run.running,
            pause: self.run.paused,
            wait: self.run.wait.clone(),
            scope: self
                .scope
                .as_ref()
                .map(|scope| scope.to_json())
                .unwrap_or_else(|| self.detached_scope_state.clone()),
            time_unit: self.config.time_unit.code(),
            prefix: self.config.prefix.as_str().to_string(),
            args_convert: self.config.args_convert,
            args_convert_scope: self.config.args_convert_scope.clone(),
            handlers: self.handlers.to_json(),
            inst_mem: self.mem.to_json(),
            timer: self
                .run
                .timer
                .and_then(|handle| self.timers.remaining_ms(handle)),
        }
    }

    /// Reinitializes every field from `snapshot`, cascading to the
    /// instruction memory, the handlers and the attached scope. A pending
    /// delay wait gets a fresh timer for its remaining time.
    pub fn reset_from_json(&mut self, snapshot: &ScenarioSnapshot) -> ScenarioResult<()> {
        let time_unit = TimeUnit::from_code(snapshot.time_unit)?;
        let prefix = CommandPrefix::new(&snapshot.prefix)?;
        let previous_handlers = self.handlers.to_json();
        if let Err(err) = self.restore_children(snapshot) {
            // State the registry exported itself always restores.
            let _ = self.handlers.reset_from_json(Some(&previous_handlers));
            return Err(err);
        }
        if self.scope.is_none() {
            self.detached_scope_state = snapshot.scope.clone();
        }
        self.mem.reset_from_json(Some(&snapshot.inst_mem));

        self.config.time_unit = time_unit;
        self.config.prefix = prefix;
        self.config.args_convert = snapshot.args_convert;
        self.config.args_convert_scope = snapshot.args_convert_scope.clone();

        self.timers.clear();
        self.run = RunState {
            running: snapshot.state,
            paused: snapshot.state && snapshot.pause,
            wait: snapshot.wait.clone(),
            timer: None,
            in_loop: false,
        };
        let pending_delay = match &self.run.wait {
            Some(WaitFor::Delay(delay)) if self.run.running => Some(*delay),
            _ => None,
        };
        if let Some(delay) = pending_delay {
            let remaining = snapshot.timer.unwrap_or_else(|| time_unit.to_millis(delay));
            let handle = self.timers.schedule_once(remaining, WaitFor::Delay(delay));
            self.timers.set_paused(handle, self.run.paused);
            self.run.timer = Some(handle);
        }
        Ok(())
    }

    /// Fallible part of a restore: handler state, then the host scope.
    fn restore_children(&mut self, snapshot: &ScenarioSnapshot) -> ScenarioResult<()> {
        self.handlers.reset_from_json(Some(&snapshot.handlers))?;
        if let Some(scope) = self.scope.as_mut() {
            scope.reset_from_json(&snapshot.scope)?;
        }
        Ok(())
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new(ScenarioConfig::default())
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("running", &self.run.running)
            .field("paused", &self.run.paused)
            .field("wait", &self.run.wait)
            .field("next_index", &self.mem.next_index())
            .field("instructions", &self.mem.len())
            .field("config", &self.config)
            .field("notifier", &self.notifier)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
