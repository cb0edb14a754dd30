//! Borrowed view of a scenario's mutable state.
//!
//! Both the public `Scenario` methods and running command handlers go
//! through [`Control`], so every state transition is implemented once.

use crate::command::LabelCmd;
use crate::config::TimeUnit;
use crate::instruction::{InstMem, Instruction};
use crate::notify::{Diagnostic, Notifier, ScenarioEvent, Severity, StatusDigest};
use crate::timer::{TimerArena, TimerHandle};
use crate::value::WaitFor;

/// Run flags of a scenario.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct RunState {
    pub running: bool,
    pub paused: bool,
    pub wait: Option<WaitFor>,
    pub timer: Option<TimerHandle>,
    pub in_loop: bool,
}

/// Where a jump should land.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JumpTarget {
    Label(String),
    Index(usize),
}

impl From<&str> for JumpTarget {
    fn from(label: &str) -> Self {
        JumpTarget::Label(label.to_string())
    }
}

impl From<String> for JumpTarget {
    fn from(label: String) -> Self {
        JumpTarget::Label(label)
    }
}

impl From<usize> for JumpTarget {
    fn from(index: usize) -> Self {
        JumpTarget::Index(index)
    }
}

pub struct Control<'a> {
    pub(crate) mem: &'a mut InstMem,
    pub(crate) labels: &'a mut LabelCmd,
    pub(crate) run: &'a mut RunState,
    pub(crate) timers: &'a mut TimerArena,
    pub(crate) time_unit: TimeUnit,
    pub(crate) notifier: &'a mut Notifier,
}

impl Control<'_> {
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
        self.labels.last_label()
    }

    pub fn previous_label(&self) -> &str {
        self.labels.previous_label()
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// True when someone listens on the log channel.
    pub fn is_debug_mode(&self) -> bool {
        self.notifier.has_log_listeners()
    }

    pub fn status(&self) -> StatusDigest {
        StatusDigest {
            running: self.run.running,
            paused: self.run.paused,
            waiting: self.run.wait.clone(),
            next_index: self.mem.next_index(),
        }
    }

    /// Debug-level message on the log channel.
    pub fn log(&mut self, message: impl Into<String>) {
        self.emit(Severity::Debug, message.into());
    }

    /// Info-level message on the log channel.
    pub fn info(&mut self, message: impl Into<String>) {
        self.emit(Severity::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.emit(Severity::Error, message.into());
    }

    pub fn emit_event(&mut self, event: ScenarioEvent) {
        self.notifier.emit_event(event);
    }

    /// Resolves a label, reporting unknown ones on the error channel.
    pub fn get_index(&mut self, label: &str) -> Option<usize> {
        let index = self.labels.get_index(label);
        if index.is_none() {
            self.error(format!("Label: {label} is not found"));
        }
        index
    }

    /// Sets the program counter; returns false when the label is unknown.
    pub fn goto(&mut self, target: impl Into<JumpTarget>) -> bool {
        let index = match target.into() {
            JumpTarget::Label(label) => match self.get_index(&label) {
                Some(index) => index,
                None => return false,
            },
            JumpTarget::Index(index) => index,
        };
        if self.is_debug_mode() {
            self.log(format!("Goto index {index}"));
        }
        self.mem.set_next_index(Some(index));
        true
    }

    /// Suspends the loop until `target` is continued. Delays also schedule a
    /// timer that continues on its own. Ignored while idle.
    pub fn wait(&mut self, target: WaitFor) {
        if !self.run.running {
            tracing::debug!(%target, "wait ignored while idle");
            return;
        }
        self.cancel_timer();
        if self.is_debug_mode() {
            self.log(format!("#WAIT: {target}"));
        }
        if let WaitFor::Delay(delay) = &target {
            let handle = self
                .timers
                .schedule_once(self.time_unit.to_millis(*delay), target.clone());
            if self.run.paused {
                self.timers.set_paused(handle, true);
            }
            self.run.timer = Some(handle);
        }
        self.run.wait = Some(target);
    }

    /// Clears a matching wait. Returns true when the loop may resume.
    pub fn continue_with(&mut self, target: &WaitFor) -> bool {
        if !self.run.running || self.run.paused {
            return false;
        }
        match &self.run.wait {
            Some(current) if current == target => {}
            _ => return false,
        }
        self.cancel_timer();
        self.run.wait = None;
        true
    }

    pub fn pause(&mut self) {
        if !self.run.running || self.run.paused {
            return;
        }
        self.run.paused = true;
        if let Some(handle) = self.run.timer {
            self.timers.set_paused(handle, true);
        }
    }

    pub fn resume(&mut self) {
        if !self.run.running || !self.run.paused {
            return;
        }
        self.run.paused = false;
        if let Some(handle) = self.run.timer {
            self.timers.set_paused(handle, false);
        }
    }

    pub fn stop(&mut self) {
        if !self.run.running {
            return;
        }
        self.run.running = false;
        self.run.paused = false;
        self.run.wait = None;
        self.cancel_timer();
    }

    pub fn complete(&mut self) {
        self.notifier.emit_event(ScenarioEvent::Complete);
        self.stop();
    }

    pub(crate) fn enter_label(&mut self, instruction: &Instruction) {
        let name = instruction
            .arg(1)
            .map(ToString::to_string)
            .unwrap_or_default();
        if self.is_debug_mode() {
            self.log(format!("#LABEL: {name}"));
        }
        let previous = self.labels.enter(&name).to_string();
        self.notifier.emit_event(ScenarioEvent::LabelChanged {
            current: name,
            previous,
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.run.timer.take() {
            self.timers.remove(handle);
        }
    }

    fn emit(&mut self, severity: Severity, message: String) {
        let diagnostic = Diagnostic {
            severity,
            message,
            status: self.status(),
        };
        self.notifier.emit_diagnostic(diagnostic);
    }
}
