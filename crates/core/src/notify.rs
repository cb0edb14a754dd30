//! Lifecycle events and diagnostics emitted by a running scenario.
//!
//! Two channels are kept apart: a closed set of lifecycle events
//! ([`ScenarioEvent`]) and a free-form diagnostic sink ([`Diagnostic`]).
//! Nothing is buffered; subscribers see what is emitted while they are
//! attached.

use serde::{Deserialize, Serialize};

use crate::value::WaitFor;

/// Lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ScenarioEvent {
    /// The program ran past its last instruction or hit `exit`.
    Complete,
    /// A `label` instruction was executed.
    LabelChanged { current: String, previous: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Error,
}

/// Runtime status captured when a diagnostic is emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusDigest {
    pub running: bool,
    pub paused: bool,
    pub waiting: Option<WaitFor>,
    pub next_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub status: StatusDigest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type DiagnosticCallback = Box<dyn FnMut(&Diagnostic)>;
type EventCallback = Box<dyn FnMut(&ScenarioEvent)>;

/// Subscriber lists for both channels.
#[derive(Default)]
pub struct Notifier {
    next_id: u64,
    log: Vec<(SubscriptionId, DiagnosticCallback)>,
    error: Vec<(SubscriptionId, DiagnosticCallback)>,
    events: Vec<(SubscriptionId, EventCallback)>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_log(&mut self, callback: impl FnMut(&Diagnostic) + 'static) -> SubscriptionId {
        let id = self.allocate();
        self.log.push((id, Box::new(callback)));
        id
    }

    pub fn on_error(&mut self, callback: impl FnMut(&Diagnostic) + 'static) -> SubscriptionId {
        let id = self.allocate();
        self.error.push((id, Box::new(callback)));
        id
    }

    pub fn on_event(&mut self, callback: impl FnMut(&ScenarioEvent) + 'static) -> SubscriptionId {
        let id = self.allocate();
        self.events.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscription from whichever channel holds it.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.log.len() + self.error.len() + self.events.len();
        self.log.retain(|(entry, _)| *entry != id);
        self.error.retain(|(entry, _)| *entry != id);
        self.events.retain(|(entry, _)| *entry != id);
        before != self.log.len() + self.error.len() + self.events.len()
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.error.clear();
        self.events.clear();
    }

    pub fn has_log_listeners(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn emit_diagnostic(&mut self, diagnostic: Diagnostic) {
        let listeners = match diagnostic.severity {
            Severity::Error => {
                tracing::warn!(next_index = diagnostic.status.next_index, "{}", diagnostic.message);
                &mut self.error
            }
            Severity::Info => {
                tracing::info!("{}", diagnostic.message);
                &mut self.log
            }
            Severity::Debug => {
                tracing::debug!("{}", diagnostic.message);
                &mut self.log
            }
        };
        for (_, callback) in listeners.iter_mut() {
            callback(&diagnostic);
        }
    }

    pub fn emit_event(&mut self, event: ScenarioEvent) {
        tracing::debug!(?event, "scenario event");
        for (_, callback) in self.events.iter_mut() {
            callback(&event);
        }
    }

    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("log", &self.log.len())
            .field("error", &self.error.len())
            .field("events", &self.events.len())
            .finish()
    }
}
