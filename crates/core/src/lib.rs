//! CSV scenario runtime.
//!
//! Scripts are rows of comma-separated tokens. Each row compiles into
//! instructions that a [`Scenario`] executes one at a time, suspending on
//! timed or named waits:
//!
//! ```text
//! #label,intro
//! 500,say,hello        <- wait 500 then call scope.say("hello")
//! doorOpened,say,hi    <- wait for the "doorOpened" event, then call say
//! #goto,intro
//! ```

pub mod command;
mod compiler;
mod config;
mod control;
pub mod csv;
mod error;
mod instruction;
mod notify;
mod runtime;
mod scope;
mod state;
mod storage;
mod timer;
mod value;
mod version;

pub use command::{
    CommandHandler, CommandRegistry, CompileContext, ExecContext, LabelCmd, LabelState,
};
pub use config::{
    CommandPrefix, LoadOptions, ScenarioConfig, StartOptions, TimeUnit, DEFAULT_PREFIX,
};
pub use control::{Control, JumpTarget};
pub use error::{ScenarioError, ScenarioResult};
pub use instruction::{InstMem, Instruction};
pub use notify::{Diagnostic, Notifier, ScenarioEvent, Severity, StatusDigest, SubscriptionId};
pub use runtime::Scenario;
pub use scope::{CallOutcome, MethodScope, ScenarioScope};
pub use state::ScenarioSnapshot;
pub use storage::{SaveData, SaveError};
pub use timer::{TimerArena, TimerHandle};
pub use value::{convert_token, parse_number, Arg, ArgConverter, WaitFor};
pub use version::{SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION};
