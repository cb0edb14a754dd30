//! Compiled instructions and the instruction memory holding them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::Arg;

/// One compiled, addressable unit of execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Instruction {
    /// Name of the handler that compiled and will run this instruction.
    pub command: String,
    /// Slot this instruction was compiled for.
    pub index: usize,
    /// Handler-defined payload; `args[0]` is the command token.
    pub args: Vec<Arg>,
}

impl Instruction {
    pub fn new(command: impl Into<String>, index: usize, args: Vec<Arg>) -> Self {
        Self {
            command: command.into(),
            index,
            args,
        }
    }

    /// Returns the argument at `position` (0 is the command token).
    pub fn arg(&self, position: usize) -> Option<&Arg> {
        self.args.get(position)
    }
}

/// Ordered instruction list plus the program counter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstMem {
    queue: Vec<Instruction>,
    next_index: usize,
}

impl InstMem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends at the next free slot and returns that slot.
    pub fn append(&mut self, instruction: Instruction) -> usize {
        self.queue.push(instruction);
        self.queue.len() - 1
    }

    /// Instruction at the program counter, or `None` once the program ran out.
    pub fn get(&self) -> Option<&Instruction> {
        self.queue.get(self.next_index)
    }

    /// Jumps to `index`, or falls through to the next slot when `None`.
    pub fn set_next_index(&mut self, index: Option<usize>) {
        self.next_index = match index {
            Some(index) => index,
            None => self.next_index.saturating_add(1),
        };
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.queue
    }

    pub fn to_json(&self) -> InstMem {
        self.clone()
    }

    /// Restores from a snapshot, or clears everything when `None`.
    pub fn reset_from_json(&mut self, state: Option<&InstMem>) {
        match state {
            Some(state) => *self = state.clone(),
            None => *self = Self::default(),
        }
    }
}
