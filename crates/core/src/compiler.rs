//! Row classifier: turns token rows into instructions.
//!
//! The first token decides how a row is read:
//!
//! | first token            | result                                        |
//! |------------------------|-----------------------------------------------|
//! | `-` or blank           | generic `-` row                               |
//! | number `n`             | `wait n` (only if `n > 0`) then a `-` row     |
//! | prefixed, e.g. `#Goto` | the named command (`goto`)                    |
//! | any other text `e`     | `wait e` (event) then a `-` row               |

use crate::command::{CommandRegistry, CompileContext, CUSTOM, WAIT};
use crate::config::CommandPrefix;
use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::InstMem;
use crate::value::parse_number;

pub(crate) struct Compiler<'a> {
    pub prefix: &'a CommandPrefix,
    pub registry: &'a mut CommandRegistry,
    pub mem: &'a mut InstMem,
    pub ctx: CompileContext<'a>,
}

impl Compiler<'_> {
    /// Compiles every row in order, pushing per-row problems onto `errors`.
    /// Only a missing default handler fails the call; rows before the
    /// failing one stay compiled and their messages stay in `errors`.
    pub fn compile_rows(
        &mut self,
        rows: Vec<Vec<String>>,
        errors: &mut Vec<String>,
    ) -> ScenarioResult<()> {
        for (line, mut row) in rows.into_iter().enumerate() {
            let Some(name) = row.first().cloned() else {
                continue;
            };

            if name == CUSTOM || name.trim().is_empty() {
                row[0] = CUSTOM.to_string();
                self.append_default(&row, line, errors)?;
            } else if let Some(delay) = parse_number(&name) {
                if delay > 0.0 {
                    self.append_default(&[WAIT.to_string(), name], line, errors)?;
                }
                row[0] = CUSTOM.to_string();
                self.append_default(&row, line, errors)?;
            } else if let Some(command) = self.prefix.command_name(&name) {
                row[0] = command;
                match self.append(&row) {
                    None => errors.push(format!(
                        "Line {line}: {} is not a valid command",
                        serde_json::to_string(&row).unwrap_or_default()
                    )),
                    Some(Err(err)) => errors.push(format!("Line {line}: {err}")),
                    Some(Ok(())) => {}
                }
            } else {
                self.append_default(&[WAIT.to_string(), name], line, errors)?;
                row[0] = CUSTOM.to_string();
                self.append_default(&row, line, errors)?;
            }
        }
        Ok(())
    }

    /// Compiles with a handler that must exist.
    fn append_default(
        &mut self,
        tokens: &[String],
        line: usize,
        errors: &mut Vec<String>,
    ) -> ScenarioResult<()> {
        match self.append(tokens) {
            None => Err(ScenarioError::MissingHandler(tokens[0].clone())),
            Some(Err(err)) => {
                errors.push(format!("Line {line}: {err}"));
                Ok(())
            }
            Some(Ok(())) => Ok(()),
        }
    }

    fn append(&mut self, tokens: &[String]) -> Option<ScenarioResult<()>> {
        let index = self.mem.len();
        let compiled = self.registry.compile(tokens, index, &self.ctx)?;
        Some(compiled.map(|instruction| {
            if let Some(instruction) = instruction {
                self.mem.append(instruction);
            }
        }))
    }
}

#[cfg(test)]
#[path = "tests/compiler_tests.rs"]
mod tests;
