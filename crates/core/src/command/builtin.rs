use crate::error::{ScenarioError, ScenarioResult};
use crate::instruction::Instruction;
use crate::scope::CallOutcome;
use crate::value::{Arg, WaitFor};

use super::{
    raw_args, CommandHandler, CompileContext, ExecContext, CUSTOM, EXIT, GOTO, PRINT, WAIT,
};

/// `wait,<delay|event>`: suspends until the delay elapses or the event is
/// continued.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaitCmd;

impl CommandHandler for WaitCmd {
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        _ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>> {
        let target = match tokens.get(1) {
            Some(token) if !token.is_empty() => WaitFor::from_token(token),
            _ => return Err(ScenarioError::invalid_arguments(WAIT, "missing delay or event")),
        };
        let arg = match target {
            WaitFor::Delay(delay) => Arg::Number(delay),
            WaitFor::Event(name) => Arg::Str(name),
        };
        Ok(Some(Instruction::new(WAIT, index, vec![Arg::from(WAIT), arg])))
    }

    fn run(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()> {
        let target = instruction
            .arg(1)
            .and_then(WaitFor::from_arg)
            .ok_or_else(|| ScenarioError::invalid_arguments(WAIT, "missing delay or event"))?;
        ctx.control.wait(target);
        Ok(())
    }
}

/// `-,<method>,args...`: forwards a call to the host scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomCmd;

impl CommandHandler for CustomCmd {
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>> {
        let method = match tokens.get(1) {
            Some(method) if !method.is_empty() => method,
            _ => return Ok(None),
        };
        let mut args = Vec::with_capacity(tokens.len());
        args.push(Arg::from(CUSTOM));
        args.push(Arg::Str(method.clone()));
        args.extend(tokens[2..].iter().map(|token| ctx.convert(token)));
        Ok(Some(Instruction::new(CUSTOM, index, args)))
    }

    fn run(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()> {
        let method = instruction
            .arg(1)
            .and_then(Arg::as_str)
            .ok_or_else(|| ScenarioError::invalid_arguments(CUSTOM, "missing method name"))?;
        let args = instruction.args.get(2..).unwrap_or_default();
        if ctx.control.is_debug_mode() {
            let rendered: Vec<String> = args.iter().map(Arg::to_string).collect();
            ctx.control.log(format!("{method}({})", rendered.join(", ")));
        }
        match ctx.invoke(method, args)? {
            CallOutcome::Done => {}
            CallOutcome::Wait(target) => ctx.control.wait(target),
        }
        Ok(())
    }
}

/// `goto,<label>`: moves the program counter to a label.
#[derive(Clone, Copy, Debug, Default)]
pub struct GotoCmd;

impl CommandHandler for GotoCmd {
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        _ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>> {
        match tokens.get(1) {
            Some(label) if !label.is_empty() => {
                Ok(Some(Instruction::new(GOTO, index, raw_args(&tokens[..2]))))
            }
            _ => Err(ScenarioError::invalid_arguments(GOTO, "missing label")),
        }
    }

    fn run(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()> {
        let label = instruction
            .arg(1)
            .and_then(Arg::as_str)
            .ok_or_else(|| ScenarioError::invalid_arguments(GOTO, "missing label"))?;
        // An unknown label is reported by the lookup itself.
        ctx.control.goto(label);
        Ok(())
    }
}

/// `exit`: completes the scenario immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExitCmd;

impl CommandHandler for ExitCmd {
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        _ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>> {
        Ok(Some(Instruction::new(EXIT, index, raw_args(&tokens[..1]))))
    }

    fn run(&mut self, _instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()> {
        if ctx.control.is_debug_mode() {
            ctx.control.log("#EXIT");
        }
        ctx.control.complete();
        Ok(())
    }
}

/// `print,<text>...`: emits the remaining tokens as an info diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintCmd;

impl CommandHandler for PrintCmd {
    fn compile(
        &mut self,
        tokens: &[String],
        index: usize,
        _ctx: &CompileContext<'_>,
    ) -> ScenarioResult<Option<Instruction>> {
        Ok(Some(Instruction::new(PRINT, index, raw_args(tokens))))
    }

    fn run(&mut self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> ScenarioResult<()> {
        let text: Vec<String> = instruction.args.iter().skip(1).map(Arg::to_string).collect();
        ctx.control.info(text.join(","));
        Ok(())
    }
}
