#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use csv_scenario::{
    Arg, CallOutcome, LoadOptions, MethodScope, Scenario, ScenarioEvent, StartOptions, WaitFor,
};

/// Shared, ordered log of everything a scenario did.
pub type Trace = Rc<RefCell<Vec<String>>>;

/// Scope used by the integration tests.
///
/// `ask` suspends on the `answer` event; every other method is recorded as
/// `call name(args)`.
pub fn tracing_scope(trace: &Trace) -> MethodScope {
    let sink = Rc::clone(trace);
    MethodScope::new()
        .method("ask", |_args, _control| {
            Ok(CallOutcome::Wait(WaitFor::event("answer")))
        })
        .fallback(move |method, args, _control| {
            let rendered: Vec<String> = args.iter().map(Arg::to_string).collect();
            sink.borrow_mut()
                .push(format!("call {method}({})", rendered.join(",")));
            Ok(CallOutcome::Done)
        })
}

/// Loads `script` with a tracing scope and wires every channel into the
/// returned trace.
pub fn traced_scenario(script: &str, options: &LoadOptions) -> (Scenario, Trace) {
    let trace: Trace = Rc::default();
    let mut scenario = Scenario::default();

    let sink = Rc::clone(&trace);
    scenario.on_event(move |event| {
        let line = match event {
            ScenarioEvent::Complete => "complete".to_string(),
            ScenarioEvent::LabelChanged { current, previous } => {
                format!("label {previous} -> {current}")
            }
            other => format!("{other:?}"),
        };
        sink.borrow_mut().push(line);
    });
    let sink = Rc::clone(&trace);
    scenario.on_error(move |diagnostic| {
        sink.borrow_mut()
            .push(format!("error {}", diagnostic.message));
    });

    scenario
        .load(script, Some(Box::new(tracing_scope(&trace))), options)
        .expect("load script");
    (scenario, trace)
}

/// Starts `script` and advances the clock `ticks` times by `tick_ms`,
/// stopping early once the scenario is no longer running.
pub fn run_headless(script: &str, ticks: usize, tick_ms: f64) -> String {
    let (mut scenario, trace) = traced_scenario(script, &LoadOptions::default());
    scenario.start(&StartOptions::default());
    for _ in 0..ticks {
        if !scenario.is_running() {
            break;
        }
        scenario.update(tick_ms);
    }
    let lines = trace.borrow().join("\n");
    lines
}
