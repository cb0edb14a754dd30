//! End-to-end runs of small scripts, checked against golden traces.

use csv_scenario::{LoadOptions, Scenario, ScenarioConfig, StartOptions, TimeUnit, WaitFor};

mod common;
use common::{run_headless, traced_scenario};

#[test]
fn golden_timed_dialogue() {
    let script = "\
#label,intro
-,say,\"Hello, world\"
500,say,second
#label,outro
-,say,3,true,null
";
    let trace = run_headless(script, 10, 100.0);
    insta::assert_snapshot!(trace, @r###"
    label  -> intro
    call say(Hello, world)
    call say(second)
    label intro -> outro
    call say(3,true,null)
    complete
    "###);
}

#[test]
fn golden_bounded_loop() {
    let script = "#label,top\n-,tick\n100\n#goto,top";
    let trace = run_headless(script, 2, 100.0);
    insta::assert_snapshot!(trace, @r###"
    label  -> top
    call tick()
    label top -> top
    call tick()
    label top -> top
    call tick()
    "###);
}

#[test]
fn golden_reports_script_faults_without_stopping() {
    let script = "#Nope,x\n#goto,nowhere\n-,after";
    let trace = run_headless(script, 0, 0.0);
    insta::assert_snapshot!(trace, @r###"
    error Line 0: ["nope","x"] is not a valid command
    error Label: nowhere is not found
    call after()
    complete
    "###);
}

#[test]
fn event_waits_gate_progress() {
    let (mut scenario, trace) =
        traced_scenario("doorOpened,enter\n-,ask\n-,done", &LoadOptions::default());
    scenario.start(&StartOptions::default());
    assert_eq!(scenario.wait_event(), Some(&WaitFor::event("doorOpened")));

    scenario.continue_with("windowOpened");
    scenario.update(10_000.0);
    assert!(trace.borrow().is_empty());

    scenario.continue_with("doorOpened");
    assert_eq!(scenario.wait_event(), Some(&WaitFor::event("answer")));
    scenario.continue_with("answer");
    assert_eq!(
        *trace.borrow(),
        vec!["call enter()", "call done()", "complete"]
    );
}

#[test]
fn pause_and_resume_are_idempotent() {
    let (mut scenario, trace) = traced_scenario("200,late", &LoadOptions::default());
    scenario.pause();
    assert!(!scenario.is_paused());

    scenario.start(&StartOptions::default());
    scenario.pause();
    scenario.pause();
    scenario.update(500.0);
    scenario.resume();
    scenario.resume();
    scenario.update(199.0);
    assert!(trace.borrow().is_empty());
    scenario.update(1.0);
    assert_eq!(*trace.borrow(), vec!["call late()", "complete"]);

    scenario.resume();
    assert!(!scenario.is_running());
}

#[test]
fn complete_fires_once_per_run() {
    let (mut scenario, trace) = traced_scenario("-,a\n#exit\n-,b", &LoadOptions::default());
    scenario.start(&StartOptions::default());
    scenario.update(1_000.0);
    assert_eq!(*trace.borrow(), vec!["call a()", "complete"]);

    scenario.start(&StartOptions::default());
    let completes = trace
        .borrow()
        .iter()
        .filter(|line| line.as_str() == "complete")
        .count();
    assert_eq!(completes, 2);
}

#[test]
fn configuration_from_toml_applies_to_new_scenarios() {
    let config = ScenarioConfig::from_toml_str(
        r#"
time_unit = "s"
prefix = "^!([a-z]+)"
args_convert = false
"#,
    )
    .expect("config parses");
    assert_eq!(config.time_unit, TimeUnit::Seconds);

    let mut scenario = Scenario::new(config);
    scenario
        .load("!wait,2\n-,x,1", None, &LoadOptions::default())
        .expect("load");
    assert_eq!(scenario.instructions().len(), 2);
    assert_eq!(scenario.instructions()[0].command, "wait");
    assert_eq!(scenario.instructions()[1].args[2].as_str(), Some("1"));
}
