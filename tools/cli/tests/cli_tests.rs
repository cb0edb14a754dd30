use std::fs;
use std::process::{Command, Output};

fn csvscenario(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_csvscenario"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("run csvscenario")
}

/// Runs with the default log filter (no `RUST_LOG`).
fn csvscenario_default_filter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_csvscenario"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run csvscenario")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn run_prints_calls_and_completion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("intro.csv");
    fs::write(&script, "#label,intro\n-,say,hello\n32,say,2\n").unwrap();

    let output = csvscenario(&["run", script.to_str().unwrap(), "--tick-ms", "16"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "-- label intro\nsay(hello)\nsay(2)\n-- complete\n"
    );
}

#[test]
fn run_feeds_events_and_saves() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("door.csv");
    let save = dir.path().join("door.csvs");
    fs::write(&script, "door,enter\n-,prompt,name\n-,greet\n").unwrap();

    let output = csvscenario(&[
        "run",
        script.to_str().unwrap(),
        "--event",
        "door",
        "--save",
        save.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("enter()"));
    assert!(text.contains("-- waiting for event 'answer'"));
    assert!(!text.contains("greet()"));

    let resumed = csvscenario(&["resume", save.to_str().unwrap(), "--event", "answer"]);
    assert!(resumed.status.success());
    assert_eq!(stdout(&resumed), "greet()\n-- complete\n");
}

#[test]
fn check_reports_invalid_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("good.csv"), "-,a\n").unwrap();
    fs::write(dir.path().join("bad.csv"), "#Nope,1\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "#Nope\n").unwrap();

    let output = csvscenario(&["check", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("FAIL"));
    assert!(text.contains(r#"Line 0: ["nope","1"] is not a valid command"#));
    assert!(text.contains("good.csv (1 instructions)"));
    assert!(!text.contains("notes.txt"));
}

#[test]
fn dump_writes_yaml_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("loop.csv");
    let output_path = dir.path().join("out").join("loop.yaml");
    fs::write(&script, "#label,top\n10\n#goto,top\n").unwrap();

    let output = csvscenario(&[
        "dump",
        script.to_str().unwrap(),
        "-o",
        output_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let yaml = fs::read_to_string(output_path).unwrap();
    assert!(yaml.contains("command: goto"));
    assert!(yaml.contains("top: 0"));
}

#[test]
fn verbose_raises_the_log_filter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("hello.csv");
    fs::write(&script, "-,say,hi\n").unwrap();
    let script = script.to_str().unwrap();

    let quiet = csvscenario_default_filter(&["run", script]);
    assert!(quiet.status.success());
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("scenario started"));

    let verbose = csvscenario_default_filter(&["--verbose", "run", script]);
    assert!(verbose.status.success());
    assert!(String::from_utf8_lossy(&verbose.stderr).contains("scenario started"));
    assert!(stdout(&verbose).contains("[Debug] Start at Label: "));
}
