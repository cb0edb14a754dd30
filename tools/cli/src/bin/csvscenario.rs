use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use csv_scenario::{
    Arg, CallOutcome, Instruction, LoadOptions, MethodScope, SaveData, Scenario, ScenarioConfig,
    ScenarioEvent, ScenarioSnapshot, StartOptions, WaitFor,
};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "CSV scenario runner")]
struct Cli {
    /// TOML file with default scenario settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print runtime log messages and raise the log filter to debug.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile scripts and report invalid rows. Directories are walked for
    /// `.csv` files.
    Check {
        paths: Vec<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Print the compiled instruction listing as YAML.
    Dump {
        script: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a script headlessly on a simulated clock.
    Run {
        script: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        drive: DriveArgs,
        /// Label to start at.
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Continue a scenario from a save file.
    Resume {
        #[arg(id = "save_file", value_name = "SAVE")]
        save: PathBuf,
        #[command(flatten)]
        drive: DriveArgs,
    },
    /// Print the JSON schema of scenario snapshots.
    Schema,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Time unit for numeric waits (ms or s).
    #[arg(long)]
    time_unit: Option<String>,
    /// Command prefix regex with one capture group.
    #[arg(long)]
    prefix: Option<String>,
    /// Keep arguments as raw strings.
    #[arg(long, default_value_t = false)]
    raw_args: bool,
}

impl LoadArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            time_unit: self.time_unit.clone(),
            prefix: self.prefix.clone(),
            args_convert: self.raw_args.then_some(false),
            args_convert_scope: None,
        }
    }
}

#[derive(clap::Args)]
struct DriveArgs {
    /// Maximum number of clock ticks.
    #[arg(long, default_value_t = 1000)]
    ticks: usize,
    /// Milliseconds per tick.
    #[arg(long, default_value_t = 16.0)]
    tick_ms: f64,
    /// Events fed, in order, whenever the scenario waits on an event.
    #[arg(short, long = "event")]
    events: Vec<String>,
    /// Write a save file when the run stops.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Serialize)]
struct Listing<'a> {
    script: String,
    instructions: &'a [Instruction],
    labels: &'a std::collections::BTreeMap<String, usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Check { paths, load } => check_scripts(&paths, &config, &load.options()),
        Command::Dump {
            script,
            load,
            output,
        } => dump_script(&script, &config, &load.options(), output.as_deref()),
        Command::Run {
            script,
            load,
            drive,
            label,
        } => run_script(&script, &config, &load.options(), &drive, &label, cli.verbose),
        Command::Resume { save, drive } => resume_save(&save, &drive, cli.verbose),
        Command::Schema => {
            let schema = ScenarioSnapshot::json_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects the debug filter.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,csv_scenario=debug,csvscenario=debug"
    } else {
        "warn,csv_scenario=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScenarioConfig> {
    let Some(path) = path else {
        return Ok(ScenarioConfig::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(ScenarioConfig::from_toml_str(&raw)?)
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn collect_scripts(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut scripts = Vec::new();
    for root in paths {
        if !root.is_dir() {
            scripts.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                scripts.push(path.to_path_buf());
            }
        }
    }
    scripts
}

fn check_scripts(paths: &[PathBuf], config: &ScenarioConfig, options: &LoadOptions) -> Result<()> {
    let scripts = collect_scripts(paths);
    if scripts.is_empty() {
        bail!("no scripts found");
    }
    let mut failed = 0usize;
    for path in &scripts {
        let script = read_script(path)?;
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&errors);
        let mut scenario = Scenario::new(config.clone());
        scenario.on_error(move |diagnostic| sink.borrow_mut().push(diagnostic.message.clone()));
        scenario
            .load(&script, None, options)
            .with_context(|| format!("load {}", path.display()))?;

        let errors = errors.borrow();
        if errors.is_empty() {
            println!(
                "ok    {} ({} instructions)",
                path.display(),
                scenario.instructions().len()
            );
        } else {
            failed += 1;
            println!("FAIL  {}", path.display());
            for message in errors.iter() {
                println!("      {message}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} scripts have invalid rows", scripts.len());
    }
    Ok(())
}

fn dump_script(
    path: &Path,
    config: &ScenarioConfig,
    options: &LoadOptions,
    output: Option<&Path>,
) -> Result<()> {
    let script = read_script(path)?;
    let mut scenario = Scenario::new(config.clone());
    scenario.load(&script, None, options)?;
    let listing = Listing {
        script: path.display().to_string(),
        instructions: scenario.instructions(),
        labels: scenario.handlers().label().labels(),
    };
    let yaml = serde_yaml::to_string(&listing)?;
    match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, yaml).with_context(|| format!("write {}", output.display()))?;
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

/// Scope that prints every call. `prompt` suspends until the `answer`
/// event.
fn echo_scope() -> MethodScope {
    MethodScope::new()
        .method("prompt", |args, _control| {
            let rendered: Vec<String> = args.iter().map(Arg::to_string).collect();
            println!("prompt({})", rendered.join(", "));
            Ok(CallOutcome::Wait(WaitFor::event("answer")))
        })
        .fallback(|method, args, _control| {
            let rendered: Vec<String> = args.iter().map(Arg::to_string).collect();
            println!("{method}({})", rendered.join(", "));
            Ok(CallOutcome::Done)
        })
}

fn attach_output(scenario: &mut Scenario, verbose: bool) -> Rc<RefCell<usize>> {
    let errors = Rc::new(RefCell::new(0usize));
    let sink = Rc::clone(&errors);
    scenario.on_error(move |diagnostic| {
        *sink.borrow_mut() += 1;
        eprintln!("error: {}", diagnostic.message);
    });
    scenario.on_event(|event| match event {
        ScenarioEvent::Complete => println!("-- complete"),
        ScenarioEvent::LabelChanged { current, .. } => println!("-- label {current}"),
        other => println!("-- {other:?}"),
    });
    if verbose {
        scenario.on_log(|diagnostic| {
            println!("   [{:?}] {}", diagnostic.severity, diagnostic.message);
        });
    }
    errors
}

fn run_script(
    path: &Path,
    config: &ScenarioConfig,
    options: &LoadOptions,
    drive: &DriveArgs,
    label: &str,
    verbose: bool,
) -> Result<()> {
    let script = read_script(path)?;
    let mut scenario = Scenario::new(config.clone());
    let errors = attach_output(&mut scenario, verbose);
    scenario.load(&script, Some(Box::new(echo_scope())), options)?;
    if !scenario.start(&StartOptions::at(label)) {
        bail!("cannot start at label '{label}'");
    }
    drive_scenario(&mut scenario, drive)?;
    let errors = *errors.borrow();
    if errors > 0 {
        bail!("{errors} errors while running {}", path.display());
    }
    Ok(())
}

fn resume_save(path: &Path, drive: &DriveArgs, verbose: bool) -> Result<()> {
    let save = SaveData::read_from(path).with_context(|| format!("read {}", path.display()))?;
    let mut scenario = Scenario::from_json(&save.snapshot, Some(Box::new(echo_scope())))?;
    attach_output(&mut scenario, verbose);
    if !scenario.is_running() {
        println!("-- save is not running");
        return Ok(());
    }
    scenario.resume();
    drive_scenario(&mut scenario, drive)
}

/// Advances the clock until the scenario stops, the tick budget runs out,
/// or it waits on an event nobody will send.
fn drive_scenario(scenario: &mut Scenario, drive: &DriveArgs) -> Result<()> {
    let mut events: VecDeque<String> = drive.events.iter().cloned().collect();
    for _ in 0..drive.ticks {
        if !scenario.is_running() {
            break;
        }
        match scenario.wait_event().cloned() {
            Some(WaitFor::Event(name)) => match events.pop_front() {
                Some(event) => {
                    tracing::debug!(waiting = %name, sent = %event, "feeding event");
                    scenario.continue_with(event.as_str());
                }
                None => {
                    println!("-- waiting for event '{name}'");
                    break;
                }
            },
            _ => scenario.update(drive.tick_ms),
        }
    }
    if let Some(save) = &drive.save {
        SaveData::new(scenario.to_json())
            .write_to(save)
            .with_context(|| format!("write {}", save.display()))?;
        println!("-- saved {}", save.display());
    }
    Ok(())
}
