//! Engine Health Core - adaptive baseline and risk scoring CLI
//!
//! Thin command-line surface over the `eh_core` library:
//! - Learn per-(vehicle, gear) baselines from JSON-lines telemetry
//! - Evaluate a live sample against exported baselines
//! - Inspect and validate configuration

use clap::{Args, Parser, Subcommand};
use eh_common::{Error, OutputFormat, TelemetrySample};
use eh_core::config::{list_presets, load_config, ConfigOptions, ResolvedConfig};
use eh_core::exit_codes::ExitCode;
use eh_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage,
};
use eh_core::output::{render_error, render_learned, render_status, render_value};
use eh_core::EngineHealth;
use std::path::{Path, PathBuf};

/// Engine Health Core - per-vehicle adaptive engine health scoring
#[derive(Parser)]
#[command(name = "eh-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to engine.json (must exist when given)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Builtin preset (standard, sensitive, relaxed); ignored with --config
    #[arg(long, global = true, env = "ENGINE_HEALTH_PRESET")]
    preset: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn baselines from JSON-lines telemetry and export them
    Learn(LearnArgs),

    /// Evaluate one sample against exported baselines
    Evaluate(EvaluateArgs),

    /// Validate configuration
    Check,

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct LearnArgs {
    /// JSON-lines file of historical samples ("-" for stdin)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Where to write the exported baselines
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Baselines file produced by `learn`
    #[arg(long, short = 'b')]
    baselines: PathBuf,

    /// Sample as inline JSON, or @path to read it from a file
    #[arg(long, short = 's')]
    sample: String,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
    /// List builtin presets
    Presets,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Off)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _entered = span.enter();

    tracing::debug!(target: event_names::RUN_STARTED, stage = %Stage::Init, "run started");

    let exit_code = match &cli.command {
        Commands::Learn(args) => run_learn(&cli.global, &run_id, args),
        Commands::Evaluate(args) => run_evaluate(&cli.global, &run_id, args),
        Commands::Check => run_check(&cli.global, &run_id),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global, &run_id),
            ConfigCommands::Presets => run_config_presets(&cli.global, &run_id),
        },
    };

    tracing::debug!(
        target: event_names::RUN_FINISHED,
        stage = %Stage::Init,
        exit_code = exit_code.as_i32(),
        "run finished"
    );
    std::process::exit(exit_code.as_i32());
}

fn config_options(global: &GlobalOpts) -> ConfigOptions {
    ConfigOptions {
        config_path: global.config.clone(),
        preset: global.preset.clone(),
    }
}

fn load(global: &GlobalOpts) -> Result<ResolvedConfig, Error> {
    load_config(&config_options(global)).map_err(|e| {
        tracing::error!(
            target: event_names::CONFIG_ERROR,
            stage = %Stage::Init,
            error = %e,
            "configuration error"
        );
        Error::from(e)
    })
}

/// Print an error to stderr and map it to an exit code.
fn fail(global: &GlobalOpts, run_id: &str, command: &str, err: &Error) -> ExitCode {
    eprintln!("{}", render_error(err, global.format, run_id, command));
    ExitCode::from_error(err)
}

fn read_input(path: &Path) -> Result<String, Error> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).map_err(Error::from);
    }
    std::fs::read_to_string(path).map_err(Error::from)
}

fn run_learn(global: &GlobalOpts, run_id: &str, args: &LearnArgs) -> ExitCode {
    let result = (|| -> Result<String, Error> {
        let config = load(global)?;
        let min_samples = config.engine.learner.min_samples;
        let engine = EngineHealth::new(config.engine)?;

        let samples = TelemetrySample::parse_jsonl(&read_input(&args.input)?)?;
        let learned = engine.learn_batch(&samples)?;

        let output = match &args.output {
            Some(path) => {
                std::fs::write(path, engine.export_baselines()?)?;
                Some(path.display().to_string())
            }
            None => None,
        };

        let snapshots: Vec<_> = learned.iter().map(|s| s.as_ref()).collect();
        Ok(render_learned(
            &snapshots,
            min_samples,
            output.as_deref(),
            global.format,
            run_id,
        ))
    })();

    match result {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::Clean
        }
        Err(err) => fail(global, run_id, "learn", &err),
    }
}

fn read_sample(arg: &str) -> Result<TelemetrySample, Error> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => read_input(Path::new(path))?,
        None => arg.to_string(),
    };
    TelemetrySample::from_json(raw.trim())
}

fn run_evaluate(global: &GlobalOpts, run_id: &str, args: &EvaluateArgs) -> ExitCode {
    let result = (|| -> Result<eh_core::EngineStatus, Error> {
        let config = load(global)?;
        let engine = EngineHealth::new(config.engine)?;
        engine.import_baselines(&read_input(&args.baselines)?)?;
        let sample = read_sample(&args.sample)?;
        engine.evaluate(&sample.vehicle_id, sample.gear, &sample)
    })();

    match result {
        Ok(status) => {
            println!("{}", render_status(&status, global.format, run_id));
            ExitCode::from_severity(status.overall_status)
        }
        Err(err) => fail(global, run_id, "evaluate", &err),
    }
}

fn run_check(global: &GlobalOpts, run_id: &str) -> ExitCode {
    let check = match load(global) {
        Ok(config) => {
            let snapshot = config.snapshot();
            match EngineHealth::new(config.engine) {
                Ok(_) => serde_json::json!({
                    "check": "config",
                    "status": "ok",
                    "source": snapshot.source,
                    "path": snapshot.path,
                    "using_defaults": snapshot.path.is_none() && snapshot.preset.is_none(),
                    "schema_version": snapshot.schema_version,
                    "effective_hash": snapshot.effective_hash,
                }),
                Err(err) => return fail(global, run_id, "check", &err),
            }
        }
        Err(err) => return fail(global, run_id, "check", &err),
    };

    match global.format {
        OutputFormat::Summary => println!("[{}] check: OK", run_id),
        _ => println!("{}", render_value(&check, global.format, run_id, "check")),
    }
    ExitCode::Clean
}

fn run_config_show(global: &GlobalOpts, run_id: &str) -> ExitCode {
    match load(global) {
        Ok(config) => {
            let view = serde_json::json!({
                "snapshot": config.snapshot(),
                "engine": config.engine,
            });
            println!("{}", render_value(&view, global.format, run_id, "config show"));
            ExitCode::Clean
        }
        Err(err) => fail(global, run_id, "config show", &err),
    }
}

fn run_config_presets(global: &GlobalOpts, run_id: &str) -> ExitCode {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => println!(
            "{}",
            render_value(&presets, global.format, run_id, "config presets")
        ),
        _ => {
            for preset in &presets {
                println!("{:<10} {}", preset.name, preset.description);
            }
        }
    }
    ExitCode::Clean
}
