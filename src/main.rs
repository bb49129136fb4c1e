//! Lather CLI

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use clap::{Args, Parser, Subcommand};
use humanize_duration::{Truncate, prelude::DurationExt};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;

use lather::{
    config::{ConfigError, RunConfig},
    logging::{self, LoggingConfig, LoggingError},
    model::{FormulationStats, ModelBuilder, ModelError},
    params::ParametersError,
    report::{self, ReportError},
    sampler::ConsumerIncomes,
    solvers::{MilpBackend, SolverOptions},
};

/// Seed used when neither the command line nor the config file sets one.
const DEFAULT_SEED: u64 = 42;

/// Exit status for a run whose solve ended without an optimum.
const NO_SOLUTION_EXIT: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "lather", about = "Minimum-emissions hand soap adoption", long_about = None)]
struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample incomes, solve the model and print the report
    Run(RunArgs),

    /// Check a config file without solving
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the YAML run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Income sampler seed; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Show the solver's own progress log
    #[arg(long)]
    solver_log: bool,

    /// Solver time limit in seconds; overrides the config file
    #[arg(long)]
    time_limit: Option<f64>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Path to the YAML run configuration
    #[arg(short, long)]
    config: PathBuf,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parameters(#[from] ParametersError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[expect(clippy::print_stderr, reason = "Errors are reported to the user")]
fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = logging::init_subscriber(&cli.logging)
        .map_err(CliError::from)
        .and_then(|()| run(cli.command));

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Run(args) => run_model(&args),
        Commands::Validate(args) => validate(&args),
    }
}

fn run_model(args: &RunArgs) -> Result<ExitCode, CliError> {
    let config = RunConfig::from_path(&args.config)?;
    let params = config.parameters()?;

    let seed = args.seed.or(config.seed).unwrap_or(DEFAULT_SEED);

    let options = solver_options(&config.solver, args);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let incomes = ConsumerIncomes::sample(&params, &mut rng)?;

    let mut stats = FormulationStats::default();
    let start = Instant::now();

    let outcome = ModelBuilder::new(&params)
        .with_options(options.clone())
        .optimize_with_observer(&incomes, &MilpBackend, &mut stats)?;

    let elapsed = start.elapsed();

    info!(
        seed,
        variables = stats.variables,
        constraints = stats.constraints(),
        solved = outcome.is_solved(),
        "run finished"
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    report::write_to(&outcome, &mut handle)?;

    writeln!(
        handle,
        " {} variables, {} constraints, seed {seed}",
        stats.variables,
        stats.constraints()
    )?;

    if let Some(limit) = options.time_limit_seconds {
        writeln!(handle, " solver time limit {limit}s")?;
    }

    writeln!(
        handle,
        " {} ({}s)",
        elapsed.human(Truncate::Nano),
        elapsed.as_secs_f32()
    )?;

    Ok(if outcome.is_solved() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(NO_SOLUTION_EXIT)
    })
}

/// Command line flags take precedence over the run file.
fn solver_options(configured: &SolverOptions, args: &RunArgs) -> SolverOptions {
    let mut options = configured.clone();

    if args.solver_log {
        options.log_to_console = true;
    }

    if let Some(limit) = args.time_limit {
        options.time_limit_seconds = Some(limit);
    }

    options
}

fn validate(args: &ValidateArgs) -> Result<ExitCode, CliError> {
    let config = RunConfig::from_path(&args.config)?;
    let params = config.parameters()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    writeln!(
        handle,
        "{}: {} consumers, {} timesteps, {} affordability",
        args.config.display(),
        params.consumers(),
        params.timesteps(),
        params.affordability_form()
    )?;

    for &income in params.incomes() {
        writeln!(
            handle,
            "  income {income:.0}: budget {:.2} USD",
            params.budget_for(income)
        )?;
    }

    Ok(ExitCode::SUCCESS)
}
