//! Command-line interface for the bank client simulator.

use lexopt::prelude::*;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
    pub scenario_name: String,
    pub scenario_file: Option<PathBuf>,
    pub bulk: bool,
    pub steps: Option<u32>,
    pub population: Option<u32>,
    pub random_seed: Option<u64>,
    pub output_file: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub enum Command {
    Run,
    Validate { file: PathBuf },
    Scenarios,
    Batch { config: PathBuf },
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::Run,
            scenario_name: "baseline".to_string(),
            scenario_file: None,
            bulk: false,
            steps: None,
            population: None,
            random_seed: None,
            output_file: None,
            history_file: None,
            quiet: false,
            verbose: false,
        }
    }
}

pub fn parse_args() -> Result<CliArgs, lexopt::Error> {
    let mut args = lexopt::Parser::from_env();
    let mut cli_args = CliArgs::default();
    let mut subcommand: Option<String> = None;
    let mut validate_file = None;
    let mut batch_config = None;

    while let Some(arg) = args.next()? {
        match arg {
            Value(val) => {
                let val_str = val.string()?;
                if subcommand.is_none() {
                    subcommand = Some(val_str);
                } else {
                    match subcommand.as_deref() {
                        Some("validate") => validate_file = Some(PathBuf::from(val_str)),
                        Some("batch") => batch_config = Some(PathBuf::from(val_str)),
                        _ => {}
                    }
                }
            }
            Long("scenario") => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.scenario_name = val.string()?;
                }
            }
            Long("scenario-file") | Short('f') => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.scenario_file = Some(PathBuf::from(val.string()?));
                }
            }
            Long("bulk") => cli_args.bulk = true,
            Long("steps") => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.steps = Some(val.parse()?);
                }
            }
            Long("population") | Short('p') => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.population = Some(val.parse()?);
                }
            }
            Long("seed") => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.random_seed = Some(val.parse()?);
                }
            }
            Long("output") | Short('o') => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.output_file = Some(PathBuf::from(val.string()?));
                }
            }
            Long("history") => {
                if let Some(Value(val)) = args.next()? {
                    cli_args.history_file = Some(PathBuf::from(val.string()?));
                }
            }
            Long("quiet") | Short('q') => cli_args.quiet = true,
            Long("verbose") | Short('v') => cli_args.verbose = true,
            Long("help") | Short('h') => {
                print_help();
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    cli_args.command = match subcommand.as_deref() {
        None | Some("run") => Command::Run,
        Some("validate") => match validate_file {
            Some(file) => Command::Validate { file },
            None => {
                eprintln!("Error: validate command requires a scenario file");
                std::process::exit(1);
            }
        },
        Some("scenarios") => Command::Scenarios,
        Some("batch") => match batch_config {
            Some(config) => Command::Batch { config },
            None => {
                eprintln!("Error: batch command requires a configuration file");
                std::process::exit(1);
            }
        },
        Some(other) => {
            return Err(lexopt::Error::from(format!("unknown command: {other}")));
        }
    };

    Ok(cli_args)
}

pub fn print_help() {
    println!(
        r#"bank-model-sim - bank client population simulator

USAGE:
    bank-model-sim [COMMAND] [OPTIONS]

COMMANDS:
    run                  Run a simulation (default)
    validate <file>      Validate a scenario file and print the report
    scenarios            List the built-in standard scenarios
    batch <config.yaml>  Run a batch of experiments

OPTIONS:
    --scenario <name>       Standard scenario to run (default: baseline)
    -f, --scenario-file <p> Scenario JSON file (overrides --scenario)
    --bulk                  Use the vectorized bulk execution path
    --steps <n>             Override duration_steps
    -p, --population <n>    Override agent_population
    --seed <n>              Override the random seed
    -o, --output <path>     Write the run report as JSON
    --history <path>        Write the event history as JSON
    -q, --quiet             Suppress progress output
    -v, --verbose           Debug logging
    -h, --help              Show this help
"#
    );
}
