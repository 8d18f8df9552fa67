use bank_model::bulk::{AgentTable, BulkOrchestrator};
use bank_model::cli::{self, CliArgs, Command};
use bank_model::experiment::{comparison_summary, ExperimentBatch};
use bank_model::scenario::{standard_scenarios, Scenario};
use bank_model::seed;
use bank_model::simulation::Simulation;

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("Error: {error}");
            cli::print_help();
            std::process::exit(1);
        }
    };

    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match &args.command {
        Command::Run => run_command(&args),
        Command::Validate { file } => validate_command(file),
        Command::Scenarios => {
            list_scenarios();
            Ok(())
        }
        Command::Batch { config } => batch_command(config, args.quiet),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn load_scenario(args: &CliArgs) -> Result<Scenario, String> {
    let mut scenario = match &args.scenario_file {
        Some(file) => {
            let path = file
                .to_str()
                .ok_or_else(|| "scenario path is not valid UTF-8".to_string())?;
            Scenario::load_validated(path)?
        }
        None => standard_scenarios()
            .remove(&args.scenario_name)
            .ok_or_else(|| format!("unknown standard scenario '{}'", args.scenario_name))?,
    };

    if let Some(steps) = args.steps {
        scenario.parameters.duration_steps = steps;
    }
    if let Some(population) = args.population {
        scenario.parameters.agent_population = population;
    }
    if let Some(seed) = args.random_seed {
        scenario.parameters.random_seed = Some(seed);
    }
    Ok(scenario)
}

fn run_command(args: &CliArgs) -> Result<(), String> {
    let scenario = load_scenario(args)?;
    let seed_value = scenario.parameters.random_seed.unwrap_or(42);
    let population =
        seed::synthetic_population(scenario.parameters.agent_population as usize, 0.8, seed_value);

    let (report, history) = if args.bulk {
        let table = AgentTable::from_arena(&population);
        let mut orchestrator = BulkOrchestrator::new(scenario, table);
        let report = orchestrator.run();
        let history = serde_json::to_string_pretty(orchestrator.scheduler.export_history())
            .map_err(|e| e.to_string())?;
        (report, history)
    } else {
        let mut simulation = Simulation::new(scenario, population);
        let report = simulation.run();
        let history = serde_json::to_string_pretty(simulation.scheduler.export_history())
            .map_err(|e| e.to_string())?;
        (report, history)
    };

    if !args.quiet {
        println!("{report}");
    }

    if let Some(output) = &args.output_file {
        let path = output
            .to_str()
            .ok_or_else(|| "output path is not valid UTF-8".to_string())?;
        report.save_to_file(path).map_err(|e| e.to_string())?;
        println!("Report written to {path}");
    }
    if let Some(history_path) = &args.history_file {
        let path = history_path
            .to_str()
            .ok_or_else(|| "history path is not valid UTF-8".to_string())?;
        std::fs::write(path, history).map_err(|e| e.to_string())?;
        println!("Event history written to {path}");
    }

    Ok(())
}

fn validate_command(file: &std::path::Path) -> Result<(), String> {
    let path = file
        .to_str()
        .ok_or_else(|| "scenario path is not valid UTF-8".to_string())?;
    let scenario = Scenario::load_from_file(path)?;
    let report = scenario.validate();
    print!("{report}");
    if report.is_valid() {
        println!("{scenario}");
        Ok(())
    } else {
        Err(format!("scenario '{}' is invalid", scenario.metadata.name))
    }
}

fn list_scenarios() {
    let scenarios = standard_scenarios();
    let mut names: Vec<_> = scenarios.keys().collect();
    names.sort();
    println!("Standard scenarios:");
    for name in names {
        let scenario = &scenarios[name];
        println!(
            "  {:<22} {} ({} steps, {} agents, {} events)",
            name,
            scenario.metadata.description,
            scenario.parameters.duration_steps,
            scenario.parameters.agent_population,
            scenario.events.len()
        );
    }
}

fn batch_command(config: &std::path::Path, quiet: bool) -> Result<(), String> {
    let batch = ExperimentBatch::load_from_file(config)?;
    if !quiet {
        println!("Batch: {} ({} experiments)", batch.name, batch.experiments.len());
    }
    let results = batch.run(quiet);
    print!("{}", comparison_summary(&results));
    if results.iter().any(|r| !r.success) {
        Err("one or more experiments failed".to_string())
    } else {
        Ok(())
    }
}
