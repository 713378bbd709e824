mod scenarios;

use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{debug, info};

use forecourt_sim::EngineConfig;
use scenarios::{demo_chain, get_all_scenarios, get_scenarios_by_names, ScenarioResult};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    /// Human-readable colored summary
    Console,
    /// Machine-readable JSON report
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "forecourt-tester", version = "0.3.0")]
#[command(about = "Automated QA sweeps for the forecourt simulation engine")]
struct Args {
    /// Scenarios to run (comma-separated substrings; matches all by default)
    #[arg(long, default_value = "")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 5)]
    iterations: usize,

    /// Accounting month length passed to the engine
    #[arg(long, default_value_t = 30)]
    month_len_days: u32,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let selected = select_scenarios(&args.scenarios);
    if args.list_scenarios {
        println!("Available scenarios:");
        for s in get_all_scenarios() {
            println!("  {:28} - {}", s.name, s.description);
        }
        return Ok(());
    }

    println!("{}", "Forecourt Simulation Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());

    let seeds = parse_seeds(&args.seeds)?;
    let cfg = EngineConfig {
        month_len_days: args.month_len_days,
        ..EngineConfig::default()
    };
    cfg.validate()?;

    let start = Instant::now();
    let results = run_scenarios(&args, &selected, &seeds, &cfg);
    write_report(&args, &results, start.elapsed())?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn select_scenarios(filter: &str) -> Vec<scenarios::TestScenario> {
    let names: Vec<String> = filter
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        get_all_scenarios()
    } else {
        get_scenarios_by_names(&names)
    }
}

fn parse_seeds(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().with_context(|| format!("bad seed `{s}`")))
        .collect()
}

fn run_scenarios(
    args: &Args,
    selected: &[scenarios::TestScenario],
    seeds: &[u64],
    cfg: &EngineConfig,
) -> Vec<ScenarioResult> {
    let mut results = Vec::with_capacity(selected.len());
    for scenario in selected {
        info!("running scenario `{}`", scenario.name);
        let mut failures = Vec::new();
        let mut durations = Vec::new();
        let mut successes = 0_usize;
        let mut runs = 0_usize;

        for &seed in seeds {
            for iteration in 0..args.iterations {
                runs += 1;
                // Offset keeps iterations distinct but reproducible.
                let effective_seed = scenario
                    .seed_base
                    .wrapping_add(seed)
                    .wrapping_add(iteration as u64);
                let mut state = demo_chain(effective_seed);
                if let Some(setup) = scenario.setup {
                    setup(&mut state);
                }

                let t = Instant::now();
                match (scenario.test_fn)(&mut state, cfg) {
                    Ok(()) => {
                        successes += 1;
                        debug!(
                            "`{}` seed {effective_seed} iteration {iteration} ok",
                            scenario.name
                        );
                    }
                    Err(err) => {
                        failures.push(format!("seed {effective_seed}: {err}"));
                    }
                }
                durations.push(t.elapsed());
            }
        }

        let total: Duration = durations.iter().sum();
        let average = if durations.is_empty() {
            Duration::ZERO
        } else {
            total / u32::try_from(durations.len()).unwrap_or(1)
        };
        let passed = failures.is_empty();
        announce_outcome(args, scenario, passed, &failures, average);
        results.push(ScenarioResult {
            scenario_name: scenario.name.clone(),
            passed,
            iterations_run: runs,
            successful_iterations: successes,
            failures,
            average_duration: average,
        });
    }
    results
}

fn announce_outcome(
    args: &Args,
    scenario: &scenarios::TestScenario,
    passed: bool,
    failures: &[String],
    average: Duration,
) {
    if passed {
        println!(
            "  {} {:28} ({average:.2?} avg)",
            "PASS".green().bold(),
            scenario.name
        );
    } else {
        println!(
            "  {} {:28} ({} failures)",
            "FAIL".red().bold(),
            scenario.name,
            failures.len()
        );
        if args.verbose {
            for failure in failures {
                println!("       {}", failure.red());
            }
        }
    }
}

fn write_report(args: &Args, results: &[ScenarioResult], elapsed: Duration) -> Result<()> {
    let passed = results.iter().filter(|r| r.passed).count();
    match args.report {
        ReportFormat::Console => {
            println!();
            let line = format!(
                "{passed}/{} scenarios passed in {elapsed:.2?}",
                results.len()
            );
            if passed == results.len() {
                println!("{}", line.green().bold());
            } else {
                println!("{}", line.red().bold());
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(results)?;
            match &args.output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    writer.write_all(json.as_bytes())?;
                    writer.flush()?;
                }
                None => {
                    let mut out = stdout().lock();
                    out.write_all(json.as_bytes())?;
                    out.write_all(b"\n")?;
                }
            }
        }
    }
    Ok(())
}
