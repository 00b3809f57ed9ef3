//! Ring quest agent.
//!
//! - `ring_quest_tui play` - speak the line protocol over stdin/stdout
//! - `ring_quest_tui simulate` - grade the agent against local maps
//! - `ring_quest_tui watch` - step through one episode in the terminal

mod watch;

use std::{
    io::{self, BufWriter},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ring_quest_core::{
    Equipment,
    environment::{
        HazardMasks, MapDefinition, RunReport, TestCase, Variant, load_map_from_string, load_suite,
        render_ascii, simulate,
    },
    search::{SearchConfig, Strategy},
    session::{SessionConfig, run_session},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one episode over stdin/stdout
    Play {
        /// Search used every turn
        #[arg(long, default_value_t = Strategy::AStar)]
        strategy: Strategy,

        /// The interactor does not send the perception variant first
        #[arg(long)]
        no_variant_header: bool,
    },

    /// Run the agent against local maps and grade each run
    Simulate(SimulateArgs),

    /// Watch the agent play one map
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["suite", "map", "random"])))]
struct SimulateArgs {
    /// Suite file: a JSON array or JSON lines of {variant, map}
    #[arg(long, value_name = "SUITE_FILE")]
    suite: Option<PathBuf>,

    /// Single map file, JSON or a 13x13 text grid
    #[arg(long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Number of random maps to generate
    #[arg(long, value_name = "COUNT")]
    random: Option<usize>,

    /// Seed for random maps
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Perception variant for maps that do not name one
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    variant: u8,

    #[arg(long, default_value_t = Strategy::AStar)]
    strategy: Strategy,

    /// Print one JSON report per map instead of text
    #[arg(long)]
    json: bool,

    /// Print each map with its hazards before running it
    #[arg(long)]
    show_map: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["map", "seed"])))]
struct WatchArgs {
    /// Map file, JSON or a 13x13 text grid
    #[arg(long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Generate a random map from this seed
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    variant: u8,

    #[arg(long, default_value_t = Strategy::AStar)]
    strategy: Strategy,

    /// Milliseconds between agent turns
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            strategy,
            no_variant_header,
        } => {
            init_logging(cli.verbose, "warn");
            play(strategy, !no_variant_header)
        }
        Commands::Simulate(args) => {
            init_logging(cli.verbose, "info");
            run_simulations(&args)
        }
        // The terminal belongs to the viewer, so no log output here.
        Commands::Watch(args) => watch(&args).map(|()| ExitCode::SUCCESS),
    }
}

/// Logs go to stderr so stdout stays clean for the protocol.
fn init_logging(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn play(strategy: Strategy, variant_header: bool) -> Result<ExitCode> {
    let config = SessionConfig {
        search: SearchConfig::with_strategy(strategy),
        variant_header,
    };
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let report = run_session(stdin, stdout, config).context("writing the final line")?;
    info!(command = %report.command, steps = report.steps, "session finished");
    // `e -1` is a legitimate answer; only broken input is a failure.
    Ok(if report.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Reads a map file in either JSON or text grid form.
fn load_map(path: &Path) -> Result<MapDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read map file {}", path.display()))?;
    let map = if text.trim_start().starts_with('{') {
        serde_json::from_str(&text).map_err(anyhow::Error::from)
    } else {
        load_map_from_string(&text).map_err(anyhow::Error::from)
    };
    map.with_context(|| format!("Failed to load map {}", path.display()))
}

fn load_cases(args: &SimulateArgs) -> Result<Vec<TestCase>> {
    let variant = Variant::try_from(args.variant)?;
    if let Some(path) = &args.suite {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read suite {}", path.display()))?;
        return load_suite(&text).with_context(|| format!("Failed to load suite {}", path.display()));
    }
    if let Some(path) = &args.map {
        return Ok(vec![TestCase {
            variant,
            map: load_map(path)?,
        }]);
    }
    let mut rng = StdRng::seed_from_u64(args.seed);
    Ok((0..args.random.unwrap_or(0))
        .map(|_| TestCase {
            variant,
            map: MapDefinition::random(&mut rng),
        })
        .collect())
}

fn describe(index: usize, report: &RunReport) -> String {
    let optimum = report
        .reference
        .to_second
        .map_or_else(|| "none".to_string(), |n| n.to_string());
    let answer = if report.claimed_unsolvable {
        "-1".to_string()
    } else {
        report
            .reported_length
            .map_or_else(|| "-".to_string(), |n| n.to_string())
    };
    format!(
        "case {index}: {} ({}) answer={answer} moves={} toggles={} optimum={optimum}",
        if report.success { "PASS" } else { "FAIL" },
        report.outcome,
        report.moves,
        report.toggles,
    )
}

fn run_simulations(args: &SimulateArgs) -> Result<ExitCode> {
    let cases = load_cases(args)?;
    let config = SearchConfig::with_strategy(args.strategy);

    let mut passed = 0;
    for (index, case) in cases.iter().enumerate() {
        if args.show_map {
            let hazards = HazardMasks::new(&case.map);
            println!("{}\n", render_ascii(&case.map, Some(hazards.mask(Equipment::NONE))));
        }
        let report = simulate(&case.map, case.variant, config);
        if report.success {
            passed += 1;
        } else {
            warn!(index, outcome = %report.outcome, "run failed");
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", describe(index, &report));
        }
    }

    if !args.json {
        println!("{passed}/{} passed", cases.len());
    }
    Ok(if passed == cases.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn watch(args: &WatchArgs) -> Result<()> {
    let map = match (&args.map, args.seed) {
        (Some(path), _) => load_map(path)?,
        (None, seed) => MapDefinition::random(&mut StdRng::seed_from_u64(seed.unwrap_or(0))),
    };
    let variant = Variant::try_from(args.variant)?;
    let config = SearchConfig::with_strategy(args.strategy);
    watch::run(map, variant, config, args.tick_ms)
}
