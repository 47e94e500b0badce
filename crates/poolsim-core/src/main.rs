//! PoolSim CLI: run autoscaled worker pool simulations.

use clap::{Args, Parser, Subcommand};
use poolsim_core::config::{RouterSection, SimConfig};
use poolsim_core::event_log::{EventSink, JsonlEventLog, Tee, TracingSink};
use poolsim_core::generator::RequestGenerator;
use poolsim_core::metrics;
use poolsim_core::request::JobCategory;
use poolsim_core::SimulationEngine;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "poolsim",
    about = "Simulate an autoscaled worker pool behind a load balancer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Path to TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the initial server count of every pool.
    #[arg(long)]
    servers: Option<u32>,
    /// Override the number of cycles.
    #[arg(long)]
    cycles: Option<u64>,
    /// Override the cooldown period of every pool.
    #[arg(long)]
    cooldown: Option<u32>,
    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Label a standalone pool with a job category (S/P, stream/process).
    #[arg(long)]
    label: Option<JobCategory>,
    /// Write the event log (JSONL) to this file.
    #[arg(short, long)]
    events: Option<PathBuf>,
    /// Output results to JSON file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured simulation.
    Run(RunArgs),
    /// Run with the dual-pool router, using router defaults if the config
    /// has no [router] section.
    Route(RunArgs),
    /// Compare several cooldown periods on the same seed.
    Sweep {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Comma-separated list of cooldown periods.
        #[arg(long, value_delimiter = ',', default_value = "0,25,50,100,200")]
        cooldowns: Vec<u32>,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write generated work items as JSONL.
    GenItems {
        /// Number of items.
        #[arg(short = 'n', long, default_value = "100")]
        count: u64,
        /// Random seed.
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Shortest service duration.
        #[arg(long, default_value = "1")]
        min_duration: u32,
        /// Longest service duration.
        #[arg(long, default_value = "100")]
        max_duration: u32,
        /// Share of processing jobs.
        #[arg(long, default_value = "0.6")]
        process_probability: f64,
        /// Output file path.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List available block filters.
    ListFilters,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args, false),
        Commands::Route(args) => run(args, true),
        Commands::Sweep {
            config,
            cooldowns,
            output,
        } => {
            let sim_config = load_config(config.as_deref());
            let results = poolsim_core::compare_cooldowns(&sim_config, &cooldowns)
                .unwrap_or_else(|e| fail("Simulation failed", e));
            println!("{}", metrics::format_comparison_table(&results));

            if let Some(output_path) = output {
                write_json(&output_path, &results);
            }
        }
        Commands::GenItems {
            count,
            seed,
            min_duration,
            max_duration,
            process_probability,
            output,
        } => {
            let generator =
                RequestGenerator::new(min_duration, max_duration, process_probability)
                    .unwrap_or_else(|e| fail("Invalid generator settings", e));
            if let Err(e) = write_items(&generator, count, seed, &output) {
                fail("Error writing items", e);
            }
            println!("Generated {} items to {}", count, output.display());
        }
        Commands::ListFilters => {
            println!("Available block filters:");
            for name in poolsim_filters::available_filters() {
                println!("  - {}", name);
            }
        }
    }
}

fn run(args: RunArgs, routed: bool) {
    let mut sim_config = load_config(args.config.as_deref());
    if routed && sim_config.router.is_none() {
        sim_config.router = Some(RouterSection::default());
    }
    apply_overrides(&mut sim_config, &args);

    let mut sink: Box<dyn EventSink> = match &args.events {
        Some(path) => {
            let log = JsonlEventLog::create(path)
                .unwrap_or_else(|e| fail("Error opening event log", e));
            Box::new(Tee::new(log, TracingSink))
        }
        None => Box::new(TracingSink),
    };

    let mut engine =
        SimulationEngine::new(&sim_config).unwrap_or_else(|e| fail("Invalid configuration", e));
    if let Some(label) = args.label {
        engine = engine.with_pool_label(label);
    }
    let result = engine
        .run(sink.as_mut())
        .unwrap_or_else(|e| fail("Simulation failed", e));
    println!("{}", metrics::format_table(&result));

    if let Some(path) = &args.events {
        println!("Events written to {}", path.display());
    }
    if let Some(output_path) = &args.output {
        write_json(output_path, &result);
    }
}

fn apply_overrides(config: &mut SimConfig, args: &RunArgs) {
    if let Some(cycles) = args.cycles {
        config.simulation.cycles = cycles;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(servers) = args.servers {
        config.pool.servers = servers;
    }
    if let Some(cooldown) = args.cooldown {
        config.pool.cooldown = cooldown;
    }
    if let Some(router) = config.router.as_mut() {
        for pool in [&mut router.stream, &mut router.process] {
            if let Some(servers) = args.servers {
                pool.servers = servers;
            }
            if let Some(cooldown) = args.cooldown {
                pool.cooldown = cooldown;
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> SimConfig {
    match path {
        Some(path) => SimConfig::from_file(path).unwrap_or_else(|e| fail("Error loading config", e)),
        None => SimConfig::default(),
    }
}

fn write_items(
    generator: &RequestGenerator,
    count: u64,
    seed: u64,
    path: &Path,
) -> std::io::Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for _ in 0..count {
        let item = generator.generate(&mut rng);
        serde_json::to_writer(&mut writer, &item)?;
        writeln!(writer)?;
    }
    writer.flush()
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail("Error encoding results", e));
    std::fs::write(path, json).unwrap_or_else(|e| fail("Error writing output", e));
    println!("Results written to {}", path.display());
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, err);
    std::process::exit(1);
}
