use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use microbe_sim_core::{SimConfig, StepSummary, World, WorldSnapshot};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "microbe-sim")]
#[command(about = "Microorganism habitat simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Path to config file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Resume from a snapshot file instead of a fresh world
        #[arg(long, conflicts_with = "config")]
        snapshot: Option<PathBuf>,

        /// Number of ticks to simulate
        #[arg(long, default_value_t = 1000)]
        ticks: usize,

        /// Print population stats every N ticks (0 disables)
        #[arg(long, default_value_t = 100)]
        report_interval: usize,

        /// Write the final world snapshot to this file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Write per-tick summaries to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: &PathBuf) -> Result<SimConfig> {
    let file = File::open(path).context("failed to open config file")?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn load_snapshot(path: &PathBuf) -> Result<World> {
    let file = File::open(path).context("failed to open snapshot file")?;
    let snapshot: WorldSnapshot =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse snapshot")?;
    World::from_snapshot(snapshot).context("failed to restore world from snapshot")
}

fn report(summary: &StepSummary, world: &World) {
    let stats = world.population_stats();
    println!(
        "tick {:>6}: pop {:>4} (bacteria {:>3}, viruses {:>3}, immune {:>3}, body {:>3})  +{} -{}",
        summary.tick,
        stats.alive,
        stats.bacteria,
        stats.viruses,
        stats.immune_cells,
        stats.body_cells,
        summary.births,
        summary.deaths,
    );
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run {
            config,
            snapshot,
            ticks,
            report_interval,
            save,
            out,
        } => {
            let mut world = if let Some(path) = snapshot {
                let world = load_snapshot(&path)?;
                println!("Resumed from {:?} at tick {}", path, world.tick());
                world
            } else {
                let sim_config = match config {
                    Some(path) => {
                        let cfg = load_config(&path)?;
                        println!("Loaded config from {path:?}");
                        cfg
                    }
                    None => SimConfig::default(),
                };
                World::new(sim_config).context("failed to initialize world")?
            };

            println!("Simulating {ticks} tick(s)...");
            let mut summaries = Vec::with_capacity(if out.is_some() { ticks } else { 0 });
            for _ in 0..ticks {
                let summary = world.step();
                if report_interval > 0 && summary.tick % report_interval == 0 {
                    report(&summary, &world);
                }
                if out.is_some() {
                    summaries.push(summary);
                }
                if world.population_stats().alive == 0 {
                    println!("Population extinct at tick {}", world.tick());
                    break;
                }
            }

            let stats = world.population_stats();
            println!(
                "Run complete at tick {}: {} alive ({} births, {} deaths)",
                world.tick(),
                stats.alive,
                stats.total_births,
                stats.total_deaths,
            );

            if let Some(path) = out {
                let file = File::create(&path).context("failed to create output file")?;
                serde_json::to_writer_pretty(BufWriter::new(file), &summaries)
                    .context("failed to write summaries")?;
                println!("Per-tick summaries saved to {path:?}");
            }
            if let Some(path) = save {
                let file = File::create(&path).context("failed to create snapshot file")?;
                serde_json::to_writer(BufWriter::new(file), &world.snapshot())
                    .context("failed to write snapshot")?;
                println!("Snapshot saved to {path:?}");
            }
        }
    }
    Ok(())
}
