//! Active cell network kinetics - demonstration driver
//!
//! Runs one domain's kinetics against an in-memory monomer cloud that
//! jitters each step, writing statistics to CSV and change records through
//! the logger.
//!
//! CLI Usage:
//!   acn-sim                              # Default actin-like network
//!   acn-sim --params run.json            # Run file (seed, cloud, commands)
//!   acn-sim --steps 5000 --xml           # XML change records
//!   acn-sim --checkpoint-every 1000      # Periodic checkpoints
//!   acn-sim --resume exports/checkpoint_....json
//!
//! Change records are logged at debug level: RUST_LOG=debug acn-sim

use std::path::PathBuf;

use active_cell_network::{
    config::RunParameters,
    export::{export_checkpoint, Checkpoint, CsvExporter, LogSink, OutputMode},
    particles::{MonomerPool, SingleDomain},
    KineticsEngine, KineticsError,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser)]
#[command(name = "acn-sim", about = "Run active cell network kinetics on a monomer cloud")]
struct Cli {
    /// Run parameters file (JSON). Defaults are used when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Override the number of steps.
    #[arg(short = 'n', long)]
    steps: Option<u64>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Render change records as XML.
    #[arg(long)]
    xml: bool,

    /// Directory for CSV statistics and checkpoints.
    #[arg(long, default_value = "exports")]
    out_dir: PathBuf,

    /// Disable CSV statistics export.
    #[arg(long)]
    no_csv: bool,

    /// Write a checkpoint every N steps (0 disables).
    #[arg(long, default_value_t = 0)]
    checkpoint_every: u64,

    /// Resume from a checkpoint file.
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = match &cli.params {
        Some(path) => RunParameters::load(path)?,
        None => RunParameters::default(),
    };
    if let Some(steps) = cli.steps {
        params.steps = steps;
    }
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if cli.xml {
        params.output_mode = OutputMode::Xml;
    }

    log::info!("Active cell network kinetics starting (seed {})", params.seed);

    let cloud = &params.cloud;
    let mut pool = MonomerPool::random_cloud(&cloud.monomer, cloud.count, cloud.box_length, params.seed);
    log::info!("Monomer cloud: {} '{}' in a box of {}", pool.len(), cloud.monomer, cloud.box_length);

    let mut sink = LogSink::new(params.output_mode);

    let (mut engine, first_step) = match &cli.resume {
        Some(path) => {
            let (step, engine) = Checkpoint::load(path)
                .with_context(|| format!("restoring checkpoint {:?}", path))?
                .restore();
            log::warn!("Resumed at step {}; monomer positions restart from the seeded cloud", step);
            (engine, step + 1)
        }
        None => {
            let mut engine = KineticsEngine::new(params.seed);
            for command in &params.commands {
                engine
                    .apply(command, &pool, &mut sink)
                    .with_context(|| format!("applying {}", command.name()))?;
            }
            (engine, 0)
        }
    };

    let mut jitter_rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(first_step));
    let mut csv = if cli.no_csv {
        None
    } else {
        Some(CsvExporter::new(&cli.out_dir)?)
    };

    let mut halted = 0;
    for step in first_step..params.steps {
        if cloud.jitter_sigma > 0.0 {
            pool.jitter(&mut jitter_rng, cloud.jitter_sigma);
        }

        match engine.tick(step, &pool, &SingleDomain, &mut sink) {
            Ok(_) => {}
            Err(KineticsError::Invariant { network, violation }) => {
                log::error!("Network '{}' halted at step {}: {}", network, step, violation);
                halted += 1;
            }
            Err(e) => bail!(e),
        }

        if params.sample_period > 0 && step > 0 && step % params.sample_period == 0 {
            let samples = engine.sample(step);
            if let Some(csv) = csv.as_mut() {
                csv.record(&samples)?;
            }
        }

        if cli.checkpoint_every > 0 && step > 0 && step % cli.checkpoint_every == 0 {
            export_checkpoint(&cli.out_dir, step, &engine)?;
        }
    }

    if let Some(csv) = csv {
        let path = csv.finish()?;
        println!("Statistics: {}", path.display());
    }

    println!("=== Active Cell Network Kinetics ===");
    println!("Steps: {}..{}", first_step, params.steps);
    for network in engine.networks() {
        println!(
            "{}: {} polymers, {} bonds, {} forming, halted: {}",
            network.name(),
            network.polymer_count(),
            network.live_bond_count(),
            network.pending().len(),
            network.halted().map_or("no".to_string(), |v| v.to_string())
        );
        for event in network.events() {
            let counts = event.statistics().total();
            println!(
                "  {:<36} successes {:>8}  failures {:>8}",
                event.event_type().name(),
                counts.successes,
                counts.failures
            );
        }
    }
    println!("Random draws: {}", engine.transitions().draws());
    println!("Change records: {}", sink.written);

    if halted > 0 {
        bail!("{} network halt(s) during the run", halted);
    }
    Ok(())
}
