use anyhow::{Context, Result};
use clap::Parser;
use localise::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON parameter file. Missing fields take the reference scenario's values.
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Where to write the snapshot data file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the random source. Drawn from entropy when omitted.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Overrides the number of steps in the parameter file.
    #[arg(long)]
    steps: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut params: FilterParams = match &args.params {
        Some(path) => serde_json::from_reader(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )
        .with_context(|| format!("failed to parse {}", path.display()))?,
        None => FilterParams::default(),
    };
    if let Some(steps) = args.steps {
        params.steps = steps;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, particles = params.particle_count, steps = params.steps, "starting run");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut estimator =
        Estimator::from_params(&params, &mut rng).context("invalid filter parameters")?;
    info!(
        mean_squared_error = estimator.mean_squared_error(),
        "initial particles"
    );

    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(params.steps);
    let result = estimator.run(params.controls(), &mut rng, &mut snapshots);

    // Keep whatever completed, even when a later step failed.
    match &args.output {
        Some(path) => {
            // Each call to write! on the raw file makes a system call.
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_snapshots(BufWriter::new(file), seed, &params, &snapshots)?;
            info!("wrote {} snapshots to {}", snapshots.len(), path.display());
        }
        None => write_snapshots(io::stdout().lock(), seed, &params, &snapshots)?,
    }

    let steps = result.context("filter step failed")?;
    let estimate = estimator.estimated_position();
    info!(
        steps,
        target = %estimator.target().pose(),
        estimate_x = estimate.x,
        estimate_y = estimate.y,
        mean_squared_error = estimator.mean_squared_error(),
        "finished run"
    );

    Ok(())
}

/// Writes one block per snapshot: the target pose, the measured ranges, then
/// one line per particle pose.
fn write_snapshots<W: Write>(
    mut out: W,
    seed: u64,
    params: &FilterParams,
    snapshots: &[Snapshot],
) -> io::Result<()> {
    writeln!(out, "# Particle Filter Snapshots")?;
    writeln!(out, "# seed={seed}")?;
    writeln!(out, "# world_size={}", params.world_size)?;
    for landmark in &params.landmarks {
        writeln!(out, "# landmark {} {}", landmark.x, landmark.y)?;
    }
    writeln!(out)?;

    for snapshot in snapshots {
        let target = snapshot.target().pose();
        writeln!(out, "step {}", snapshot.step())?;
        writeln!(
            out,
            "target {:.6} {:.6} {:.6}",
            target.x(),
            target.y(),
            target.heading()
        )?;

        write!(out, "measurement")?;
        for range in snapshot.measurement().ranges() {
            write!(out, " {range:.6}")?;
        }
        writeln!(out)?;

        for pose in snapshot.particles().poses() {
            writeln!(
                out,
                "particle {:.6} {:.6} {:.6}",
                pose.x(),
                pose.y(),
                pose.heading()
            )?;
        }
        writeln!(out)?;
    }

    out.flush()
}
