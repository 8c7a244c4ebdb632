//! Interactive simulation binary.
//!
//! Examples:
//!   spikenet                                  (prompts for both counts)
//!   spikenet --input-count 10 --block-count 3
//!   spikenet --input-count 10 --block-count 3 --seed 42 --summary
//!   spikenet --input-count 10 --block-count 5 --executor gpu
//!
//! The run is unbounded; stop it with Ctrl-C.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use spikenet::driver::SimulationDriver;
use spikenet::executor::{CpuExecutor, StepExecutor};
use spikenet::prng::Prng;
use spikenet::topology::{validate_block_count, validate_input_count, Network};

#[derive(Debug, Parser)]
#[command(name = "spikenet", about = "Block-structured spiking-network simulator")]
struct Args {
    /// Input-layer neuron count (>= 1). Prompted for when omitted.
    #[arg(long)]
    input_count: Option<usize>,

    /// Hidden block count (>= 3). Prompted for when omitted.
    #[arg(long)]
    block_count: Option<usize>,

    /// Seed for topology and stimulus draws. Wall clock when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Update-kernel backend.
    #[arg(long, value_enum, default_value = "cpu")]
    executor: Backend,

    /// Stop after this many steps instead of running until Ctrl-C.
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the generated topology as JSON and exit without simulating.
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Cpu,
    #[cfg(feature = "parallel")]
    Parallel,
    #[cfg(feature = "gpu")]
    Gpu,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input_count = match args.input_count {
        Some(n) => validate_input_count(n)?,
        None => prompt_count("Give input layer size: ", validate_input_count)?,
    };
    let block_count = match args.block_count {
        Some(n) => validate_block_count(n)?,
        None => prompt_count(
            "Give count of hidden blocks (at least 3): ",
            validate_block_count,
        )?,
    };

    let mut rng = match args.seed {
        Some(seed) => Prng::new(seed),
        None => Prng::from_entropy(),
    };

    let net = Network::generate(input_count, block_count, &mut rng)
        .context("topology generation failed")?;
    info!(
        "generated network: {} neurons, {} inputs, {} blocks",
        net.size(),
        net.input_count(),
        net.block_count()
    );

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&net.summary())?);
        return Ok(());
    }

    let executor = build_executor(args.executor, &net)?;
    info!("executor backend: {}", executor.name());

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut driver = SimulationDriver::new(net, executor, rng, cancel.clone());

    let max_steps = args.max_steps;
    let mut out = io::stdout();
    driver.run(|steps, stats| {
        // Overwrite the status line in place each step.
        let _ = write!(
            out,
            "\rActivated groups {}, activated neurons {:.6} %",
            stats.groups_activated, stats.neurons_activated_pct
        );
        let _ = out.flush();

        if let Some(max) = max_steps {
            if steps >= max {
                cancel.store(true, Ordering::Relaxed);
            }
        }
    })?;

    println!("\nBye.");
    Ok(())
}

fn build_executor(backend: Backend, net: &Network) -> Result<Box<dyn StepExecutor>> {
    let executor: Box<dyn StepExecutor> = match backend {
        Backend::Cpu => Box::new(CpuExecutor),
        #[cfg(feature = "parallel")]
        Backend::Parallel => Box::new(spikenet::executor::ParallelExecutor),
        #[cfg(feature = "gpu")]
        Backend::Gpu => Box::new(spikenet::gpu::GpuExecutor::new(net)?),
    };
    #[cfg(not(feature = "gpu"))]
    let _ = net;
    Ok(executor)
}

/// Re-prompt until a well-formed value passes the bounds check. Invalid
/// entries are never fatal.
fn prompt_count(
    prompt: &str,
    validate: fn(usize) -> Result<usize, spikenet::Error>,
) -> Result<usize> {
    let stdin = io::stdin();
    loop {
        println!("{prompt}");
        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            bail!("stdin closed before a valid value was entered");
        }
        if let Ok(n) = line.trim().parse::<usize>() {
            if validate(n).is_ok() {
                return Ok(n);
            }
        }
    }
}
