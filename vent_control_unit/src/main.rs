//! # Ventilator Control Unit
//!
//! Runs the pressure controller against a simulated lung and simulated valves.
//!
//! Loads the TOML configuration (or factory defaults), performs RT setup,
//! then either runs a fixed number of cycles as fast as possible
//! (`--cycles`) or paces the loop in real time until Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vent_control_unit::actuator::SimulatedActuator;
use vent_control_unit::config::{LoadedConfig, load_config};
use vent_control_unit::controller::PressureController;
use vent_control_unit::cycle::{CycleRunner, rt_setup};
use vent_control_unit::sim::LungSimulator;

/// Ventilator pressure control loop
#[derive(Parser, Debug)]
#[command(name = "vent_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Deterministic pressure control loop for a ventilator")]
struct Args {
    /// Path to the configuration TOML. Factory defaults when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run this many cycles unpaced, then exit.
    #[arg(long)]
    cycles: Option<u32>,

    /// CPU core to pin the RT thread to (overrides config).
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority (overrides config).
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Print the final controller state as JSON on exit.
    #[arg(long)]
    summary: bool,
}

fn main() {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => load_config(path),
        None => Ok(LoadedConfig::defaults()),
    };
    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            // Tracing is not up yet: its level comes from the config.
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };

    setup_tracing(&args, &loaded);
    info!(
        "Ventilator Control Unit v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        loaded.ventilator.shared.service_name
    );

    if let Err(e) = run(&args, loaded) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Ventilator Control Unit shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config = loaded.ventilator;
    match &loaded.source {
        Some(path) => info!("Config OK: {}", path.display()),
        None => info!("Config OK: factory defaults"),
    }

    let controller =
        PressureController::new(&config, SimulatedActuator::new(), SimulatedActuator::new())?;
    let mut runner = CycleRunner::new(controller, LungSimulator::default(), &config.control_loop)?;

    if let Some(cycles) = args.cycles {
        info!("running {cycles} cycles unpaced");
        runner.run_cycles(cycles);
    } else {
        let cpu_core = args.cpu_core.unwrap_or(config.control_loop.cpu_core);
        let rt_priority = args.rt_priority.unwrap_or(config.control_loop.rt_priority);
        rt_setup(cpu_core, rt_priority)?;
        info!("RT setup complete (cpu_core={cpu_core}, priority={rt_priority})");

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            r.store(false, Ordering::SeqCst);
        })?;

        runner.run(&running)?;
    }

    let stats = runner.stats();
    info!(
        cycles = stats.cycles_completed,
        ticks = stats.tick_count,
        avg_tick_ns = stats.avg_tick_ns(),
        max_tick_ns = stats.max_tick_ns,
        overruns = stats.overruns,
        "loop stopped"
    );

    if args.summary {
        let snapshot = runner.controller().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

/// Setup tracing subscriber from CLI arguments and `[shared] log_level`.
fn setup_tracing(args: &Args, loaded: &LoadedConfig) {
    let level = if args.verbose {
        "debug"
    } else {
        loaded.ventilator.shared.log_level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
