//! # Rotator Control Unit
//!
//! Loads the station configuration, restores persisted settings, runs the
//! startup sequence and then drives the control and safety loops until
//! interrupted.
//!
//! Only the simulated dish backend ships with this binary; platform
//! backends implement the `rotator_common::hal` traits and construct a
//! [`Hardware`] of their own.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rotator_common::state::Axis;
use rotator_control_unit::config::RotatorConfig;
use rotator_control_unit::controller::{Hardware, Rotator};
use rotator_control_unit::cycle::TaskRunner;
use rotator_control_unit::safety::stop::fault_summary;
use rotator_control_unit::sim::{ScriptedWeather, SimDish};
use rotator_control_unit::store::{JsonFileStore, shared};

/// Physics step of the simulated dish.
const SIM_STEP: Duration = Duration::from_millis(20);

/// Interval between status lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Rotator Control Unit: two-axis positioner control core
#[derive(Parser, Debug)]
#[command(name = "rotator_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Closed-loop azimuth/elevation rotator control with wind protection")]
struct Args {
    /// Path to the station configuration TOML.
    #[arg(default_value = "config/rotator.toml")]
    config: PathBuf,

    /// Run against the built-in simulated dish.
    #[arg(long)]
    simulate: bool,

    /// Override the control thread CPU core.
    #[arg(long)]
    cpu_core: Option<usize>,

    /// Override the control thread SCHED_FIFO priority.
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Stop after this many seconds (runs until Ctrl-C when omitted).
    #[arg(long)]
    duration_s: Option<u64>,

    /// Initial azimuth setpoint [deg] applied after startup.
    #[arg(long)]
    azimuth: Option<f32>,

    /// Initial elevation setpoint [deg] applied after startup.
    #[arg(long)]
    elevation: Option<f32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Rotator Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Rotator Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RotatorConfig::load_validated(&args.config)?;
    if let Some(core) = args.cpu_core {
        config.cycle.cpu_core = core;
    }
    if let Some(priority) = args.rt_priority {
        config.cycle.rt_priority = priority;
    }
    info!(
        "Config OK: service={}, control={}ms, safety={}ms",
        config.shared.service_name, config.cycle.control_period_ms, config.cycle.safety_period_ms
    );

    if !args.simulate {
        return Err("no hardware backend is built in; run with --simulate".into());
    }

    let store = shared(JsonFileStore::open(config.store_path.clone())?);
    let dish = SimDish::default();
    let weather = Arc::new(ScriptedWeather::new());
    let rotator = Rotator::initialize(
        &config,
        Hardware::simulated(&dish),
        store,
        weather,
        Instant::now(),
    );
    let handle = rotator.handle.clone();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    // ── Simulated physics ──
    let physics = {
        let dish = dish.clone();
        let running = running.clone();
        thread::Builder::new()
            .name("rotator-sim".to_string())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    dish.advance(SIM_STEP);
                    thread::sleep(SIM_STEP);
                }
            })?
    };

    let runner = TaskRunner::spawn(rotator.control, rotator.safety, &config.cycle, running.clone())?;

    if let Some(az) = args.azimuth {
        handle.set_setpoint_az(az)?;
    }
    if let Some(el) = args.elevation {
        handle.set_setpoint_el(el)?;
    }

    let started = Instant::now();
    let deadline = args.duration_s.map(|s| started + Duration::from_secs(s));
    let mut next_status = started;
    while runner.is_running() {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            info!("run duration elapsed");
            break;
        }
        if now >= next_status {
            info!(
                "AZ {:.2} -> {:.2} deg, EL {:.2} -> {:.2} deg, wind count {}, faults [{}]",
                handle.corrected_angle(Axis::Azimuth),
                handle.setpoint_az(),
                handle.corrected_angle(Axis::Elevation),
                handle.setpoint_el(),
                handle.wind_count(),
                fault_summary(handle.faults())
            );
            next_status = now + STATUS_INTERVAL;
        }
        thread::sleep(Duration::from_millis(100));
    }

    let (control, safety) = runner.stop()?;
    running.store(false, Ordering::Release);
    join_sim(physics);
    info!(
        "control: {} cycles, avg {}us, {} overruns; safety: {} cycles, {} overruns",
        control.cycle_count,
        control.avg_cycle_ns() / 1_000,
        control.overruns,
        safety.cycle_count,
        safety.overruns
    );
    Ok(())
}

/// Join the physics thread. Returns `false` if it panicked.
fn join_sim(physics: thread::JoinHandle<()>) -> bool {
    match physics.join() {
        Ok(()) => true,
        Err(_) => {
            error!("rotator-sim thread panicked");
            false
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

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
