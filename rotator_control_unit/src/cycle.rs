//! Periodic task execution.
//!
//! The control and safety loops each run on their own thread with
//! drift-free pacing: the next wake time advances by one period from the
//! previous target, not from the moment the body finished.
//!
//! ## RT Setup
//! With the `rt` feature the control thread locks memory, prefaults its
//! stack, pins itself to a core and switches to `SCHED_FIFO`. Without it
//! these steps are no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::CycleConfig;
use crate::controller::ControlLoop;
use crate::safety::supervisor::SafetyLoop;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last body duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    pub sum_sq_cycle_ns: i128,
    /// Cycles whose body ran past the period.
    pub overruns: u64,
    /// Worst wake-up lateness [ns].
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            sum_sq_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.sum_sq_cycle_ns += (duration_ns as i128) * (duration_ns as i128);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average body duration [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("failed to spawn {task} thread: {reason}")]
    Spawn { task: &'static str, reason: String },

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 1 MB of stack so the loop never page-faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 1024 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Lock memory, prefault the stack, pin to `cpu_core` and switch to
/// `SCHED_FIFO` at `rt_priority`. Applies to the calling thread.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Tasks ──────────────────────────────────────────────────────────

/// A body executed once per period.
pub trait PeriodicTask: Send + 'static {
    const NAME: &'static str;

    fn run_cycle(&mut self, now: Instant);
}

impl PeriodicTask for ControlLoop {
    const NAME: &'static str = "control";

    fn run_cycle(&mut self, now: Instant) {
        self.tick(now);
    }
}

impl PeriodicTask for SafetyLoop {
    const NAME: &'static str = "safety";

    fn run_cycle(&mut self, now: Instant) {
        self.tick(now);
    }
}

/// Run `task` every `period` until `running` clears.
///
/// An overrun is counted and logged; the schedule then restarts from the
/// current time instead of bursting to catch up.
pub fn run_periodic<T: PeriodicTask>(
    task: &mut T,
    period: Duration,
    running: &AtomicBool,
) -> CycleStats {
    let mut stats = CycleStats::new();
    let period_ns = period.as_nanos() as i64;
    let mut next_wake = Instant::now();

    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        let latency_ns = start.saturating_duration_since(next_wake).as_nanos() as i64;

        task.run_cycle(start);

        let duration_ns = start.elapsed().as_nanos() as i64;
        stats.record(duration_ns, latency_ns);
        if duration_ns > period_ns {
            stats.overruns += 1;
            warn!(
                "{} cycle overrun: {duration_ns}ns > {period_ns}ns budget",
                T::NAME
            );
        }

        next_wake += period;
        let now = Instant::now();
        if next_wake <= now {
            next_wake = now;
        } else {
            thread::sleep(next_wake - now);
        }
    }
    stats
}

// ─── Task Runner ────────────────────────────────────────────────────

/// Owns the control and safety threads.
pub struct TaskRunner {
    running: Arc<AtomicBool>,
    control: JoinHandle<CycleStats>,
    safety: JoinHandle<CycleStats>,
}

impl TaskRunner {
    /// Spawn both loops. The control thread performs RT setup first; a
    /// failed setup is logged and the thread continues without it.
    pub fn spawn(
        mut control: ControlLoop,
        mut safety: SafetyLoop,
        cycle: &CycleConfig,
        running: Arc<AtomicBool>,
    ) -> Result<Self, CycleError> {
        let control_period = Duration::from_millis(cycle.control_period_ms);
        let safety_period = Duration::from_millis(cycle.safety_period_ms);
        let (cpu_core, rt_priority) = (cycle.cpu_core, cycle.rt_priority);

        let flag = running.clone();
        let control = thread::Builder::new()
            .name("rotator-control".to_string())
            .spawn(move || {
                match rt_setup(cpu_core, rt_priority) {
                    Ok(()) => debug!("RT setup complete (cpu_core={cpu_core}, priority={rt_priority})"),
                    Err(e) => error!("{e}; control loop continues without RT"),
                }
                run_periodic(&mut control, control_period, &flag)
            })
            .map_err(|e| CycleError::Spawn {
                task: ControlLoop::NAME,
                reason: e.to_string(),
            })?;

        let flag = running.clone();
        let safety = thread::Builder::new()
            .name("rotator-safety".to_string())
            .spawn(move || run_periodic(&mut safety, safety_period, &flag))
            .map_err(|e| CycleError::Spawn {
                task: SafetyLoop::NAME,
                reason: e.to_string(),
            })?;

        info!(
            "tasks started: control every {}ms, safety every {}ms",
            cycle.control_period_ms, cycle.safety_period_ms
        );
        Ok(Self {
            running,
            control,
            safety,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the run flag and wait for both loops.
    pub fn stop(self) -> Result<(CycleStats, CycleStats), CycleError> {
        self.running.store(false, Ordering::Release);
        let control = self
            .control
            .join()
            .map_err(|_| CycleError::Panicked(ControlLoop::NAME))?;
        let safety = self
            .safety
            .join()
            .map_err(|_| CycleError::Panicked(SafetyLoop::NAME))?;
        Ok((control, safety))
    }
}
