//! Deterministic tick loop: sample → update → compute.
//!
//! [`CycleRunner`] drives a [`PressureController`] at the configured control
//! period. It keeps the centiseconds elapsed since the cycle started and calls
//! `init_respiratory_cycle` when they reach the cycle length, so the phase
//! machine itself never wraps.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! With the `rt` feature the loop sleeps with `clock_nanosleep(TIMER_ABSTIME)`
//! for drift-free pacing; without it, setup is a no-op and pacing uses
//! `std::thread::sleep`. An overrun is counted and logged, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use vent_common::consts::{Aperture, CentiSec, Pressure};
use vent_common::ventilation::config::ControlLoopConfig;

use crate::actuator::{Actuator, ActuatorError};
use crate::controller::PressureController;

/// Nanoseconds per centisecond.
const NS_PER_CENTISEC: i64 = 10_000_000;

// ─── Pressure Source ────────────────────────────────────────────────

/// Where the loop gets its pressure samples from.
///
/// Receives the apertures the valves actually reached, so a simulated lung
/// can react to them. A hardware sensor simply ignores them.
pub trait PressureSource {
    fn sample(&mut self, blower: Aperture, patient: Aperture) -> Pressure;
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Ticks executed.
    pub tick_count: u64,
    /// Respiratory cycles completed.
    pub cycles_completed: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: i64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: i64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: i64,
    /// Running sum for average computation.
    pub sum_tick_ns: i64,
    /// Ticks that took longer than the control period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            cycles_completed: 0,
            last_tick_ns: 0,
            min_tick_ns: i64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    /// Record one tick duration against `budget_ns`.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        self.min_tick_ns = self.min_tick_ns.min(duration_ns);
        self.max_tick_ns = self.max_tick_ns.max(duration_ns);
        self.sum_tick_ns = self.sum_tick_ns.saturating_add(duration_ns);
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average tick time [ns] (0 if no ticks).
    #[inline]
    pub fn avg_tick_ns(&self) -> i64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_ns / self.tick_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during loop setup.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    /// Valve bring-up failed.
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

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

/// Touch the stack so the loop never page-faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
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

/// Full RT setup. Call once from the loop thread before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Tick driver for one controller and its pressure source.
pub struct CycleRunner<B: Actuator, P: Actuator, S: PressureSource> {
    controller: PressureController<B, P>,
    source: S,
    /// Control period [1/100 s].
    tick_centisec: CentiSec,
    /// Elapsed time in the running cycle [1/100 s].
    elapsed: CentiSec,
    stats_interval_cycles: u64,
    stats: CycleStats,
}

impl<B: Actuator, P: Actuator, S: PressureSource> CycleRunner<B, P, S> {
    /// Bring up the valves and start the first cycle.
    pub fn new(
        mut controller: PressureController<B, P>,
        source: S,
        config: &ControlLoopConfig,
    ) -> Result<Self, CycleError> {
        controller.setup()?;
        controller.init_respiratory_cycle();
        Ok(Self {
            controller,
            source,
            tick_centisec: config.tick_centisec.max(1),
            elapsed: 0,
            stats_interval_cycles: u64::from(config.stats_interval_cycles.max(1)),
            stats: CycleStats::new(),
        })
    }

    /// One control tick. Returns `true` when it was the last tick of a cycle.
    pub fn step(&mut self) -> bool {
        if self.elapsed >= self.controller.centi_sec_per_cycle() {
            self.controller.init_respiratory_cycle();
            self.elapsed = 0;
        }

        let measured = self.source.sample(
            self.controller.blower().current_aperture(),
            self.controller.patient().current_aperture(),
        );
        self.controller.update_pressure(measured);
        self.controller.compute(self.elapsed);
        self.elapsed = self.elapsed.saturating_add(self.tick_centisec);

        let completed = self.elapsed >= self.controller.centi_sec_per_cycle();
        if completed {
            self.stats.cycles_completed += 1;
            if self.stats.cycles_completed % self.stats_interval_cycles == 0 {
                self.log_stats();
            }
        }
        completed
    }

    /// Run `cycles` complete cycles back to back, without pacing.
    pub fn run_cycles(&mut self, cycles: u32) {
        let budget_ns = self.budget_ns();
        let mut done = 0;
        while done < cycles {
            let start = Instant::now();
            if self.step() {
                done += 1;
            }
            self.stats.record(start.elapsed().as_nanos() as i64, budget_ns);
        }
    }

    /// Paced loop until `running` goes false.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        info!(
            tick_centisec = self.tick_centisec,
            centisec_per_cycle = self.controller.centi_sec_per_cycle(),
            "entering control loop"
        );

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running)
        }
    }

    /// RT loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let budget_ns = self.budget_ns();
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

        while running.load(Ordering::Relaxed) {
            next_wake = timespec_add_ns(next_wake, budget_ns);

            let start = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            self.step();
            let end = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

            let duration_ns = timespec_diff_ns(&end, &start);
            self.stats.record(duration_ns, budget_ns);
            if duration_ns > budget_ns {
                warn!(duration_ns, budget_ns, "tick overrun");
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        let budget_ns = self.budget_ns();
        let period = std::time::Duration::from_nanos(budget_ns as u64);

        while running.load(Ordering::Relaxed) {
            let start = Instant::now();
            self.step();
            let elapsed = start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;

            self.stats.record(duration_ns, budget_ns);
            if duration_ns > budget_ns {
                warn!(duration_ns, budget_ns, "tick overrun");
            }

            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    fn log_stats(&self) {
        info!(
            cycles = self.stats.cycles_completed,
            ticks = self.stats.tick_count,
            avg_tick_ns = self.stats.avg_tick_ns(),
            max_tick_ns = self.stats.max_tick_ns,
            overruns = self.stats.overruns,
            peak = self.controller.previous_cycle().peak,
            plateau = self.controller.previous_cycle().plateau,
            peep = self.controller.peep(),
            "cycle stats"
        );
    }

    #[inline]
    fn budget_ns(&self) -> i64 {
        i64::from(self.tick_centisec) * NS_PER_CENTISEC
    }

    #[inline]
    pub const fn controller(&self) -> &PressureController<B, P> {
        &self.controller
    }

    /// Mutable controller access, e.g. for operator adjustments in tests.
    #[inline]
    pub fn controller_mut(&mut self) -> &mut PressureController<B, P> {
        &mut self.controller
    }

    #[inline]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub const fn elapsed(&self) -> CentiSec {
        self.elapsed
    }

    #[inline]
    pub const fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Give back the controller, e.g. for a final snapshot.
    pub fn into_controller(self) -> PressureController<B, P> {
        self.controller
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() + ns;
    TimeSpec::new(
        ts.tv_sec() + total.div_euclid(1_000_000_000),
        total.rem_euclid(1_000_000_000),
    )
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
