//! Step-timing counters: a small always-compiled struct of resumable/pausable
//! timers, one per pipeline stage, so a caller can profile a step without
//! reaching for an external profiler.

use instant::Instant;

/// A single resumable stopwatch. Call [`Timer::resume`] at the start of a
/// stage and [`Timer::pause`] at its end; `nanos` accumulates across as many
/// resume/pause pairs as the caller likes until the next [`Counters::reset`].
#[derive(Copy, Clone, Debug)]
pub struct Timer {
    nanos: u64,
    started_at: Option<Instant>,
}

impl Default for Timer {
    fn default() -> Self {
        Timer {
            nanos: 0,
            started_at: None,
        }
    }
}

impl Timer {
    /// Starts (or resumes) the timer. A second `resume` before a matching
    /// `pause` is a no-op.
    pub fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stops the timer, folding the elapsed time into the running total.
    pub fn pause(&mut self) {
        if let Some(start) = self.started_at.take() {
            self.nanos += start.elapsed().as_nanos() as u64;
        }
    }

    /// Total accumulated time in seconds since the last [`Counters::reset`].
    pub fn time(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    fn reset(&mut self) {
        self.nanos = 0;
        self.started_at = None;
    }
}

/// Per-stage timers for one call to [`crate::world::World::step`].
#[derive(Default, Copy, Clone, Debug)]
pub struct StageTimers {
    /// Broad-phase AABB update and candidate-pair detection.
    pub broad_phase_time: Timer,
    /// Narrow-phase manifold construction and event dispatch.
    pub narrow_phase_time: Timer,
    /// Island assembly (the constraint-graph flood fill).
    pub island_construction_time: Timer,
    /// The sequential-impulse solver, across every island.
    pub solver_time: Timer,
    /// Continuous collision detection (time-of-impact search and clamping).
    pub ccd_time: Timer,
}

/// Benchmarking-only counters, enabled unconditionally: the timers themselves
/// cost a clock read per resume/pause, cheap enough not to gate behind a
/// feature flag.
#[derive(Default, Copy, Clone, Debug)]
pub struct Counters {
    /// Total wall-clock time spent in the most recent `step`.
    pub step_time: Timer,
    /// Per-stage breakdown of the most recent `step`.
    pub stages: StageTimers,
}

impl Counters {
    /// A fresh set of counters, all at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every timer, called at the start of each `step`.
    pub fn reset(&mut self) {
        self.step_time.reset();
        self.stages.broad_phase_time.reset();
        self.stages.narrow_phase_time.reset();
        self.stages.island_construction_time.reset();
        self.stages.solver_time.reset();
        self.stages.ccd_time.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn resume_pause_accumulates_elapsed_time() {
        let mut timer = Timer::default();
        timer.resume();
        sleep(Duration::from_millis(5));
        timer.pause();
        assert!(timer.time() > 0.0);
    }

    #[test]
    fn second_resume_before_pause_is_a_no_op() {
        let mut timer = Timer::default();
        timer.resume();
        let first_start = timer.started_at;
        timer.resume();
        assert_eq!(timer.started_at, first_start);
    }

    #[test]
    fn reset_zeroes_every_stage() {
        let mut counters = Counters::new();
        counters.stages.solver_time.resume();
        sleep(Duration::from_millis(1));
        counters.stages.solver_time.pause();
        assert!(counters.stages.solver_time.time() > 0.0);
        counters.reset();
        assert_eq!(counters.stages.solver_time.time(), 0.0);
    }
}
