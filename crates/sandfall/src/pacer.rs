//! # Tick Pacer
//!
//! Fixed-timestep pacing for running the simulation in real time.
//!
//! ```text
//!   loop {
//!       while pacer.should_tick() {      // catch up on missed ticks
//!           let start = pacer.begin_tick();
//!           engine.step();
//!           pacer.end_tick(start);
//!       }
//!       pacer.wait_for_next_tick();
//!   }
//! ```

use std::time::{Duration, Instant};

/// Largest backlog the pacer will try to catch up on.
const MAX_BACKLOG_TICKS: u32 = 8;

/// Fixed-timestep tick controller.
#[derive(Debug)]
pub struct TickPacer {
    /// Target tick duration.
    tick_duration: Duration,
    /// Time of the last accumulator update.
    last_update: Instant,
    /// Time owed to the simulation.
    accumulator: Duration,
    /// Ticks started.
    tick_count: u64,
    /// Ticks that ran over budget.
    late_ticks: u64,
    /// Backlog dropped because the simulation could not keep up.
    skipped_ticks: u64,
}

impl TickPacer {
    /// Creates a pacer for `tickrate` ticks per second (at least 1).
    #[must_use]
    pub fn new(tickrate: u32) -> Self {
        Self {
            tick_duration: Self::duration_for(tickrate),
            last_update: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            late_ticks: 0,
            skipped_ticks: 0,
        }
    }

    fn duration_for(tickrate: u32) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(tickrate.max(1)))
    }

    /// Changes the rate without resetting counters.
    pub fn set_tickrate(&mut self, tickrate: u32) {
        self.tick_duration = Self::duration_for(tickrate);
    }

    /// Returns true if a tick is due.
    ///
    /// Call this in a loop until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_update);
        self.last_update = now;

        let backlog = self.tick_duration * MAX_BACKLOG_TICKS;
        if self.accumulator > backlog {
            let dropped = (self.accumulator - backlog).as_micros()
                / self.tick_duration.as_micros().max(1);
            let dropped = u64::try_from(dropped).unwrap_or(u64::MAX);
            self.skipped_ticks = self.skipped_ticks.saturating_add(dropped);
            self.accumulator = backlog;
            tracing::warn!(dropped, "Simulation is behind, dropping ticks");
        }

        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick started at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        if start.elapsed() > self.tick_duration {
            self.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let elapsed = self.last_update.elapsed() + self.accumulator;
        if let Some(remaining) = self.tick_duration.checked_sub(elapsed) {
            std::thread::sleep(remaining);
        }
    }

    /// Ticks started.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that ran over budget.
    #[must_use]
    pub const fn late_ticks(&self) -> u64 {
        self.late_ticks
    }

    /// Ticks dropped from the backlog.
    #[must_use]
    pub const fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
