//! Windowed proactive RFM placement.
//!
//! Windows recur with period `window_start`. Window k spans
//! `[k * window_start, k * window_start + (window_end - window_start))`
//! and receives exactly one RFM at a uniformly drawn offset.
//!
//! An RFM that came due during a long event is still issued late, but
//! never after its window closes. The window end is inclusive. A window
//! that closes without its RFM is skipped.

use crate::{
    config::SimulationConfig,
    rng::SimRng,
    types::SimTime,
};

#[derive(Debug, Clone)]
pub struct WindowedRfmGenerator {
    period:  SimTime,
    span:    SimTime,
    enabled: bool,
    /// First window not yet consumed.
    window:  u64,
    /// Cached due time for `window`, drawn lazily.
    due:     Option<SimTime>,
    skipped: u64,
}

impl WindowedRfmGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        let enabled = config.windowing_enabled();
        Self {
            period:  config.window_start,
            span:    if enabled { config.window_end - config.window_start } else { 0 },
            enabled,
            window:  0,
            due:     None,
            skipped: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Start of window `k`.
    pub fn window_start(&self, k: u64) -> SimTime {
        k.saturating_mul(self.period)
    }

    /// Last instant at which window `k` may still issue its RFM.
    pub fn window_end(&self, k: u64) -> SimTime {
        self.window_start(k).saturating_add(self.span)
    }

    /// Due time of the first unconsumed window still open at `after`.
    /// `None` when proactive RFM is disabled.
    pub fn next_due_time<R: SimRng>(&mut self, after: SimTime, rng: &mut R) -> Option<SimTime> {
        if !self.enabled {
            return None;
        }

        // Windows of earlier periods are closed; so is this period's once
        // `after` is past its end.
        let period = after / self.period;
        let first_open = if after > self.window_end(period) { period + 1 } else { period };
        if self.window < first_open {
            let missed = first_open - self.window;
            log::debug!(
                "t={after}ps rfm: skipping {missed} closed window(s) starting at window {}",
                self.window
            );
            self.skipped += missed;
            self.window = first_open;
            self.due = None;
        }

        if self.due.is_none() {
            let offset = if self.span == 0 { 0 } else { rng.next_below(self.span) };
            self.due = Some(self.window_start(self.window) + offset);
        }
        self.due
    }

    /// Mark the current window's RFM as issued and move to the next window.
    pub fn consume(&mut self) {
        self.window += 1;
        self.due = None;
    }

    /// Windows passed over without their RFM being issued.
    pub fn skipped_windows(&self) -> u64 {
        self.skipped
    }
}
