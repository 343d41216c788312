//! The simulation engine: a single-threaded event loop over one
//! virtual clock.
//!
//! STEP ORDER (fixed, documented, never reordered):
//!   1. A ready ALERT stall (breach seen, isoc worked off). Global and
//!      atomic: nothing else is issued until it completes.
//!   2. A due proactive RFM from the window generator.
//!   3. The next round-robin ACTIVATE, if a full tRC still fits.
//!
//! The run ends when none of the above can be issued. Whatever budget
//! is left at that point is idle time.
//!
//! RULES:
//!   - All mutable run state lives in the engine value. Independent runs
//!     never share anything and may execute on separate threads.
//!   - All randomness flows through the injected SimRng streams.
//!   - An ALERT's RFMs are serviced when its stall ends, before the
//!     triggering row enters backoff. One reset draw per RFM.

use crate::{
    alert::AlertController,
    clock::TimeBudget,
    config::{ProactiveTarget, ReactiveTarget, SimulationConfig},
    error::SimResult,
    event::{EventLogEntry, LoggedEvent, RfmKind, ScheduledEvent},
    metrics::{MetricsAggregator, SimulationResult},
    rng::{RngBank, SimRng, StreamRng, StreamSlot},
    row::RowBank,
    types::{RowId, SimTime},
    window::WindowedRfmGenerator,
};

pub struct SimEngine<R: SimRng = StreamRng> {
    pub config:  SimulationConfig,
    pub budget:  TimeBudget,
    rows:        RowBank,
    alerts:      AlertController,
    windows:     WindowedRfmGenerator,
    metrics:     MetricsAggregator,
    window_rng:  R,
    reset_rng:   R,
    /// Round-robin pointer shared by ACTIVATEs and round-robin RFMs.
    cursor:      RowId,
    event_log:   Option<Vec<EventLogEntry>>,
    finished:    bool,
}

impl SimEngine<StreamRng> {
    /// Engine with its RNG streams derived from `seed`.
    pub fn new(config: SimulationConfig, seed: u64) -> SimResult<Self> {
        let bank = RngBank::new(seed);
        Self::with_rngs(
            config,
            seed,
            bank.for_slot(StreamSlot::WindowPlacement),
            bank.for_slot(StreamSlot::CounterReset),
        )
    }
}

impl<R: SimRng> SimEngine<R> {
    /// Engine with caller-supplied random sources. `seed` is only echoed
    /// into the result.
    pub fn with_rngs(config: SimulationConfig, seed: u64, window_rng: R, reset_rng: R) -> SimResult<Self> {
        config.validate()?;
        log::info!(
            "run start: rows={} trc={}ps threshold={} alert={}ps isoc={} abo_delay={} windows={} seed={seed}",
            config.row_count,
            config.activation_duration,
            config.threshold,
            config.alert_duration(),
            config.isoc_count,
            config.abo_delay_count,
            config.windowing_enabled(),
        );
        Ok(Self {
            budget:    TimeBudget::new(config.runtime_budget),
            rows:      RowBank::new(config.row_count),
            alerts:    AlertController::new(&config),
            windows:   WindowedRfmGenerator::new(&config),
            metrics:   MetricsAggregator::new(&config, seed),
            window_rng,
            reset_rng,
            cursor:    0,
            event_log: None,
            finished:  false,
            config,
        })
    }

    /// Record every applied event. Used by replay tooling and the
    /// determinism tests.
    pub fn with_event_log(mut self) -> Self {
        self.event_log = Some(Vec::new());
        self
    }

    pub fn rows(&self) -> &RowBank {
        &self.rows
    }

    pub fn now(&self) -> SimTime {
        self.budget.now
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decide what happens next without applying it.
    pub fn next_event(&mut self) -> Option<ScheduledEvent> {
        if self.finished || self.budget.exhausted || self.budget.remaining() == 0 {
            return None;
        }
        let now = self.budget.now;

        if let Some(row) = self.alerts.ready_stall(&self.rows) {
            return Some(ScheduledEvent::AlertStall {
                row,
                duration: self.alerts.stall_duration(),
            });
        }

        if let Some(due_time) = self.windows.next_due_time(now, &mut self.window_rng) {
            if due_time <= now {
                return Some(ScheduledEvent::ProactiveRfm { due_time });
            }
        }

        if self.budget.fits(self.config.activation_duration) {
            return Some(ScheduledEvent::Activate { row: self.cursor });
        }
        None
    }

    /// Issue one event. Returns false once the run is over.
    pub fn step(&mut self) -> SimResult<bool> {
        if self.finished {
            return Ok(false);
        }
        match self.next_event() {
            Some(event) => {
                self.apply(event)?;
                Ok(true)
            }
            None => {
                self.close()?;
                Ok(false)
            }
        }
    }

    pub fn run_to_completion(&mut self) -> SimResult<()> {
        while self.step()? {}
        Ok(())
    }

    /// Hand over the event log recorded so far.
    pub fn take_event_log(&mut self) -> Vec<EventLogEntry> {
        self.event_log.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Produce the result record. Closes the run first if needed; any
    /// unissued budget counts as idle.
    pub fn finish(mut self) -> SimResult<SimulationResult> {
        if !self.finished {
            self.close()?;
        }
        Ok(self.metrics.finalize(&self.budget, &self.rows))
    }

    fn apply(&mut self, event: ScheduledEvent) -> SimResult<()> {
        match event {
            ScheduledEvent::Activate { row } => {
                self.budget.advance(self.config.activation_duration);
                let now = self.budget.now;
                let counter = self.rows.activate(row).counter_value;
                self.alerts.on_activate(&mut self.rows, row);
                self.metrics.on_activate(row, now);
                self.cursor = (row + 1) % self.rows.len();
                log::trace!("t={now}ps activate row {row} counter={counter}");
                self.record(now, LoggedEvent::Activate { row, counter })
            }

            ScheduledEvent::AlertStall { row, duration } => {
                let start = self.budget.now;
                let consecutive = self.alerts.begin_stall(&mut self.rows, row, start);
                let consumed = self.budget.advance(duration).consumed(duration);
                let end = self.budget.now;
                let run = self.alerts.current_run;
                self.metrics.on_alert_stall(row, start, consumed, run);

                log::debug!(
                    "t={start}ps ALERT row {row}: stall {consumed}ps consecutive={consecutive} run={run}"
                );
                self.record(start, LoggedEvent::AlertStall { row, start, duration: consumed, consecutive, run })?;

                let targets = self.reactive_targets(row);
                for &target in &targets {
                    let reset_to = self.draw_reset();
                    self.rows.service(target, reset_to);
                    self.metrics.on_rfm(target, RfmKind::Reactive, end, 0);
                    self.record(end, LoggedEvent::Rfm {
                        row: target,
                        kind: RfmKind::Reactive,
                        reset_to,
                        duration: 0,
                        due_time: None,
                    })?;
                }
                self.alerts.complete_stall(&mut self.rows, row, end);
                self.alerts.release_serviced(&mut self.rows, &targets);
                Ok(())
            }

            ScheduledEvent::ProactiveRfm { due_time } => {
                self.windows.consume();
                let Some(row) = self.proactive_target() else {
                    log::debug!("t={}ps proactive rfm due at {due_time}ps: all counters zero", self.budget.now);
                    return self.record(self.budget.now, LoggedEvent::RfmSkipped { due_time });
                };

                let reset_to = self.draw_reset();
                self.rows.service(row, reset_to);
                let service = self.config.rfm_service_duration;
                let consumed = self.budget.advance(service).consumed(service);
                let end = self.budget.now;
                self.metrics.on_rfm(row, RfmKind::Proactive, end, consumed);
                log::debug!("t={end}ps proactive rfm row {row} (due {due_time}ps) reset_to={reset_to}");
                self.record(end, LoggedEvent::Rfm {
                    row,
                    kind: RfmKind::Proactive,
                    reset_to,
                    duration: consumed,
                    due_time: Some(due_time),
                })
            }
        }
    }

    fn proactive_target(&mut self) -> Option<RowId> {
        match self.config.proactive_target {
            ProactiveTarget::RoundRobin => {
                let row = self.cursor;
                self.cursor = (row + 1) % self.rows.len();
                Some(row)
            }
            ProactiveTarget::HighestCounter => self
                .rows
                .hottest()
                .filter(|r| r.counter_value > 0)
                .map(|r| r.id),
        }
    }

    /// Rows serviced by the RFMs of `row`'s ALERT, in issue order.
    fn reactive_targets(&self, row: RowId) -> Vec<RowId> {
        match self.config.reactive_target {
            ReactiveTarget::TriggeringRow => vec![row],
            ReactiveTarget::HighestCounters => self
                .rows
                .ranked_by_counter()
                .into_iter()
                .cycle()
                .take(self.config.rfm_abo_multiplier as usize)
                .collect(),
        }
    }

    fn draw_reset(&mut self) -> u64 {
        match self.config.rand_reset_range {
            0 => 0,
            range => self.reset_rng.next_below(range.saturating_add(1)),
        }
    }

    fn close(&mut self) -> SimResult<()> {
        let idle = self.budget.idle_out();
        self.metrics.on_windows_skipped(self.windows.skipped_windows());
        self.finished = true;

        let g = self.metrics.global();
        log::info!(
            "run finished: activations={} alerts={} rfms={} (abo={} proactive={}) longest_consecutive={} idle={idle}ps",
            g.total_activations,
            g.total_alerts,
            g.total_rfms,
            g.abo_rfm_count,
            g.proactive_rfm_count,
            g.longest_consecutive_alert_run,
        );
        self.record(self.budget.now, LoggedEvent::RunFinished { idle })
    }

    fn record(&mut self, at: SimTime, event: LoggedEvent) -> SimResult<()> {
        let Some(entries) = self.event_log.as_mut() else {
            return Ok(());
        };
        let entry = EventLogEntry {
            seq:        entries.len() as u64,
            at,
            event_type: event_type_name(&event).to_string(),
            payload:    serde_json::to_string(&event)?,
        };
        entries.push(entry);
        Ok(())
    }
}

/// Run one complete simulation. Validation failures return before any
/// event is issued.
pub fn simulate(config: &SimulationConfig, seed: u64) -> SimResult<SimulationResult> {
    let mut engine = SimEngine::new(config.clone(), seed)?;
    engine.run_to_completion()?;
    engine.finish()
}

/// Like `simulate`, also returning the full event log.
pub fn simulate_with_log(
    config: &SimulationConfig,
    seed: u64,
) -> SimResult<(SimulationResult, Vec<EventLogEntry>)> {
    let mut engine = SimEngine::new(config.clone(), seed)?.with_event_log();
    engine.run_to_completion()?;
    let entries = engine.take_event_log();
    Ok((engine.finish()?, entries))
}

/// Extract a stable string name from a LoggedEvent variant.
/// Used for the event_type column of the log.
fn event_type_name(event: &LoggedEvent) -> &'static str {
    match event {
        LoggedEvent::Activate { .. }    => "activate",
        LoggedEvent::AlertStall { .. }  => "alert_stall",
        LoggedEvent::Rfm { .. }         => "rfm",
        LoggedEvent::RfmSkipped { .. }  => "rfm_skipped",
        LoggedEvent::RunFinished { .. } => "run_finished",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ns;

    /// Always draws the same value, clamped into range.
    struct Constant(u64);

    impl SimRng for Constant {
        fn next_below(&mut self, bound: u64) -> u64 {
            self.0.min(bound - 1)
        }
    }

    fn single_row() -> SimulationConfig {
        SimulationConfig {
            row_count: 1,
            activation_duration: ns(45),
            threshold: 1,
            rfm_abo_multiplier: 1,
            rfm_service_duration: ns(400),
            runtime_budget: ns(1000),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn first_events_follow_step_order() {
        let mut engine = SimEngine::new(single_row(), 0).unwrap();
        let mut seen = Vec::new();
        while let Some(event) = engine.next_event() {
            seen.push(event);
            engine.apply(event).unwrap();
            if seen.len() == 4 {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                ScheduledEvent::Activate { row: 0 },
                ScheduledEvent::Activate { row: 0 },
                ScheduledEvent::AlertStall { row: 0, duration: ns(400) },
                ScheduledEvent::Activate { row: 0 },
            ]
        );
        assert_eq!(engine.now(), ns(535));
    }

    #[test]
    fn injected_reset_source_sets_counter_after_stall() {
        let config = SimulationConfig { rand_reset_range: 3, ..single_row() };
        let mut engine = SimEngine::with_rngs(config, 0, Constant(0), Constant(3)).unwrap();
        for _ in 0..3 {
            engine.step().unwrap();
        }
        // Two activations and one stall: counter reset to the drawn 3.
        assert_eq!(engine.rows().get(0).counter_value, 3);
        assert_eq!(engine.now(), ns(490));
    }

    #[test]
    fn invalid_config_never_starts() {
        let config = SimulationConfig { row_count: 0, ..single_row() };
        assert!(SimEngine::new(config, 1).is_err());
    }

    #[test]
    fn step_after_finish_is_a_no_op() {
        let mut engine = SimEngine::new(single_row(), 0).unwrap();
        engine.run_to_completion().unwrap();
        assert!(engine.is_finished());
        assert!(!engine.step().unwrap());
        let result = engine.finish().unwrap();
        assert_eq!(result.global.idle_time, ns(20));
    }
}
