//! Metrics aggregation and the final result record.
//!
//! RULE: The aggregator is a pure accumulator. It never decides anything
//! and never rejects an event; the scheduler reports, it counts.

use crate::{
    clock::TimeBudget,
    config::SimulationConfig,
    event::RfmKind,
    row::RowBank,
    types::{RowId, SimTime},
};
use serde::{Deserialize, Serialize};

/// Lifetime tallies for one row. Never reset during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowTally {
    pub activations: u64,
    pub alerts:      u64,
    pub rfms:        u64,
    pub alert_time:  SimTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalState {
    pub current_time:                  SimTime,
    pub total_activations:             u64,
    pub total_alerts:                  u64,
    pub total_alert_time:              SimTime,
    pub total_rfms:                    u64,
    pub proactive_rfm_count:           u64,
    pub abo_rfm_count:                 u64,
    pub proactive_rfm_time:            SimTime,
    pub current_consecutive_alert_run: u64,
    pub longest_consecutive_alert_run: u64,
    /// `None` until the first stall completes.
    pub last_alert_end_time:           Option<SimTime>,
    pub idle_time:                     SimTime,
    pub skipped_rfm_windows:           u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowSnapshot {
    pub id:                               RowId,
    pub activation_count:                 u64,
    pub counter_value:                    u64,
    pub alert_count:                      u64,
    pub rfm_count:                        u64,
    pub alert_time_accum:                 SimTime,
    pub activations_since_last_alert_end: u64,
    pub pending_breach:                   bool,
}

/// Everything a report needs. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationResult {
    pub seed:   u64,
    pub config: SimulationConfig,
    pub global: GlobalState,
    pub rows:   Vec<RowSnapshot>,
}

impl SimulationResult {
    /// Time spent on issued work.
    pub fn used_time(&self) -> SimTime {
        self.global.current_time - self.global.idle_time
    }

    /// Sum of all per-row snapshots, reported as a single row.
    pub fn row_totals(&self) -> RowTally {
        self.rows.iter().fold(RowTally::default(), |mut acc, r| {
            acc.activations += r.activation_count;
            acc.alerts += r.alert_count;
            acc.rfms += r.rfm_count;
            acc.alert_time += r.alert_time_accum;
            acc
        })
    }
}

pub struct MetricsAggregator {
    seed:   u64,
    config: SimulationConfig,
    rows:   Vec<RowTally>,
    global: GlobalState,
}

impl MetricsAggregator {
    pub fn new(config: &SimulationConfig, seed: u64) -> Self {
        Self {
            seed,
            config: config.clone(),
            rows:   vec![RowTally::default(); config.row_count],
            global: GlobalState::default(),
        }
    }

    pub fn on_activate(&mut self, row: RowId, timestamp: SimTime) {
        self.rows[row].activations += 1;
        self.global.total_activations += 1;
        self.global.current_time = timestamp;
    }

    /// `duration` is the stall time actually consumed; `run` is the
    /// consecutive-alert run length including this alert.
    pub fn on_alert_stall(&mut self, row: RowId, start: SimTime, duration: SimTime, run: u64) {
        let tally = &mut self.rows[row];
        tally.alerts += 1;
        tally.alert_time += duration;
        self.global.total_alerts += 1;
        self.global.total_alert_time += duration;
        self.global.current_consecutive_alert_run = run;
        self.global.longest_consecutive_alert_run =
            self.global.longest_consecutive_alert_run.max(run);
        self.global.current_time = start + duration;
    }

    /// `timestamp` is when the RFM finished. Reactive RFM time is already
    /// charged as alert time, so only proactive time is accumulated here.
    /// One call per RFM; an ALERT may issue several.
    pub fn on_rfm(&mut self, row: RowId, kind: RfmKind, timestamp: SimTime, duration: SimTime) {
        self.rows[row].rfms += 1;
        self.global.total_rfms += 1;
        match kind {
            RfmKind::Reactive => {
                self.global.abo_rfm_count += 1;
                self.global.last_alert_end_time = Some(timestamp);
            }
            RfmKind::Proactive => {
                self.global.proactive_rfm_count += 1;
                self.global.proactive_rfm_time += duration;
            }
        }
        self.global.current_time = timestamp;
    }

    pub fn on_windows_skipped(&mut self, total_skipped: u64) {
        self.global.skipped_rfm_windows = total_skipped;
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn finalize(mut self, budget: &TimeBudget, bank: &RowBank) -> SimulationResult {
        self.global.current_time = budget.now;
        self.global.idle_time = budget.idle;

        let rows = self
            .rows
            .into_iter()
            .zip(bank.iter())
            .map(|(tally, state)| RowSnapshot {
                id:                               state.id,
                activation_count:                 tally.activations,
                counter_value:                    state.counter_value,
                alert_count:                      tally.alerts,
                rfm_count:                        tally.rfms,
                alert_time_accum:                 tally.alert_time,
                activations_since_last_alert_end: state.activations_since_last_alert_end,
                pending_breach:                   state.pending_breach(),
            })
            .collect();

        SimulationResult {
            seed:   self.seed,
            config: self.config,
            global: self.global,
            rows,
        }
    }
}
