//! Per-row counter and alert bookkeeping.
//!
//! RULE: Only the engine loop and the AlertController mutate rows.
//! Lifetime tallies (activations, alerts, RFMs) live in the
//! MetricsAggregator; this bank holds the control state.

use crate::types::RowId;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Where a row is in the PRAC alert cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RowPhase {
    Normal,
    /// Threshold breached; `isoc_owed` more ACTIVATEs (to any row) before
    /// the ALERT stall may start.
    AlertPending { isoc_owed: u64 },
    /// The global stall for this row is in progress.
    AlertStalling,
    /// Serviced; may not alert again until the ABO delay is worked off.
    Backoff,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowState {
    pub id:            RowId,
    /// Threshold-checking counter. Reset by every RFM.
    pub counter_value: u64,
    pub activations_since_last_alert_end: u64,
    pub phase:         RowPhase,
}

impl RowState {
    fn new(id: RowId) -> Self {
        Self {
            id,
            counter_value: 0,
            activations_since_last_alert_end: 0,
            phase: RowPhase::Normal,
        }
    }

    pub fn pending_breach(&self) -> bool {
        matches!(self.phase, RowPhase::AlertPending { .. })
    }
}

pub struct RowBank {
    rows: Vec<RowState>,
}

impl RowBank {
    pub fn new(row_count: usize) -> Self {
        Self {
            rows: (0..row_count).map(RowState::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: RowId) -> &RowState {
        &self.rows[row]
    }

    pub fn get_mut(&mut self, row: RowId) -> &mut RowState {
        &mut self.rows[row]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowState> {
        self.rows.iter()
    }

    /// Count one ACTIVATE against `row`.
    pub fn activate(&mut self, row: RowId) -> &RowState {
        let state = &mut self.rows[row];
        state.counter_value += 1;
        state.activations_since_last_alert_end += 1;
        state
    }

    /// RFM service: the counter drops to `reset_value`.
    pub fn service(&mut self, row: RowId, reset_value: u64) {
        self.rows[row].counter_value = reset_value;
    }

    /// Row with the largest counter, lowest index on ties.
    pub fn hottest(&self) -> Option<&RowState> {
        self.rows
            .iter()
            .rev()
            .max_by_key(|r| r.counter_value)
    }

    /// All row ids, largest counter first, lowest index on ties.
    pub fn ranked_by_counter(&self) -> Vec<RowId> {
        let mut ids: Vec<RowId> = (0..self.rows.len()).collect();
        // Stable sort: equal counters keep index order.
        ids.sort_by_key(|&id| Reverse(self.rows[id].counter_value));
        ids
    }
}
