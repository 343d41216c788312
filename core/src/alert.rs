//! ALERT controller: per-row threshold state machine, the global stall,
//! and the consecutive-alert classifier.
//!
//! Row transitions:
//!   Normal        -> AlertPending   counter > threshold right after an ACTIVATE
//!   AlertPending  -> AlertStalling  isoc ACTIVATEs (to any row) since the breach
//!   AlertStalling -> Backoff        stall complete, counter reset
//!   Backoff       -> Normal         abo_delay ACTIVATEs to this row since the reset
//!
//! RULE: One stall at a time. Breaches on other rows queue up in breach
//! order and stall one after another.

use crate::{
    config::SimulationConfig,
    row::{RowBank, RowPhase},
    types::{RowId, SimTime},
};
use std::collections::VecDeque;

pub struct AlertController {
    threshold:           u64,
    isoc_count:          u64,
    abo_delay_count:     u64,
    stall_duration:      SimTime,
    consecutive_gap:     SimTime,
    /// Breached rows, oldest first.
    pending:             VecDeque<RowId>,
    stalling:            Option<RowId>,
    pub last_alert_end:  Option<SimTime>,
    pub current_run:     u64,
    pub longest_run:     u64,
}

impl AlertController {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            threshold:       config.threshold,
            isoc_count:      config.isoc_count,
            abo_delay_count: config.abo_delay_count,
            stall_duration:  config.alert_duration(),
            consecutive_gap: config.consecutive_gap(),
            pending:         VecDeque::new(),
            stalling:        None,
            last_alert_end:  None,
            current_run:     0,
            longest_run:     0,
        }
    }

    pub fn stall_duration(&self) -> SimTime {
        self.stall_duration
    }

    /// Apply the state machine after `row` received an ACTIVATE.
    /// The bank must already have counted the activation.
    pub fn on_activate(&mut self, rows: &mut RowBank, row: RowId) {
        for &queued in &self.pending {
            if let RowPhase::AlertPending { isoc_owed } = &mut rows.get_mut(queued).phase {
                *isoc_owed = isoc_owed.saturating_sub(1);
            }
        }

        let state = rows.get_mut(row);
        if state.phase == RowPhase::Backoff
            && state.activations_since_last_alert_end >= self.abo_delay_count
        {
            state.phase = RowPhase::Normal;
        }

        // A zero-length stall means alerting is switched off.
        if self.stall_duration > 0
            && state.phase == RowPhase::Normal
            && state.counter_value > self.threshold
        {
            state.phase = RowPhase::AlertPending { isoc_owed: self.isoc_count };
            self.pending.push_back(row);
            log::debug!(
                "row {row}: counter {} > threshold {}, alert pending ({} isoc)",
                state.counter_value,
                self.threshold,
                self.isoc_count
            );
        }
    }

    /// The row whose stall must start now, if any.
    pub fn ready_stall(&self, rows: &RowBank) -> Option<RowId> {
        if self.stalling.is_some() {
            return None;
        }
        let &row = self.pending.front()?;
        match rows.get(row).phase {
            RowPhase::AlertPending { isoc_owed: 0 } => Some(row),
            _ => None,
        }
    }

    /// Enter the global stall for `row` at `start`.
    /// Returns whether the alert is consecutive with the previous one.
    pub fn begin_stall(&mut self, rows: &mut RowBank, row: RowId, start: SimTime) -> bool {
        debug_assert_eq!(self.pending.front(), Some(&row), "stall out of breach order");
        self.pending.pop_front();
        rows.get_mut(row).phase = RowPhase::AlertStalling;
        self.stalling = Some(row);
        self.classify(start)
    }

    /// Finish the stall at `end` and start the row's backoff. The
    /// engine has already serviced the stall's RFMs.
    pub fn complete_stall(&mut self, rows: &mut RowBank, row: RowId, end: SimTime) {
        debug_assert_eq!(self.stalling, Some(row));
        let state = rows.get_mut(row);
        state.activations_since_last_alert_end = 0;
        state.phase = if self.abo_delay_count == 0 {
            RowPhase::Normal
        } else {
            RowPhase::Backoff
        };
        self.stalling = None;
        self.last_alert_end = Some(end);
    }

    /// Drop queued breaches on `serviced` rows whose counter is back at
    /// or below the threshold. Returns how many were released.
    pub fn release_serviced(&mut self, rows: &mut RowBank, serviced: &[RowId]) -> usize {
        let threshold = self.threshold;
        let before = self.pending.len();
        self.pending.retain(|&queued| {
            let state = rows.get_mut(queued);
            if serviced.contains(&queued) && state.counter_value <= threshold {
                log::debug!("row {queued}: breach cleared by ALERT RFM");
                state.phase = RowPhase::Normal;
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    /// Consecutive iff the gap since the previous stall ended is exactly
    /// (isoc + abo_delay) activations long.
    fn classify(&mut self, start: SimTime) -> bool {
        let consecutive = matches!(
            self.last_alert_end,
            Some(end) if start.checked_sub(end) == Some(self.consecutive_gap)
        );
        self.current_run = if consecutive { self.current_run + 1 } else { 1 };
        self.longest_run = self.longest_run.max(self.current_run);
        consecutive
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
