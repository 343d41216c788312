//! Run configuration. Created once from validated input, never mutated.
//!
//! RULE: The engine only ever sees normalized picosecond durations.
//! Unit parsing and preset lookup belong to the caller.

use crate::{
    error::{SimError, SimResult},
    types::{ms, ns, SimTime},
};
use serde::{Deserialize, Serialize};

/// Which row a proactive (windowed) RFM services.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProactiveTarget {
    /// Take the next round-robin slot, exactly like an ACTIVATE would.
    #[default]
    RoundRobin,
    /// Service the row with the largest counter (lowest index on ties).
    /// No RFM is issued while every counter is zero.
    HighestCounter,
}

/// Which rows the RFMs of an ALERT service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReactiveTarget {
    /// One RFM, to the row that raised the ALERT.
    #[default]
    TriggeringRow,
    /// `rfm_abo_multiplier` RFMs to the rows with the largest counters,
    /// ranked once when the stall ends (lowest index on ties) and cycled
    /// when there are more RFMs than rows.
    HighestCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationConfig {
    pub row_count:            usize,
    /// tRC: time consumed by one ACTIVATE.
    pub activation_duration:  SimTime,
    /// ALERT is raised when a counter strictly exceeds this value.
    pub threshold:            u64,
    /// Number of RFMs serviced per ALERT; stall = multiplier × tRFC-RFM.
    pub rfm_abo_multiplier:   u64,
    /// tRFC-RFM: time consumed by one RFM.
    pub rfm_service_duration: SimTime,
    /// Window period and window start offset. Zero disables proactive RFM.
    pub window_start:         SimTime,
    /// Window end offset. Zero disables proactive RFM.
    pub window_end:           SimTime,
    /// ACTIVATEs still issued between a breach and its ALERT stall.
    pub isoc_count:           u64,
    /// ACTIVATEs a serviced row must receive before it may alert again.
    pub abo_delay_count:      u64,
    /// Counters reset to a uniform draw from `[0, rand_reset_range]`.
    pub rand_reset_range:     u64,
    pub runtime_budget:       SimTime,
    #[serde(default)]
    pub proactive_target:     ProactiveTarget,
    #[serde(default)]
    pub reactive_target:      ReactiveTarget,
}

impl Default for SimulationConfig {
    /// DDR5 single-bank timings over one refresh window.
    fn default() -> Self {
        Self {
            row_count:            1,
            activation_duration:  ns(45),
            threshold:            128,
            rfm_abo_multiplier:   4,
            rfm_service_duration: ns(410),
            window_start:         0,
            window_end:           0,
            isoc_count:           0,
            abo_delay_count:      0,
            rand_reset_range:     0,
            runtime_budget:       ms(32),
            proactive_target:     ProactiveTarget::RoundRobin,
            reactive_target:      ReactiveTarget::TriggeringRow,
        }
    }
}

impl SimulationConfig {
    /// Fail-fast validation. Nothing runs on a config that fails here.
    pub fn validate(&self) -> SimResult<()> {
        if self.row_count == 0 {
            return Err(SimError::invalid("row_count", "must be > 0"));
        }
        if self.activation_duration == 0 {
            return Err(SimError::invalid("activation_duration", "must be > 0"));
        }
        if self.threshold == 0 {
            return Err(SimError::invalid("threshold", "must be > 0"));
        }
        if self.runtime_budget == 0 {
            return Err(SimError::invalid("runtime_budget", "must be > 0"));
        }
        if self.windowing_enabled() {
            if self.window_end < self.window_start {
                return Err(SimError::invalid(
                    "window_end",
                    format!("({}ps) must be >= window_start ({}ps)", self.window_end, self.window_start),
                ));
            }
            if self.window_end >= self.window_start.saturating_mul(2) {
                return Err(SimError::invalid(
                    "window_end",
                    format!("({}ps) must be < 2 x window_start ({}ps)", self.window_end, self.window_start),
                ));
            }
        }
        if self.rfm_abo_multiplier.checked_mul(self.rfm_service_duration).is_none() {
            return Err(SimError::invalid("rfm_abo_multiplier", "alert duration overflows"));
        }
        let consecutive = self
            .isoc_count
            .checked_add(self.abo_delay_count)
            .and_then(|n| n.checked_mul(self.activation_duration));
        if consecutive.is_none() {
            return Err(SimError::invalid("isoc_count", "isoc + abo delay gap overflows"));
        }
        Ok(())
    }

    /// Reactive RFMs issued at the end of each ALERT stall.
    pub fn rfms_per_alert(&self) -> u64 {
        match self.reactive_target {
            ReactiveTarget::TriggeringRow => 1,
            ReactiveTarget::HighestCounters => self.rfm_abo_multiplier,
        }
    }

    /// Length of one global ALERT stall. Zero means alerting is off.
    pub fn alert_duration(&self) -> SimTime {
        self.rfm_abo_multiplier.saturating_mul(self.rfm_service_duration)
    }

    pub fn alerting_enabled(&self) -> bool {
        self.alert_duration() > 0
    }

    pub fn windowing_enabled(&self) -> bool {
        self.window_start > 0 && self.window_end > 0
    }

    /// Exact gap between two ALERTs that counts as back-to-back.
    pub fn consecutive_gap(&self) -> SimTime {
        (self.isoc_count + self.abo_delay_count).saturating_mul(self.activation_duration)
    }
}
