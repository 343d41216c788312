//! Scheduler events and the optional event log.
//!
//! RULE: ScheduledEvent is a closed set. The scheduler handles it in a
//! single exhaustive match; nothing else dispatches on event kind.

use crate::types::{RowId, SimTime};
use serde::{Deserialize, Serialize};

/// The next thing the scheduler will do. Produced and consumed within
/// one step, never stored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    Activate { row: RowId },
    AlertStall { row: RowId, duration: SimTime },
    ProactiveRfm { due_time: SimTime },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RfmKind {
    /// ABO path: serviced at the end of an ALERT stall.
    Reactive,
    /// Windowed, independent of the threshold.
    Proactive,
}

/// What an applied event did, as recorded in the event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoggedEvent {
    Activate {
        row: RowId,
        counter: u64,
    },
    AlertStall {
        row: RowId,
        start: SimTime,
        duration: SimTime,
        consecutive: bool,
        run: u64,
    },
    Rfm {
        row: RowId,
        kind: RfmKind,
        reset_to: u64,
        /// Service time charged to this RFM. Zero for reactive RFMs,
        /// whose time is the ALERT stall's.
        duration: SimTime,
        /// Window due time, proactive RFMs only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_time: Option<SimTime>,
    },
    /// A due proactive RFM that found no row to service.
    RfmSkipped {
        due_time: SimTime,
    },
    RunFinished {
        idle: SimTime,
    },
}

/// One event log row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub at:         SimTime,
    pub event_type: String,
    pub payload:    String, // JSON-serialized LoggedEvent
}
