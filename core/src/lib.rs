//! PRAC denial-of-service simulator core.
//!
//! A logical-time simulation of DRAM per-row activation counting with
//! threshold-triggered global ALERT stalls, reactive (ABO) and windowed
//! proactive RFMs. Entry point: [`simulate`].

pub mod alert;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod rng;
pub mod row;
pub mod types;
pub mod window;

pub use config::{ProactiveTarget, ReactiveTarget, SimulationConfig};
pub use engine::{simulate, simulate_with_log, SimEngine};
pub use error::{SimError, SimResult};
pub use metrics::{GlobalState, RowSnapshot, SimulationResult};
