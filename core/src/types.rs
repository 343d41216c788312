//! Shared primitive types used across the entire simulation.

/// Logical simulation time in picoseconds.
///
/// Picoseconds keep every preset exact (bank-group tRC is 2.5ns) while a
/// u64 still covers more than 200 days of simulated time.
pub type SimTime = u64;

/// Index of a row inside the simulated bank.
pub type RowId = usize;

pub const PS_PER_NS: SimTime = 1_000;
pub const PS_PER_US: SimTime = 1_000_000;
pub const PS_PER_MS: SimTime = 1_000_000_000;
pub const PS_PER_S:  SimTime = 1_000_000_000_000;

pub const fn ns(v: u64) -> SimTime { v * PS_PER_NS }
pub const fn us(v: u64) -> SimTime { v * PS_PER_US }
pub const fn ms(v: u64) -> SimTime { v * PS_PER_MS }
