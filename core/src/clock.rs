//! Simulation clock: elapsed logical time against a fixed runtime budget.

use crate::types::SimTime;

/// Outcome of advancing the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Full,
    /// The request overran the budget; only `consumed` was spent and the
    /// budget is now exhausted.
    Truncated { consumed: SimTime },
}

impl Advance {
    pub fn consumed(self, requested: SimTime) -> SimTime {
        match self {
            Self::Full => requested,
            Self::Truncated { consumed } => consumed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBudget {
    pub budget:    SimTime,
    pub now:       SimTime,
    pub idle:      SimTime,
    pub exhausted: bool,
}

impl TimeBudget {
    pub fn new(budget: SimTime) -> Self {
        Self {
            budget,
            now: 0,
            idle: 0,
            exhausted: false,
        }
    }

    pub fn remaining(&self) -> SimTime {
        self.budget - self.now
    }

    /// True when a full event of length `d` fits before the budget ends.
    pub fn fits(&self, d: SimTime) -> bool {
        !self.exhausted && d <= self.remaining()
    }

    /// Spend `d`, clamped to what is left. A clamped advance exhausts the
    /// budget. Panics if called once exhausted, callers must check.
    pub fn advance(&mut self, d: SimTime) -> Advance {
        assert!(!self.exhausted, "advance() called on exhausted budget");
        let remaining = self.remaining();
        if d <= remaining {
            self.now += d;
            Advance::Full
        } else {
            self.now = self.budget;
            self.exhausted = true;
            Advance::Truncated { consumed: remaining }
        }
    }

    /// Close the run: whatever is left becomes idle time.
    /// Returns the idle time recorded.
    pub fn idle_out(&mut self) -> SimTime {
        if !self.exhausted {
            self.idle += self.remaining();
            self.now = self.budget;
            self.exhausted = true;
        }
        self.idle
    }

    /// Time spent on issued work (activations, stalls, RFMs).
    pub fn used(&self) -> SimTime {
        self.now - self.idle
    }
}
