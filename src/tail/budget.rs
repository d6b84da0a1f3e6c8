use std::time::{Duration, Instant};

/// Remaining wall-clock allowance of a tail, charged at checkpoints.
///
/// The remaining time only ever decreases. It is a best-effort ceiling: it is only
/// inspected between pulls, so a tail can overrun it by up to one wait window.
#[derive(Debug, Clone)]
pub struct TimeoutBudget {
    remaining: Duration,
    checkpoint: Instant,
}

impl TimeoutBudget {
    /// `None` for a zero limit, which means "block forever".
    #[must_use]
    pub fn new(limit: Duration) -> Option<Self> {
        Self::starting_at(limit, Instant::now())
    }

    #[must_use]
    pub fn starting_at(limit: Duration, now: Instant) -> Option<Self> {
        (!limit.is_zero()).then_some(Self { remaining: limit, checkpoint: now })
    }

    /// Move the checkpoint without charging, e.g. when a fresh handle is opened.
    pub fn rebase(&mut self) {
        self.rebase_at(Instant::now());
    }

    pub fn rebase_at(&mut self, now: Instant) {
        self.checkpoint = now;
    }

    /// Charge the time since the last checkpoint. Returns `true` once exhausted.
    pub fn charge(&mut self) -> bool {
        self.charge_at(Instant::now())
    }

    pub fn charge_at(&mut self, now: Instant) -> bool {
        let spent = now.saturating_duration_since(self.checkpoint);
        self.remaining = self.remaining.saturating_sub(spent);
        self.checkpoint = self.checkpoint.max(now);
        self.is_exhausted()
    }

    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining.is_zero()
    }
}
