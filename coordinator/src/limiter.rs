//! Concurrency cap shared by every category.

/// Fixed-capacity counter of executing fetches.
///
/// The coordinator only dequeues a request after `try_acquire` succeeded and
/// calls `release` exactly once when that fetch settles, which keeps
/// `active <= max` at all times.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    max: usize,
    active: usize,
    /// Highest `active` ever observed. Survives `reset`.
    peak: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            active: 0,
            peak: 0,
        }
    }

    fn has_capacity(&self) -> bool {
        self.active < self.max
    }

    pub fn try_acquire(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.active += 1;
        self.peak = self.peak.max(self.active);
        true
    }

    /// Saturating: a release after `reset` is a no-op.
    pub fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.active = 0;
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Highest number of fetches ever executing at once.
    pub fn peak(&self) -> usize {
        self.peak
    }
}
