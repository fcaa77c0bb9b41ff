//! Minimum-interval gate for scheduled refreshes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::category::Category;

/// Per-category "last fetched" tracker consulted before scheduled fetches.
///
/// Advisory only: manual refreshes never ask the gate.
#[derive(Debug, Clone)]
pub struct RateGate {
    intervals: HashMap<Category, Duration>,
    last_fetch: HashMap<Category, Instant>,
}

impl RateGate {
    pub fn new(intervals: impl IntoIterator<Item = (Category, Duration)>) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
            last_fetch: HashMap::new(),
        }
    }

    /// `now - last_fetch >= interval`. A category that never fetched always passes.
    pub fn should_fetch(&self, category: Category, now: Instant) -> bool {
        let Some(last) = self.last_fetch.get(&category) else {
            return true;
        };
        let interval = self.intervals.get(&category).copied().unwrap_or_default();
        now.saturating_duration_since(*last) >= interval
    }

    /// Records `at` as the latest fetch. Older stamps never overwrite newer ones.
    pub fn mark_fetched(&mut self, category: Category, at: Instant) {
        let slot = self.last_fetch.entry(category).or_insert(at);
        if at > *slot {
            *slot = at;
        }
        debug!(%category, "rate gate stamped");
    }

    #[cfg(test)]
    pub fn last_fetched(&self, category: Category) -> Option<Instant> {
        self.last_fetch.get(&category).copied()
    }

    pub fn last_fetches(&self) -> HashMap<Category, Instant> {
        self.last_fetch.clone()
    }

    /// Forgets every fetch; the next check for each category passes.
    pub fn reset(&mut self) {
        self.last_fetch.clear();
    }
}
