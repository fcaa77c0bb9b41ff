//! Per-category bookkeeping mutated only by the coordinator's dispatch path.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::category::Category;

/// `Idle -> Fetching -> (Cached | Failed) -> Idle`. The terminal states are
/// transient, so only the stable phases are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryState {
    pub interval: Duration,
    pub phase: Phase,
    /// Executing fetches for this category (manual and scheduled may overlap).
    pub in_flight: usize,
    /// Generation handed to the most recent dispatch.
    pub dispatched_generation: u64,
    /// Generation whose result currently sits in the cache.
    pub committed_generation: u64,
    pub last_error: Option<String>,
    pub successes: u64,
    pub failures: u64,
}

impl CategoryState {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Enters `Fetching` and returns the dispatch's generation.
    pub fn begin(&mut self) -> u64 {
        self.in_flight += 1;
        self.phase = Phase::Fetching;
        self.dispatched_generation += 1;
        self.dispatched_generation
    }

    /// Leaves `Fetching` once nothing else is executing for the category.
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.phase = Phase::Idle;
        }
    }

    /// Records a success. Returns `false` when a newer generation already
    /// committed, in which case the result must not be written.
    pub fn commit(&mut self, generation: u64) -> bool {
        if generation <= self.committed_generation {
            return false;
        }
        self.committed_generation = generation;
        self.last_error = None;
        self.successes += 1;
        true
    }

    pub fn fail(&mut self, error: String) {
        self.last_error = Some(error);
        self.failures += 1;
    }

    /// Back to a never-fetched state; the interval is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.interval);
    }
}

/// One `CategoryState` per category.
#[derive(Debug, Clone)]
pub struct CategoryStates {
    inner: HashMap<Category, CategoryState>,
}

impl CategoryStates {
    pub fn new(intervals: impl IntoIterator<Item = (Category, Duration)>) -> Self {
        Self {
            inner: intervals
                .into_iter()
                .map(|(c, every)| (c, CategoryState::new(every)))
                .collect(),
        }
    }

    pub fn get(&self, category: Category) -> Option<&CategoryState> {
        self.inner.get(&category)
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryState {
        self.inner.entry(category).or_default()
    }

    pub fn reset_all(&mut self) {
        for s in self.inner.values_mut() {
            s.reset();
        }
    }
}
