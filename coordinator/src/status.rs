use std::collections::HashMap;

use serde::Serialize;
use tokio::time::Instant;

use crate::cache::CacheMetrics;
use crate::category::Category;
use crate::state::{CategoryState, Phase};

/// Per-category slice of [`CoordinatorStatus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatus {
    pub category: Category,
    pub phase: Phase,
    pub in_flight: usize,
    pub last_error: Option<String>,
    pub successes: u64,
    pub failures: u64,
    /// Generation of the result currently cached (0 = never).
    pub generation: u64,
}

impl CategoryStatus {
    pub fn from_state(category: Category, state: &CategoryState) -> Self {
        Self {
            category,
            phase: state.phase,
            in_flight: state.in_flight,
            last_error: state.last_error.clone(),
            successes: state.successes,
            failures: state.failures,
            generation: state.committed_generation,
        }
    }

    pub fn idle(category: Category) -> Self {
        Self::from_state(category, &CategoryState::default())
    }
}

/// Read-only snapshot returned by `Coordinator::status`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    pub enabled: bool,
    pub active_requests: usize,
    /// Most fetches ever executing at once; never above `max_concurrent`.
    pub peak_concurrency: usize,
    pub queued_requests: usize,
    pub cache_size: usize,
    /// Rate-gate stamp of the last successful fetch per category: the tick
    /// a scheduled fetch was due at, or the dispatch instant of a manual one.
    pub last_requests: HashMap<Category, Instant>,
    /// Sorted by priority.
    pub categories: Vec<CategoryStatus>,
    pub cache: CacheMetrics,
}

impl CoordinatorStatus {
    /// What a destroyed coordinator reports.
    pub fn zeroed() -> Self {
        Self {
            enabled: false,
            active_requests: 0,
            peak_concurrency: 0,
            queued_requests: 0,
            cache_size: 0,
            last_requests: HashMap::new(),
            categories: Category::ALL.into_iter().map(CategoryStatus::idle).collect(),
            cache: CacheMetrics::default(),
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryStatus> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Time since the last successful fetch of `category`, if any.
    pub fn last_request_age(&self, category: Category, now: Instant) -> Option<std::time::Duration> {
        self.last_requests
            .get(&category)
            .map(|at| now.saturating_duration_since(*at))
    }

    pub fn is_idle(&self) -> bool {
        self.active_requests == 0 && self.queued_requests == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_status_lists_every_category_idle() {
        let s = CoordinatorStatus::zeroed();

        assert!(s.is_idle());
        assert!(!s.enabled);
        assert_eq!(s.categories.len(), 3);
        assert_eq!(s.categories[0].category, Category::Portfolio);
        assert!(s.categories.iter().all(|c| c.phase == Phase::Idle && c.generation == 0));
        assert!(s.last_request_age(Category::Market, Instant::now()).is_none());
    }
}
