use std::time::Duration;

use market::normalize::normalize_symbols;

use crate::category::Category;
use crate::error::CoordinatorError;

/// Constructor-time options of a [`crate::Coordinator`].
///
/// Only `enabled` can change at runtime (via `set_enabled`); everything else
/// is fixed once the coordinator is built.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    // =========================
    // Scheduling
    // =========================
    /// How often market quotes are refreshed in the background.
    pub market_interval: Duration,

    /// How often the portfolio snapshot is refreshed in the background.
    pub portfolio_interval: Duration,

    /// How often a new AI insight is requested.
    ///
    /// AI calls are slow and billed per token, so this is the longest
    /// interval by default.
    pub ai_interval: Duration,

    /// Categories the background scheduler drives. Categories left out are
    /// only fetched through manual refreshes.
    pub scheduled: Vec<Category>,

    // =========================
    // Dispatch
    // =========================
    /// Upper bound on simultaneously executing fetches across all categories.
    pub max_concurrent: usize,

    /// Drop a request whose id is already queued or executing.
    pub dedup: bool,

    /// Per-fetch deadline. A hung upstream releases its slot after this.
    pub fetch_timeout: Duration,

    // =========================
    // Cache
    // =========================
    pub market_ttl: Duration,
    pub portfolio_ttl: Duration,
    pub ai_ttl: Duration,

    /// Maximum number of cache entries before LRU eviction kicks in.
    pub cache_capacity: usize,

    // =========================
    // Data
    // =========================
    /// Upper-case watch-list passed to the market-data provider.
    pub symbols: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            market_interval: Duration::from_secs(30),
            portfolio_interval: Duration::from_secs(60),
            ai_interval: Duration::from_secs(300),
            scheduled: Category::ALL.to_vec(),

            max_concurrent: 3,
            dedup: true,
            fetch_timeout: Duration::from_secs(15),

            market_ttl: Duration::from_secs(30),
            portfolio_ttl: Duration::from_secs(60),
            ai_ttl: Duration::from_secs(300),
            cache_capacity: 64,

            symbols: vec!["BTC".into(), "ETH".into(), "SOL".into()],
        }
    }
}

impl CoordinatorConfig {
    pub fn interval(&self, category: Category) -> Duration {
        match category {
            Category::Portfolio => self.portfolio_interval,
            Category::Market => self.market_interval,
            Category::Ai => self.ai_interval,
        }
    }

    pub fn ttl(&self, category: Category) -> Duration {
        match category {
            Category::Portfolio => self.portfolio_ttl,
            Category::Market => self.market_ttl,
            Category::Ai => self.ai_ttl,
        }
    }

    pub fn with_interval(mut self, category: Category, every: Duration) -> Self {
        match category {
            Category::Portfolio => self.portfolio_interval = every,
            Category::Market => self.market_interval = every,
            Category::Ai => self.ai_interval = every,
        }
        self
    }

    pub fn with_ttl(mut self, category: Category, ttl: Duration) -> Self {
        match category {
            Category::Portfolio => self.portfolio_ttl = ttl,
            Category::Market => self.market_ttl = ttl,
            Category::Ai => self.ai_ttl = ttl,
        }
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_dedup(mut self, on: bool) -> Self {
        self.dedup = on;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.symbols = normalize_symbols(symbols);
        self
    }

    pub fn with_scheduled(mut self, categories: &[Category]) -> Self {
        let mut scheduled = categories.to_vec();
        scheduled.sort();
        scheduled.dedup();
        self.scheduled = scheduled;
        self
    }

    /// Rejects settings that would stall or spin the coordinator.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.max_concurrent == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "max_concurrent must be at least 1".into(),
            ));
        }
        for c in Category::ALL {
            if self.interval(c).is_zero() {
                return Err(CoordinatorError::InvalidConfig(format!(
                    "{c} interval must be non-zero"
                )));
            }
        }
        if self.fetch_timeout.is_zero() {
            return Err(CoordinatorError::InvalidConfig(
                "fetch_timeout must be non-zero".into(),
            ));
        }
        if self.cache_capacity < Category::ALL.len() {
            return Err(CoordinatorError::InvalidConfig(format!(
                "cache_capacity must hold at least one entry per category ({})",
                Category::ALL.len()
            )));
        }
        Ok(())
    }
}
