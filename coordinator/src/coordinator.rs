//! Coordinator
//!
//! Public entry point of the crate. Responsibilities:
//!   • Turn scheduler ticks and manual refreshes into queued requests
//!   • Dispatch queued requests under the concurrency cap
//!   • Commit fetch results to the cache and stamp the rate gate
//!   • Report outcomes to `RefreshHandle` waiters
//!   • Own the scheduler lifecycle (start, enable/disable, destroy)
//!
//! The coordinator is an Arc-managed service so dispatched fetch tasks can
//! hold onto it. All bookkeeping sits behind one `parking_lot::Mutex` that is
//! never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use common::{TraceId, logger::dispatch_span};
use insights::{MarketInsight, fallback_insight};
use market::NormalizedQuote;
use parking_lot::Mutex;
use portfolio::PortfolioSnapshot;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout};
use tracing::{Instrument, Span, debug, info, warn};

use crate::cache::{CacheStore, StaleRead};
use crate::category::{Category, Origin};
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, FetchError};
use crate::fetcher::{CategoryData, Fetchers};
use crate::limiter::ConcurrencyLimiter;
use crate::queue::{Enqueued, QueuedRequest, RequestQueue};
use crate::rate_gate::RateGate;
use crate::scheduler::{SchedulerHandle, TickTarget, spawn_scheduler};
use crate::state::CategoryStates;
use crate::status::{CategoryStatus, CoordinatorStatus};

type Outcome = Result<(), FetchError>;
type Waiter = oneshot::Sender<Outcome>;

/// Caller's view of a manual refresh.
///
/// Dropping the handle does not cancel the fetch.
#[derive(Debug)]
pub struct RefreshHandle {
    request_id: String,
    deduplicated: bool,
    rx: oneshot::Receiver<Outcome>,
}

impl RefreshHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// True when the request joined an already queued or executing one.
    pub fn is_deduplicated(&self) -> bool {
        self.deduplicated
    }

    /// Resolves once the underlying fetch settles. A request dropped by
    /// `set_enabled(false)` or `destroy` resolves to `FetchError::Cancelled`.
    pub async fn wait(self) -> Outcome {
        self.rx.await.unwrap_or(Err(FetchError::Cancelled))
    }
}

/// A dequeued request together with what it was dispatched with.
struct Dispatch {
    req: QueuedRequest,
    generation: u64,
    dispatched_at: Instant,
}

impl Dispatch {
    /// Instant the rate gate is stamped with on success. Scheduled requests
    /// carry the tick they were due at so queueing delay never pushes the
    /// next tick past its interval.
    fn gate_stamp(&self) -> Instant {
        match self.req.origin {
            Origin::Scheduled => self.req.enqueued_at,
            Origin::Manual => self.dispatched_at,
        }
    }
}

struct Inner {
    queue: RequestQueue,
    limiter: ConcurrencyLimiter,
    gate: RateGate,
    states: CategoryStates,
    /// Request seq -> callers waiting on it.
    waiters: HashMap<u64, Vec<Waiter>>,
    enabled: bool,
    destroyed: bool,
    scheduler: Option<SchedulerHandle>,
    /// Bumped on every arm; ticks from an older loop are ignored.
    epoch: u64,
    /// Set when an insight fetch found no quotes; holds the instant the
    /// retried insight request is enqueued at.
    insight_awaits_quotes: Option<Instant>,
}

impl Inner {
    /// Periodic path: rate gate, then enqueue. Returns whether a new request
    /// was queued.
    fn enqueue_scheduled(&mut self, category: Category, now: Instant) -> bool {
        if self.destroyed || !self.enabled {
            return false;
        }
        if !self.gate.should_fetch(category, now) {
            debug!(%category, "scheduled refresh skipped; interval not elapsed");
            return false;
        }
        match self
            .queue
            .enqueue(QueuedRequest::new(category, Origin::Scheduled, now))
        {
            Enqueued::Queued(seq) => {
                debug!(%category, seq, "scheduled refresh queued");
                true
            }
            Enqueued::Duplicate(_) => false,
        }
    }

    /// Scheduled request queued on behalf of another category, bypassing
    /// the rate gate.
    fn enqueue_follow_up(&mut self, category: Category, at: Instant) {
        if self.destroyed || !self.enabled {
            return;
        }
        if let Enqueued::Queued(seq) = self
            .queue
            .enqueue(QueuedRequest::new(category, Origin::Scheduled, at))
        {
            debug!(%category, seq, "follow-up refresh queued");
        }
    }

    fn is_category_live(&self, category: Category) -> bool {
        [Origin::Manual, Origin::Scheduled]
            .into_iter()
            .any(|origin| self.queue.is_live(&category.request_id(origin)))
    }

    fn take_waiters(&mut self, seq: u64) -> Vec<Waiter> {
        self.waiters.remove(&seq).unwrap_or_default()
    }
}

pub struct Coordinator {
    cfg: CoordinatorConfig,
    fetchers: Fetchers,
    cache: CacheStore<CategoryData>,
    inner: Mutex<Inner>,
}

impl Coordinator {
    /// Builds an enabled coordinator. The scheduler is not armed until
    /// [`Coordinator::start`].
    pub fn new(cfg: CoordinatorConfig, fetchers: Fetchers) -> Result<Arc<Self>, CoordinatorError> {
        cfg.validate()?;

        let intervals: Vec<(Category, std::time::Duration)> =
            Category::ALL.iter().map(|c| (*c, cfg.interval(*c))).collect();

        let inner = Inner {
            queue: RequestQueue::new(cfg.dedup),
            limiter: ConcurrencyLimiter::new(cfg.max_concurrent),
            gate: RateGate::new(intervals.clone()),
            states: CategoryStates::new(intervals),
            waiters: HashMap::new(),
            enabled: true,
            destroyed: false,
            scheduler: None,
            epoch: 0,
            insight_awaits_quotes: None,
        };

        info!(
            max_concurrent = cfg.max_concurrent,
            dedup = cfg.dedup,
            scheduled = ?cfg.scheduled,
            "coordinator created"
        );

        Ok(Arc::new(Self {
            cache: CacheStore::new(cfg.cache_capacity),
            cfg,
            fetchers,
            inner: Mutex::new(inner),
        }))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.cfg
    }

    /// Arms the background scheduler. Must run inside a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        self.set_enabled(true);
    }

    /// `false` stops the scheduler and cancels queued work; fetches already
    /// executing still commit their results. `true` re-arms the scheduler and
    /// is a no-op while it is running. Ignored after `destroy`.
    pub fn set_enabled(self: &Arc<Self>, on: bool) {
        if on {
            self.arm();
        } else {
            self.disarm();
        }
    }

    fn arm(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            debug!("set_enabled(true) ignored; coordinator destroyed");
            return;
        }
        inner.enabled = true;

        if inner.scheduler.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        inner.epoch += 1;
        let plan: Vec<_> = self
            .cfg
            .scheduled
            .iter()
            .map(|c| (*c, self.cfg.interval(*c)))
            .collect();
        let target = Arc::downgrade(self);
        inner.scheduler = Some(spawn_scheduler(target, plan, inner.epoch));

        info!(epoch = inner.epoch, "coordinator enabled");
    }

    fn disarm(&self) {
        let (handle, cancelled) = {
            let mut inner = self.inner.lock();
            if inner.destroyed || !inner.enabled {
                return;
            }
            inner.enabled = false;

            let handle = inner.scheduler.take();
            let drained = inner.queue.drain_pending();
            let mut cancelled = Vec::new();
            for req in &drained {
                cancelled.extend(inner.take_waiters(req.seq));
            }
            info!(
                dropped_requests = drained.len(),
                in_flight = inner.limiter.active(),
                "coordinator disabled"
            );
            (handle, cancelled)
        };

        if let Some(h) = handle {
            h.stop();
        }
        notify(cancelled, &Err(FetchError::Cancelled));
    }

    /// Irreversible teardown. Stops the scheduler, cancels every waiter and
    /// forgets the queue, cache and rate gate. Results of fetches still
    /// executing are discarded when they settle.
    pub fn destroy(&self) {
        let (handle, waiters) = {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.enabled = false;

            inner.queue.clear();
            inner.limiter.reset();
            inner.gate.reset();
            inner.states.reset_all();
            inner.insight_awaits_quotes = None;

            let waiters: Vec<Waiter> = inner.waiters.drain().flat_map(|(_, w)| w).collect();
            (inner.scheduler.take(), waiters)
        };

        if let Some(h) = handle {
            h.stop();
        }
        notify(waiters, &Err(FetchError::Cancelled));
        self.cache.clear();

        info!("coordinator destroyed");
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    // ---------------------------------------------------------------------
    // Requests
    // ---------------------------------------------------------------------

    /// Manual refresh: top priority, bypasses the rate gate. Joins a manual
    /// request for the same category that is still queued or executing.
    pub fn refresh(self: &Arc<Self>, category: Category) -> RefreshHandle {
        let (tx, rx) = oneshot::channel();
        let request_id = category.request_id(Origin::Manual);

        let enqueued = {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                None
            } else {
                let req = QueuedRequest::new(category, Origin::Manual, Instant::now());
                let enqueued = inner.queue.enqueue(req);
                let seq = match enqueued {
                    Enqueued::Queued(seq) | Enqueued::Duplicate(seq) => seq,
                };
                inner.waiters.entry(seq).or_default().push(tx);
                Some(enqueued)
            }
        };

        let deduplicated = match enqueued {
            None => {
                debug!(%category, "refresh after destroy; resolving as cancelled");
                return RefreshHandle {
                    request_id,
                    deduplicated: false,
                    rx,
                };
            }
            Some(Enqueued::Duplicate(seq)) => {
                debug!(%category, seq, "manual refresh joined live request");
                true
            }
            Some(Enqueued::Queued(seq)) => {
                info!(%category, seq, "manual refresh queued");
                self.pump();
                false
            }
        };

        RefreshHandle {
            request_id,
            deduplicated,
            rx,
        }
    }

    /// String entry point for [`Coordinator::refresh`].
    pub fn refresh_named(self: &Arc<Self>, name: &str) -> Result<RefreshHandle, CoordinatorError> {
        let category: Category = name.parse()?;
        if self.is_destroyed() {
            return Err(CoordinatorError::Destroyed);
        }
        Ok(self.refresh(category))
    }

    /// Periodic path: consults the rate gate, enqueues at the category's
    /// scheduled priority and dispatches. Returns whether a request was queued.
    pub fn tick(self: &Arc<Self>, category: Category) -> bool {
        let queued = self.inner.lock().enqueue_scheduled(category, Instant::now());
        if queued {
            self.pump();
        }
        queued
    }

    /// Dispatches queued requests while the limiter has capacity.
    fn pump(self: &Arc<Self>) {
        let dispatches = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if inner.destroyed {
                return;
            }

            let now = Instant::now();
            let mut out = Vec::new();
            while !inner.queue.is_empty() && inner.limiter.try_acquire() {
                let Some(req) = inner.queue.dequeue_next() else {
                    inner.limiter.release();
                    break;
                };
                let generation = inner.states.get_mut(req.category).begin();
                out.push(Dispatch {
                    req,
                    generation,
                    dispatched_at: now,
                });
            }

            if !out.is_empty() {
                debug!(
                    dispatched = out.len(),
                    active = inner.limiter.active(),
                    queued = inner.queue.queued_len(),
                    "queue pumped"
                );
            }
            out
        };

        for d in dispatches {
            let trace_id = TraceId::new();
            let span = dispatch_span(&d.req.id, d.req.category.as_str(), &trace_id);
            span.record("generation", d.generation);

            let this = Arc::clone(self);
            tokio::spawn(async move { this.execute(d).await }.instrument(span));
        }
    }

    async fn execute(self: Arc<Self>, d: Dispatch) {
        let category = d.req.category;
        debug!(
            priority = d.req.priority,
            origin = ?d.req.origin,
            seq = d.req.seq,
            "fetch started"
        );

        let fetch = self
            .fetchers
            .fetch(category, &self.cfg.symbols, &self.cache);
        let result = match timeout(self.cfg.fetch_timeout, fetch).await {
            Ok(r) => r,
            Err(_) => Err(FetchError::Timeout(self.cfg.fetch_timeout)),
        };

        self.settle(d, result);
        self.pump();
    }

    /// Applies a finished fetch to the bookkeeping and notifies its waiters.
    fn settle(&self, d: Dispatch, result: Result<CategoryData, FetchError>) {
        let category = d.req.category;
        let span = Span::current();

        let (waiters, outcome) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if inner.destroyed {
                span.record("outcome", "discarded");
                debug!(%category, "result discarded; coordinator destroyed");
                return;
            }

            inner.queue.complete(d.req.seq);
            inner.limiter.release();

            let state = inner.states.get_mut(category);
            state.finish();

            let outcome = match result {
                Ok(data) => {
                    if state.commit(d.generation) {
                        self.cache
                            .set(category.cache_key(), data, self.cfg.ttl(category));
                        inner.gate.mark_fetched(category, d.gate_stamp());
                        span.record("outcome", "cached");
                        info!(%category, generation = d.generation, "fetch cached");

                        if category == Category::Market {
                            if let Some(at) = inner.insight_awaits_quotes.take() {
                                inner.enqueue_follow_up(Category::Ai, at);
                            }
                        }
                    } else {
                        span.record("outcome", "superseded");
                        info!(
                            %category,
                            generation = d.generation,
                            committed = state.committed_generation,
                            "result superseded by newer fetch; not cached"
                        );
                    }
                    Ok(())
                }
                Err(FetchError::NoMarketData) => {
                    state.fail(FetchError::NoMarketData.to_string());
                    span.record("outcome", "deferred");
                    info!(%category, "insight deferred until market quotes are cached");

                    inner.insight_awaits_quotes.get_or_insert(d.req.enqueued_at);
                    if !inner.is_category_live(Category::Market) {
                        inner.enqueue_follow_up(Category::Market, Instant::now());
                    }
                    Err(FetchError::NoMarketData)
                }
                Err(e) => {
                    state.fail(e.to_string());
                    span.record("outcome", "failed");
                    warn!(
                        %category,
                        error = %e,
                        failures = state.failures,
                        "fetch failed; keeping previous cache entry"
                    );
                    Err(e)
                }
            };

            (inner.take_waiters(d.req.seq), outcome)
        };

        notify(waiters, &outcome);
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    /// Side-effect free snapshot. A destroyed coordinator reports zeroed state.
    pub fn status(&self) -> CoordinatorStatus {
        let inner = self.inner.lock();
        if inner.destroyed {
            return CoordinatorStatus::zeroed();
        }

        let categories = Category::ALL
            .into_iter()
            .map(|c| match inner.states.get(c) {
                Some(s) => CategoryStatus::from_state(c, s),
                None => CategoryStatus::idle(c),
            })
            .collect();

        CoordinatorStatus {
            enabled: inner.enabled,
            active_requests: inner.limiter.active(),
            peak_concurrency: inner.limiter.peak(),
            queued_requests: inner.queue.queued_len(),
            cache_size: self.cache.len(),
            last_requests: inner.gate.last_fetches(),
            categories,
            cache: self.cache.metrics(),
        }
    }

    // ---------------------------------------------------------------------
    // Cached reads
    // ---------------------------------------------------------------------

    pub fn quotes(&self) -> Option<Vec<NormalizedQuote>> {
        self.cached(Category::Market, unwrap_quotes)
    }

    pub fn portfolio(&self) -> Option<PortfolioSnapshot> {
        self.cached(Category::Portfolio, unwrap_portfolio)
    }

    pub fn insight(&self) -> Option<MarketInsight> {
        self.cached(Category::Ai, unwrap_insight)
    }

    pub fn quotes_stale(&self) -> Option<StaleRead<Vec<NormalizedQuote>>> {
        self.cached_stale(Category::Market, unwrap_quotes)
    }

    pub fn portfolio_stale(&self) -> Option<StaleRead<PortfolioSnapshot>> {
        self.cached_stale(Category::Portfolio, unwrap_portfolio)
    }

    pub fn insight_stale(&self) -> Option<StaleRead<MarketInsight>> {
        self.cached_stale(Category::Ai, unwrap_insight)
    }

    /// Latest insight, even an expired one; the canned fallback when the AI
    /// provider has never succeeded.
    pub fn insight_or_fallback(&self) -> MarketInsight {
        if let Some(read) = self.insight_stale() {
            return read.value;
        }
        let quotes = self.quotes_stale().map(|r| r.value).unwrap_or_default();
        fallback_insight(&quotes)
    }

    fn cached<T>(&self, category: Category, unwrap: fn(CategoryData) -> Option<T>) -> Option<T> {
        self.cache.get(category.cache_key()).and_then(unwrap)
    }

    fn cached_stale<T>(
        &self,
        category: Category,
        unwrap: fn(CategoryData) -> Option<T>,
    ) -> Option<StaleRead<T>> {
        let read = self.cache.get_stale(category.cache_key())?;
        Some(StaleRead {
            value: unwrap(read.value)?,
            age: read.age,
            expired: read.expired,
        })
    }
}

impl TickTarget for Coordinator {
    fn on_scheduled_tick(self: Arc<Self>, epoch: u64, due: &[(Category, Instant)]) -> bool {
        let queued = {
            let mut inner = self.inner.lock();
            if inner.destroyed || !inner.enabled || inner.epoch != epoch {
                return false;
            }
            // Enqueue everything first so one pump dispatches by priority.
            let mut queued = 0;
            for (category, due_at) in due {
                if inner.enqueue_scheduled(*category, *due_at) {
                    queued += 1;
                }
            }
            queued
        };

        if queued > 0 {
            self.pump();
        }
        true
    }
}

fn notify(waiters: Vec<Waiter>, outcome: &Outcome) {
    for w in waiters {
        // The caller may have dropped its handle.
        let _ = w.send(outcome.clone());
    }
}

fn unwrap_quotes(d: CategoryData) -> Option<Vec<NormalizedQuote>> {
    match d {
        CategoryData::Market(q) => Some(q),
        _ => None,
    }
}

fn unwrap_portfolio(d: CategoryData) -> Option<PortfolioSnapshot> {
    match d {
        CategoryData::Portfolio(p) => Some(p),
        _ => None,
    }
}

fn unwrap_insight(d: CategoryData) -> Option<MarketInsight> {
    match d {
        CategoryData::Insight(i) => Some(i),
        _ => None,
    }
}
