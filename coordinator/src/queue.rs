//! Priority queue of pending fetches with id-based deduplication.

use std::collections::{BTreeMap, HashMap};

use tokio::time::Instant;
use tracing::debug;

use crate::category::{Category, Origin};

/// A pending or executing fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRequest {
    /// Logical operation id; at most one live request per id when dedup is on.
    pub id: String,
    pub category: Category,
    pub origin: Origin,
    /// Lower is more urgent.
    pub priority: u8,
    pub enqueued_at: Instant,
    /// Assigned by the queue; breaks ties between equal `enqueued_at`.
    pub seq: u64,
}

impl QueuedRequest {
    pub fn new(category: Category, origin: Origin, enqueued_at: Instant) -> Self {
        Self {
            id: category.request_id(origin),
            category,
            origin,
            priority: category.priority(origin),
            enqueued_at,
            seq: 0,
        }
    }

    /// Request with an explicit id and priority.
    #[cfg(test)]
    pub fn custom(
        id: impl Into<String>,
        category: Category,
        priority: u8,
        enqueued_at: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            origin: Origin::Manual,
            priority,
            enqueued_at,
            seq: 0,
        }
    }
}

/// Result of [`RequestQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Accepted with this sequence number.
    Queued(u64),
    /// Dropped; a request with the same id is live under this sequence number.
    Duplicate(u64),
}

type OrderKey = (u8, Instant, u64);

/// Pending requests ordered by `(priority, enqueued_at, seq)` plus the set
/// of dispatched-but-unfinished requests.
#[derive(Debug)]
pub struct RequestQueue {
    dedup: bool,
    next_seq: u64,
    pending: BTreeMap<OrderKey, QueuedRequest>,
    active: HashMap<u64, QueuedRequest>,
    /// id -> seq of the live request with that id.
    live_ids: HashMap<String, u64>,
}

impl RequestQueue {
    pub fn new(dedup: bool) -> Self {
        Self {
            dedup,
            next_seq: 1,
            pending: BTreeMap::new(),
            active: HashMap::new(),
            live_ids: HashMap::new(),
        }
    }

    /// Inserts `req` unless its id is already queued or executing.
    ///
    /// A duplicate is a silent no-op for the queue; the caller gets the
    /// live request's sequence number so it can share its outcome.
    pub fn enqueue(&mut self, mut req: QueuedRequest) -> Enqueued {
        if self.dedup {
            if let Some(&seq) = self.live_ids.get(&req.id) {
                debug!(request_id = %req.id, seq, "duplicate request dropped");
                return Enqueued::Duplicate(seq);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        req.seq = seq;

        self.live_ids.insert(req.id.clone(), seq);
        self.pending
            .insert((req.priority, req.enqueued_at, seq), req);

        Enqueued::Queued(seq)
    }

    /// Removes the most urgent pending request and marks it active.
    pub fn dequeue_next(&mut self) -> Option<QueuedRequest> {
        let (_, req) = self.pending.pop_first()?;
        self.active.insert(req.seq, req.clone());
        Some(req)
    }

    /// Drops an active request once its fetch settled. Unknown seqs are ignored.
    pub fn complete(&mut self, seq: u64) -> Option<QueuedRequest> {
        let req = self.active.remove(&seq)?;
        if self.live_ids.get(&req.id) == Some(&seq) {
            self.live_ids.remove(&req.id);
        }
        Some(req)
    }

    /// Removes every pending request (active ones are untouched) and returns them.
    pub fn drain_pending(&mut self) -> Vec<QueuedRequest> {
        let drained: Vec<QueuedRequest> =
            std::mem::take(&mut self.pending).into_values().collect();
        for req in &drained {
            if self.live_ids.get(&req.id) == Some(&req.seq) {
                self.live_ids.remove(&req.id);
            }
        }
        drained
    }

    /// Forgets pending and active requests alike.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
        self.live_ids.clear();
    }

    pub fn queued_len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a request with `id` is queued or executing.
    pub fn is_live(&self, id: &str) -> bool {
        self.live_ids.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn req(id: &str, priority: u8, at: Instant) -> QueuedRequest {
        QueuedRequest::custom(id, Category::Market, priority, at)
    }

    #[test]
    fn duplicate_id_is_dropped_while_queued_and_while_active() {
        let mut q = RequestQueue::new(true);
        let t = Instant::now();

        let first = q.enqueue(req("market:manual", 0, t));
        assert_eq!(first, Enqueued::Queued(1));
        assert_eq!(q.enqueue(req("market:manual", 0, t)), Enqueued::Duplicate(1));
        assert_eq!(q.queued_len(), 1);

        let dispatched = q.dequeue_next().expect("one pending");
        assert_eq!(q.enqueue(req("market:manual", 0, t)), Enqueued::Duplicate(1));

        q.complete(dispatched.seq);
        assert!(matches!(q.enqueue(req("market:manual", 0, t)), Enqueued::Queued(_)));
    }

    #[test]
    fn dedup_off_accepts_repeated_ids() {
        let mut q = RequestQueue::new(false);
        let t = Instant::now();

        for _ in 0..3 {
            assert!(matches!(q.enqueue(req("same", 0, t)), Enqueued::Queued(_)));
        }
        assert_eq!(q.queued_len(), 3);

        let a = q.dequeue_next().expect("first");
        let b = q.dequeue_next().expect("second");
        q.complete(a.seq);
        // Live mapping points at the newest request; completing an older one keeps it.
        assert!(q.is_live("same"));
        q.complete(b.seq);
        assert_eq!(q.active_len(), 0);
    }

    #[test]
    fn lowest_priority_value_first_then_fifo() {
        let mut q = RequestQueue::new(true);
        let t = Instant::now();

        q.enqueue(req("ai", 3, t));
        q.enqueue(req("market-late", 2, t + Duration::from_millis(5)));
        q.enqueue(req("market-early", 2, t));
        q.enqueue(req("manual", 0, t + Duration::from_millis(10)));

        let order: Vec<String> = std::iter::from_fn(|| q.dequeue_next()).map(|r| r.id).collect();
        assert_eq!(order, vec!["manual", "market-early", "market-late", "ai"]);
    }

    #[test]
    fn equal_timestamps_fall_back_to_insertion_order() {
        let mut q = RequestQueue::new(true);
        let t = Instant::now();

        q.enqueue(req("a", 1, t));
        q.enqueue(req("b", 1, t));
        q.enqueue(req("c", 1, t));

        let order: Vec<String> = std::iter::from_fn(|| q.dequeue_next()).map(|r| r.id).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn drain_pending_keeps_active_requests_live() {
        let mut q = RequestQueue::new(true);
        let t = Instant::now();
        q.enqueue(req("running", 0, t));
        q.enqueue(req("waiting", 1, t));
        q.dequeue_next();

        let drained = q.drain_pending();

        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, "waiting");
        assert!(q.is_live("running"));
        assert!(!q.is_live("waiting"));
        assert_eq!(q.active_len(), 1);
    }

    #[test]
    fn complete_ignores_unknown_seq() {
        let mut q = RequestQueue::new(true);
        assert!(q.complete(42).is_none());
    }

    proptest! {
        #[test]
        fn dequeue_order_is_sorted_by_priority_then_time(
            entries in proptest::collection::vec((0u8..4, 0u64..50), 1..40)
        ) {
            let mut q = RequestQueue::new(false);
            let base = Instant::now();
            for (i, (p, ms)) in entries.iter().enumerate() {
                q.enqueue(req(&format!("r{i}"), *p, base + Duration::from_millis(*ms)));
            }

            let out: Vec<QueuedRequest> = std::iter::from_fn(|| q.dequeue_next()).collect();
            prop_assert_eq!(out.len(), entries.len());
            for w in out.windows(2) {
                let a = (w[0].priority, w[0].enqueued_at, w[0].seq);
                let b = (w[1].priority, w[1].enqueued_at, w[1].seq);
                prop_assert!(a < b);
            }
        }
    }
}
