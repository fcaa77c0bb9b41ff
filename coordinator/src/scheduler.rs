//! Background refresh scheduler.
//!
//! A single driving loop keeps one next-due instant per category instead of
//! one timer per category. When several categories fall due on the same
//! wake-up they are handed over together, sorted by priority, so the
//! coordinator enqueues them before dispatching anything.
//!
//! Each due category is handed over with the grid instant it was due at,
//! not the instant the loop woke up, so a late wake never shifts the grid.
//!
//! The loop holds only a `Weak` reference to its target: dropping the
//! coordinator ends the loop, and teardown aborts it. Every tick carries the
//! epoch it was armed with so a loop that outlives its teardown can never
//! enqueue work.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, info, info_span};

use crate::category::Category;

/// Receiver of scheduler ticks.
pub trait TickTarget: Send + Sync + 'static {
    /// Called with every category due at this wake-up, most urgent first,
    /// each paired with the instant it was due at. Returning `false` stops
    /// the loop.
    fn on_scheduled_tick(self: Arc<Self>, epoch: u64, due: &[(Category, Instant)]) -> bool;
}

/// Handle to a running scheduler loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    epoch: u64,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Aborts the loop. Pending sleeps are cancelled; no tick fires afterwards.
    pub fn stop(self) {
        self.task.abort();
        debug!(epoch = self.epoch, "scheduler stopped");
    }
}

/// Starts the loop. The first tick for every category fires immediately.
pub fn spawn_scheduler<T: TickTarget>(
    target: Weak<T>,
    plan: Vec<(Category, Duration)>,
    epoch: u64,
) -> SchedulerHandle {
    let span = info_span!("scheduler", epoch);
    let task = tokio::spawn(run(target, plan, epoch).instrument(span));
    SchedulerHandle { epoch, task }
}

struct Slot {
    category: Category,
    every: Duration,
    next_due: Instant,
}

async fn run<T: TickTarget>(target: Weak<T>, plan: Vec<(Category, Duration)>, epoch: u64) {
    let start = Instant::now();
    let mut slots: Vec<Slot> = plan
        .into_iter()
        .filter(|(_, every)| !every.is_zero())
        .map(|(category, every)| Slot {
            category,
            every,
            next_due: start,
        })
        .collect();

    info!(categories = slots.len(), "scheduler armed");

    loop {
        let Some(wake) = slots.iter().map(|s| s.next_due).min() else {
            break;
        };
        if wake > Instant::now() {
            sleep_until(wake).await;
        }

        let now = Instant::now();
        let mut due: Vec<(Category, Instant)> = Vec::new();
        for slot in &mut slots {
            if slot.next_due <= now {
                due.push((slot.category, slot.next_due));
                slot.next_due = next_after(slot.next_due, slot.every, now);
            }
        }
        due.sort();

        let Some(target) = target.upgrade() else {
            debug!("tick target dropped; scheduler exiting");
            break;
        };
        if !target.on_scheduled_tick(epoch, &due) {
            debug!("tick rejected; scheduler exiting");
            break;
        }
    }
}

/// Next due instant strictly after `now`. Missed ticks are skipped rather
/// than replayed in a burst.
fn next_after(prev: Instant, every: Duration, now: Instant) -> Instant {
    let mut next = prev + every;
    while next <= now {
        next += every;
    }
    next
}
