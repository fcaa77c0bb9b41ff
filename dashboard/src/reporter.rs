//! Periodic status logging: queue and cache counters plus what each card
//! would currently show, with its staleness.

use std::sync::Arc;
use std::time::Duration;

use coordinator::Coordinator;
use market::NormalizedQuote;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{info, warn};

pub fn spawn_reporter(coordinator: Arc<Coordinator>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing is cached yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            report(&coordinator);
        }
    })
}

pub fn report(coordinator: &Coordinator) {
    let status = coordinator.status();
    let now = Instant::now();

    info!(
        enabled = status.enabled,
        active = status.active_requests,
        peak_concurrency = status.peak_concurrency,
        queued = status.queued_requests,
        cache_size = status.cache_size,
        cache_hits = status.cache.hits,
        cache_misses = status.cache.misses,
        "coordinator status"
    );

    for c in &status.categories {
        let updated = format_age(status.last_request_age(c.category, now));
        match &c.last_error {
            Some(error) => warn!(
                category = %c.category,
                updated = %updated,
                failures = c.failures,
                error = %error,
                "category degraded; showing last good data"
            ),
            None => info!(category = %c.category, phase = ?c.phase, updated = %updated, "category ok"),
        }
    }

    if let Some(read) = coordinator.quotes_stale() {
        info!(stale = read.expired, "market: {}", format_quotes(&read.value));
    }
    if let Some(read) = coordinator.portfolio_stale() {
        info!(
            stale = read.expired,
            total_value_usd = read.value.total_value_usd,
            change_24h_pct = read.value.change_24h_pct(),
            unpriced = read.value.unpriced().count(),
            "portfolio"
        );
    }

    let insight = coordinator.insight_or_fallback();
    info!(
        title = %insight.title,
        confidence = insight.confidence,
        related = ?insight.related_assets,
        "insight: {}",
        insight.content
    );
}

/// "last updated" label for a card.
pub fn format_age(age: Option<Duration>) -> String {
    let Some(age) = age else {
        return "never".to_string();
    };
    let secs = age.as_secs();
    match secs {
        0..5 => "just now".to_string(),
        5..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

pub fn format_quotes(quotes: &[NormalizedQuote]) -> String {
    quotes
        .iter()
        .map(|q| format!("{} ${:.2} ({:+.2}%)", q.symbol, q.price_usd, q.change_24h_pct))
        .collect::<Vec<_>>()
        .join(", ")
}
