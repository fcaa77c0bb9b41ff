use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{Instant, advance};
use tracing_test::traced_test;

use coordinator::{Category, Coordinator, CoordinatorConfig, CoordinatorError, FetchError};

use mock_fetchers::{MockUpstream, price_of};

fn build(cfg: CoordinatorConfig, upstream: &Arc<MockUpstream>) -> Arc<Coordinator> {
    Coordinator::new(cfg, upstream.fetchers()).expect("valid config")
}

/// Lets spawned fetch tasks run without advancing the paused clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Yields until nothing is queued or executing.
async fn drain(coord: &Coordinator) {
    for _ in 0..200 {
        tokio::task::yield_now().await;
        if coord.status().is_idle() {
            return;
        }
    }
    panic!("coordinator did not go idle: {:?}", coord.status());
}

#[tokio::test(start_paused = true)]
async fn duplicate_manual_refresh_shares_one_fetch() -> anyhow::Result<()> {
    let upstream = MockUpstream::gated();
    let coord = build(CoordinatorConfig::default(), &upstream);

    let first = coord.refresh(Category::Market);
    let second = coord.refresh(Category::Market);
    assert!(!first.is_deduplicated());
    assert!(second.is_deduplicated());
    assert_eq!(second.request_id(), "market:manual");

    let status = coord.status();
    assert_eq!(status.active_requests + status.queued_requests, 1);

    upstream.release(1);
    first.wait().await?;
    second.wait().await?;

    assert_eq!(upstream.count(Category::Market), 1);
    assert!(coord.quotes().is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn periodic_path_is_rate_gated() {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    assert!(coord.tick(Category::Market));
    drain(&coord).await;
    assert!(!coord.tick(Category::Market));

    advance(Duration::from_secs(10)).await;
    assert!(!coord.tick(Category::Market));
    assert_eq!(upstream.count(Category::Market), 1);

    advance(Duration::from_secs(20)).await;
    assert!(coord.tick(Category::Market));
    drain(&coord).await;
    assert_eq!(upstream.count(Category::Market), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_cap_and_all_requests_finish() {
    let upstream = MockUpstream::gated();
    let cfg = CoordinatorConfig::default()
        .with_max_concurrent(2)
        .with_dedup(false);
    let coord = build(cfg, &upstream);

    let handles: Vec<_> = (0..5).map(|_| coord.refresh(Category::Market)).collect();
    settle().await;

    let status = coord.status();
    assert_eq!(status.active_requests, 2);
    assert_eq!(status.queued_requests, 3);
    assert_eq!(upstream.in_flight(), 2);

    upstream.release(5);
    let outcomes = join_all(handles.into_iter().map(|h| h.wait())).await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(upstream.count(Category::Market), 5);
    assert_eq!(upstream.peak(), 2);
    let status = coord.status();
    assert!(status.is_idle());
    assert_eq!(status.peak_concurrency, 2);
}

#[tokio::test(start_paused = true)]
async fn queued_categories_dispatch_by_priority() {
    let upstream = MockUpstream::gated();
    let coord = build(CoordinatorConfig::default().with_max_concurrent(1), &upstream);

    // Occupy the only slot, then queue the periodic work behind it.
    let busy = coord.refresh(Category::Market);
    settle().await;
    assert!(coord.tick(Category::Ai));
    assert!(coord.tick(Category::Market));
    assert!(coord.tick(Category::Portfolio));
    assert_eq!(coord.status().queued_requests, 3);

    upstream.release(4);
    assert!(busy.wait().await.is_ok());
    drain(&coord).await;

    assert_eq!(
        upstream.calls(),
        vec![
            Category::Market,
            Category::Portfolio,
            Category::Market,
            Category::Ai
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_preempts_scheduled_work() {
    let upstream = MockUpstream::gated();
    let coord = build(CoordinatorConfig::default().with_max_concurrent(1), &upstream);

    let busy = coord.refresh(Category::Market);
    settle().await;
    assert!(coord.tick(Category::Portfolio));
    let manual = coord.refresh(Category::Ai);

    upstream.release(3);
    assert!(busy.wait().await.is_ok());
    assert!(manual.wait().await.is_ok());
    drain(&coord).await;

    assert_eq!(
        upstream.calls(),
        vec![Category::Market, Category::Ai, Category::Portfolio]
    );
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_bypasses_rate_gate() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    assert!(coord.tick(Category::Market));
    drain(&coord).await;
    assert!(!coord.tick(Category::Market));

    coord.refresh(Category::Market).wait().await?;

    assert_eq!(upstream.count(Category::Market), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_dispatches_market_before_ai() {
    let upstream = MockUpstream::new();
    let cfg = CoordinatorConfig::default()
        .with_scheduled(&[Category::Ai, Category::Market])
        .with_max_concurrent(1);
    let coord = build(cfg, &upstream);

    coord.start();
    settle().await;
    drain(&coord).await;

    assert_eq!(upstream.calls(), vec![Category::Market, Category::Ai]);
    let status = coord.status();
    assert!(status.last_requests.contains_key(&Category::Market));
    assert!(status.last_requests.contains_key(&Category::Ai));
    assert!(!status.last_requests.contains_key(&Category::Portfolio));
    coord.destroy();
}

#[tokio::test(start_paused = true)]
async fn scheduler_refreshes_at_the_configured_interval() {
    let upstream = MockUpstream::new();
    let cfg = CoordinatorConfig::default()
        .with_scheduled(&[Category::Portfolio])
        .with_interval(Category::Portfolio, Duration::from_secs(1));
    let coord = build(cfg, &upstream);

    coord.start();
    settle().await;
    for _ in 0..3 {
        advance(Duration::from_secs(1)).await;
        settle().await;
    }

    assert_eq!(upstream.count(Category::Portfolio), 4);
    coord.destroy();
}

#[tokio::test(start_paused = true)]
async fn queued_scheduled_refresh_keeps_its_tick_interval() {
    let upstream = MockUpstream::new();
    upstream.delay(Category::Portfolio, Duration::from_secs(2));
    let cfg = CoordinatorConfig::default()
        .with_scheduled(&[Category::Portfolio, Category::Market])
        .with_interval(Category::Market, Duration::from_secs(10))
        .with_max_concurrent(1);
    let coord = build(cfg, &upstream);
    let started = Instant::now();

    // Market waits 2s behind the portfolio fetch on the first tick.
    coord.start();
    settle().await;
    for _ in 0..15 {
        advance(Duration::from_secs(1)).await;
        settle().await;
    }

    assert_eq!(upstream.count(Category::Market), 2);
    let status = coord.status();
    assert_eq!(
        status.last_requests.get(&Category::Market).copied(),
        Some(started + Duration::from_secs(10))
    );
    coord.destroy();
}

#[tokio::test(start_paused = true)]
async fn start_calls_market_provider_once_and_retries_insight() {
    let upstream = MockUpstream::new();
    upstream.queue_market_delays([Duration::from_millis(500), Duration::from_millis(500)]);
    let coord = build(CoordinatorConfig::default(), &upstream);

    // Every category is due at once; the insight finds no quotes yet.
    coord.start();
    settle().await;
    for _ in 0..2 {
        advance(Duration::from_millis(500)).await;
        settle().await;
    }
    drain(&coord).await;

    assert_eq!(upstream.count(Category::Market), 1);
    assert_eq!(upstream.count(Category::Ai), 1);
    assert!(coord.insight().is_some());

    let ai = coord.status().category(Category::Ai).cloned().expect("ai status");
    assert_eq!(ai.successes, 1);
    coord.destroy();
}

#[tokio::test(start_paused = true)]
async fn insight_without_quotes_fetches_market_through_the_queue() {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default().with_max_concurrent(1), &upstream);

    let outcome = coord.refresh(Category::Ai).wait().await;
    assert_eq!(outcome, Err(FetchError::NoMarketData));
    drain(&coord).await;

    assert_eq!(upstream.calls(), vec![Category::Market, Category::Ai]);
    assert!(coord.quotes().is_some());
    assert!(coord.insight().is_some());
    assert_eq!(coord.status().peak_concurrency, 1);
}

#[tokio::test(start_paused = true)]
async fn cached_value_expires_after_ttl() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    let cfg = CoordinatorConfig::default().with_ttl(Category::Market, Duration::from_millis(1_000));
    let coord = build(cfg, &upstream);

    coord.refresh(Category::Market).wait().await?;
    assert!(coord.quotes().is_some());

    advance(Duration::from_millis(500)).await;
    assert!(coord.quotes().is_some());

    advance(Duration::from_millis(1_000)).await;
    assert!(coord.quotes().is_none());

    let stale = coord.quotes_stale().expect("stale read");
    assert!(stale.expired);
    assert_eq!(stale.age, Duration::from_millis(1_500));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disable_while_in_flight_still_commits() {
    let upstream = MockUpstream::gated();
    let cfg = CoordinatorConfig::default()
        .with_scheduled(&[Category::Market])
        .with_interval(Category::Market, Duration::from_secs(1))
        .with_fetch_timeout(Duration::from_secs(600));
    let coord = build(cfg, &upstream);

    coord.start();
    settle().await;
    assert_eq!(coord.status().active_requests, 1);

    coord.set_enabled(false);
    assert!(!coord.is_enabled());
    assert!(!coord.tick(Category::Market));

    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(upstream.count(Category::Market), 1);

    upstream.release(1);
    drain(&coord).await;

    assert!(coord.quotes().is_some());
    assert_eq!(upstream.count(Category::Market), 1);
}

#[tokio::test(start_paused = true)]
async fn disable_cancels_queued_waiters() {
    let upstream = MockUpstream::gated();
    let coord = build(CoordinatorConfig::default().with_max_concurrent(1), &upstream);

    let running = coord.refresh(Category::Market);
    let queued = coord.refresh(Category::Portfolio);
    settle().await;

    coord.set_enabled(false);
    assert_eq!(queued.wait().await, Err(FetchError::Cancelled));

    upstream.release(1);
    assert_eq!(running.wait().await, Ok(()));
    assert_eq!(upstream.count(Category::Portfolio), 0);
}

#[tokio::test(start_paused = true)]
async fn re_enable_rearms_the_scheduler() {
    let upstream = MockUpstream::new();
    let cfg = CoordinatorConfig::default()
        .with_scheduled(&[Category::Market])
        .with_interval(Category::Market, Duration::from_secs(1));
    let coord = build(cfg, &upstream);

    coord.start();
    coord.start();
    settle().await;
    assert_eq!(upstream.count(Category::Market), 1);

    coord.set_enabled(false);
    advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(upstream.count(Category::Market), 1);

    coord.set_enabled(true);
    settle().await;
    assert_eq!(upstream.count(Category::Market), 2);
    coord.destroy();
}

#[tokio::test(start_paused = true)]
async fn destroy_is_harmless_afterwards() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    coord.refresh(Category::Market).wait().await?;
    coord.start();
    coord.destroy();

    let status = coord.status();
    assert_eq!(status.cache_size, 0);
    assert!(status.is_idle());
    assert!(!status.enabled);
    assert!(coord.quotes().is_none());

    assert_eq!(coord.refresh(Category::Market).wait().await, Err(FetchError::Cancelled));
    assert!(matches!(coord.refresh_named("market"), Err(CoordinatorError::Destroyed)));
    assert!(!coord.tick(Category::Market));

    coord.set_enabled(true);
    assert!(!coord.is_enabled());
    coord.destroy();

    advance(Duration::from_secs(120)).await;
    settle().await;
    assert_eq!(upstream.count(Category::Market), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn destroy_discards_in_flight_results() {
    let upstream = MockUpstream::gated();
    let coord = build(CoordinatorConfig::default(), &upstream);

    let handle = coord.refresh(Category::Market);
    settle().await;
    coord.destroy();
    assert_eq!(handle.wait().await, Err(FetchError::Cancelled));

    upstream.release(1);
    settle().await;

    assert!(coord.quotes().is_none());
    assert_eq!(coord.status().cache_size, 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_category_fails_fast() {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    let err = coord.refresh_named("bogus").expect_err("unknown category");
    assert_eq!(err, CoordinatorError::UnknownCategory("bogus".into()));
    assert!(coord.refresh_named("AI").is_ok());
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_times_out_and_frees_its_slot() {
    let upstream = MockUpstream::new();
    upstream.delay(Category::Portfolio, Duration::from_secs(60));
    let cfg = CoordinatorConfig::default()
        .with_max_concurrent(1)
        .with_fetch_timeout(Duration::from_secs(2));
    let coord = build(cfg, &upstream);

    let outcome = coord.refresh(Category::Portfolio).wait().await;
    assert_eq!(outcome, Err(FetchError::Timeout(Duration::from_secs(2))));

    let status = coord.status();
    assert_eq!(status.active_requests, 0);
    let portfolio = status.category(Category::Portfolio).expect("portfolio status");
    assert_eq!(portfolio.failures, 1);
    assert!(portfolio.last_error.is_some());
    assert!(!status.last_requests.contains_key(&Category::Portfolio));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn failure_keeps_previous_cache_entry_and_is_logged() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    coord.refresh(Category::Market).wait().await?;
    let before = coord.quotes().expect("cached quotes");

    upstream.fail(Category::Market, true);
    let outcome = coord.refresh(Category::Market).wait().await;
    assert!(matches!(outcome, Err(FetchError::Market(_))));

    assert_eq!(coord.quotes(), Some(before));
    assert!(logs_contain("fetch failed; keeping previous cache entry"));

    let market = coord.status().category(Category::Market).cloned().expect("market status");
    assert_eq!((market.successes, market.failures), (1, 1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn older_result_never_overwrites_newer_one() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    upstream.queue_market_delays([Duration::from_secs(5), Duration::from_secs(1)]);
    let cfg = CoordinatorConfig::default().with_dedup(false);
    let coord = build(cfg, &upstream);

    let slow = coord.refresh(Category::Market);
    let fast = coord.refresh(Category::Market);

    fast.wait().await?;
    assert_eq!(coord.quotes().map(|q| price_of(&q)), Some(200.0));

    // The superseded fetch still resolves successfully for its caller.
    slow.wait().await?;
    assert_eq!(coord.quotes().map(|q| price_of(&q)), Some(200.0));

    let market = coord.status().category(Category::Market).cloned().expect("market status");
    assert_eq!(market.generation, 2);
    assert_eq!(market.successes, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn insight_analyses_cached_quotes_and_falls_back_when_empty() -> anyhow::Result<()> {
    let upstream = MockUpstream::new();
    let coord = build(CoordinatorConfig::default(), &upstream);

    assert_eq!(coord.insight_or_fallback().title, "Market update");

    coord.refresh(Category::Market).wait().await?;
    coord.refresh(Category::Ai).wait().await?;

    assert_eq!(upstream.calls(), vec![Category::Market, Category::Ai]);
    let insight = coord.insight().expect("cached insight");
    assert_eq!(insight.related_assets, vec!["BTC", "ETH", "SOL"]);
    assert_eq!(coord.insight_or_fallback(), insight);
    Ok(())
}
