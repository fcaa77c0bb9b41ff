use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Awaits `fut` and emits a `performance` warning when it took longer than `max`.
///
/// Uses tokio's clock so paused-time tests observe virtual durations.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn warns_only_above_threshold() {
        let out = warn_if_slow("fast", Duration::from_millis(100), async { 7 }).await;
        assert_eq!(out, 7);
        assert!(!logs_contain("slow operation detected"));

        warn_if_slow("slow", Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
        })
        .await;
        assert!(logs_contain("slow operation detected"));
    }
}
