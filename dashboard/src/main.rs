mod cli;
mod config;
mod reporter;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use common::logger::init_logger;
use coordinator::{Category, Coordinator, Fetchers};
use futures::future::join_all;
use insights::OpenAiInsightClient;
use market::CoinGeckoClient;
use portfolio::HoldingsPortfolio;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Wires the HTTP collaborators into the coordinator's fetchers.
fn build_fetchers(cfg: &AppConfig) -> anyhow::Result<Fetchers> {
    let market = Arc::new(
        CoinGeckoClient::new(cfg.coingecko_url.clone(), cfg.coingecko_api_key.clone())
            .context("building CoinGecko client")?,
    );

    let ai = Arc::new(
        OpenAiInsightClient::new(
            cfg.ai_base_url.clone(),
            cfg.ai_api_key.clone().unwrap_or_default(),
            cfg.ai_model.clone(),
        )
        .context("building AI client")?,
    );

    let portfolio = Arc::new(HoldingsPortfolio::new(cfg.holdings.clone(), Arc::clone(&market)));

    Ok(Fetchers::new(market, ai, portfolio))
}

/// Refreshes every scheduled category once and logs each outcome. The AI
/// insight runs last since it analyses the freshly cached quotes.
async fn refresh_all(coordinator: &Arc<Coordinator>, categories: &[Category]) {
    let (ai, data): (Vec<Category>, Vec<Category>) =
        categories.iter().copied().partition(|c| *c == Category::Ai);

    for batch in [data, ai] {
        refresh_batch(coordinator, &batch).await;
    }
}

async fn refresh_batch(coordinator: &Arc<Coordinator>, categories: &[Category]) {
    let pending = categories
        .iter()
        .map(|c| (*c, coordinator.refresh(*c)))
        .collect::<Vec<_>>();

    let outcomes = join_all(pending.into_iter().map(|(c, h)| async move { (c, h.wait().await) })).await;
    for (category, outcome) in outcomes {
        match outcome {
            Ok(()) => info!(%category, "initial refresh done"),
            Err(e) => warn!(%category, error = %e, "initial refresh failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?.with_cli(&cli)?;

    init_logger("dashboard", cfg.log_format());
    info!(
        symbols = ?cfg.symbols,
        holdings = cfg.holdings.len(),
        ai_enabled = cfg.ai_api_key.is_some(),
        "Starting dashboard coordinator..."
    );
    if cfg.ai_api_key.is_none() {
        warn!("AI_API_KEY not set; AI insights are disabled and the fallback insight is shown");
    }

    let coordinator = Coordinator::new(cfg.coordinator_config(), build_fetchers(&cfg)?)?;

    if cli.once {
        refresh_all(&coordinator, &cfg.scheduled()).await;
        reporter::report(&coordinator);
        coordinator.destroy();
        return Ok(());
    }

    // The scheduler's first tick fetches every scheduled category immediately.
    coordinator.start();
    let reporter = reporter::spawn_reporter(Arc::clone(&coordinator), cfg.report_every);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    reporter.abort();
    coordinator.destroy();

    Ok(())
}
