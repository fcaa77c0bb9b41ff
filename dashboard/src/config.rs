use std::time::Duration;

use anyhow::Context;
use common::logger::LogFormat;
use coordinator::{Category, CoordinatorConfig};
use market::normalize::parse_symbol_list;
use portfolio::Holding;

use crate::cli::Cli;

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Collaborators
    // =========================
    /// CoinGecko REST base URL. The public endpoint works without a key.
    pub coingecko_url: String,
    pub coingecko_api_key: Option<String>,

    /// Base URL of any OpenAI-compatible `chat/completions` API.
    pub ai_base_url: String,

    /// Without a key the AI category is never scheduled; the dashboard
    /// shows the canned fallback insight instead.
    pub ai_api_key: Option<String>,
    pub ai_model: String,

    // =========================
    // Data
    // =========================
    /// Watch-list for the market card and the AI prompt.
    pub symbols: Vec<String>,

    /// Holdings valued on the portfolio card.
    pub holdings: Vec<Holding>,

    // =========================
    // Coordinator
    // =========================
    pub market_interval: Duration,
    pub portfolio_interval: Duration,
    pub ai_interval: Duration,

    /// Upper bound on simultaneous upstream calls.
    pub max_concurrent: usize,

    // =========================
    // Process
    // =========================
    /// How often the status reporter logs a snapshot.
    pub report_every: Duration,

    /// JSON logs for production log shipping.
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys take defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = CoordinatorConfig::default();
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let symbols = match get("DASHBOARD_SYMBOLS") {
            Some(raw) => parse_symbol_list(&raw),
            None => defaults.symbols.clone(),
        };

        let holdings = match get("DASHBOARD_HOLDINGS") {
            Some(raw) => Holding::parse_list(&raw).context("invalid DASHBOARD_HOLDINGS")?,
            None => Vec::new(),
        };

        Ok(Self {
            coingecko_url: get("COINGECKO_URL")
                .unwrap_or_else(|| market::coingecko::client::DEFAULT_BASE_URL.to_string()),
            coingecko_api_key: get("COINGECKO_API_KEY"),

            ai_base_url: get("AI_BASE_URL")
                .unwrap_or_else(|| insights::openai::client::DEFAULT_BASE_URL.to_string()),
            ai_api_key: get("AI_API_KEY"),
            ai_model: get("AI_MODEL").unwrap_or_else(|| insights::openai::client::DEFAULT_MODEL.to_string()),

            symbols,
            holdings,

            market_interval: secs(&get, "MARKET_INTERVAL_SECS", defaults.market_interval)?,
            portfolio_interval: secs(&get, "PORTFOLIO_INTERVAL_SECS", defaults.portfolio_interval)?,
            ai_interval: secs(&get, "AI_INTERVAL_SECS", defaults.ai_interval)?,

            max_concurrent: match get("MAX_CONCURRENT_REQUESTS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("MAX_CONCURRENT_REQUESTS is not a number: {raw}"))?,
                None => defaults.max_concurrent,
            },

            report_every: Duration::from_secs(30),
            json_logs: get("APP_ENV").is_some_and(|v| v == "production"),
        })
    }

    /// Command-line flags win over the environment.
    pub fn with_cli(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(symbols) = &cli.symbols {
            self.symbols = market::normalize::normalize_symbols(symbols);
        }
        if let Some(raw) = &cli.holdings {
            self.holdings = Holding::parse_list(raw).context("invalid --holdings")?;
        }
        if let Some(s) = cli.market_interval_secs {
            self.market_interval = Duration::from_secs(s);
        }
        if let Some(s) = cli.portfolio_interval_secs {
            self.portfolio_interval = Duration::from_secs(s);
        }
        if let Some(s) = cli.ai_interval_secs {
            self.ai_interval = Duration::from_secs(s);
        }
        if let Some(n) = cli.max_concurrent {
            self.max_concurrent = n;
        }
        self.report_every = Duration::from_secs(cli.report_every_secs);
        self.json_logs |= cli.json;
        Ok(self)
    }

    pub fn log_format(&self) -> LogFormat {
        if self.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    /// Categories the background scheduler drives.
    pub fn scheduled(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| *c != Category::Ai || self.ai_api_key.is_some())
            .collect()
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_interval(Category::Market, self.market_interval)
            .with_interval(Category::Portfolio, self.portfolio_interval)
            .with_interval(Category::Ai, self.ai_interval)
            // Data is considered fresh for exactly one refresh interval.
            .with_ttl(Category::Market, self.market_interval)
            .with_ttl(Category::Portfolio, self.portfolio_interval)
            .with_ttl(Category::Ai, self.ai_interval)
            .with_max_concurrent(self.max_concurrent)
            .with_symbols(&self.symbols)
            .with_scheduled(&self.scheduled())
    }
}

fn secs(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    match get(key) {
        Some(raw) => {
            let s: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} is not a number of seconds: {raw}"))?;
            Ok(Duration::from_secs(s))
        }
        None => Ok(default),
    }
}
