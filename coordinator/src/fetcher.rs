//! Category fetchers: one strongly-typed call per category, each hitting
//! exactly one collaborator.

use std::sync::Arc;
use std::time::Duration;

use common::warn_if_slow;
use insights::{InsightProvider, MarketInsight};
use market::{MarketDataProvider, NormalizedQuote};
use portfolio::{PortfolioService, PortfolioSnapshot};
use tracing::{debug, instrument};

use crate::cache::CacheStore;
use crate::category::Category;
use crate::error::FetchError;

/// Collaborator calls slower than this are flagged in the `performance` log.
const SLOW_CALL: Duration = Duration::from_secs(3);

/// Normalised payload stored in the cache, one variant per category.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryData {
    Market(Vec<NormalizedQuote>),
    Portfolio(PortfolioSnapshot),
    Insight(MarketInsight),
}

impl CategoryData {
    pub fn as_quotes(&self) -> Option<&[NormalizedQuote]> {
        match self {
            CategoryData::Market(q) => Some(q),
            _ => None,
        }
    }
}

/// The three injected collaborators.
#[derive(Clone)]
pub struct Fetchers {
    market: Arc<dyn MarketDataProvider>,
    insights: Arc<dyn InsightProvider>,
    portfolio: Arc<dyn PortfolioService>,
}

impl Fetchers {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        insights: Arc<dyn InsightProvider>,
        portfolio: Arc<dyn PortfolioService>,
    ) -> Self {
        Self {
            market,
            insights,
            portfolio,
        }
    }

    /// Runs the fetcher for `category`. `cache` is only read (the AI fetcher
    /// analyses the cached quotes); writing results is the coordinator's job.
    pub async fn fetch(
        &self,
        category: Category,
        symbols: &[String],
        cache: &CacheStore<CategoryData>,
    ) -> Result<CategoryData, FetchError> {
        match category {
            Category::Market => self.fetch_market(symbols).await.map(CategoryData::Market),
            Category::Portfolio => self.fetch_portfolio().await.map(CategoryData::Portfolio),
            Category::Ai => self.fetch_insight(cache).await.map(CategoryData::Insight),
        }
    }

    #[instrument(skip(self, symbols), fields(symbols = symbols.len()), level = "debug")]
    async fn fetch_market(&self, symbols: &[String]) -> Result<Vec<NormalizedQuote>, FetchError> {
        let quotes = warn_if_slow("market_data", SLOW_CALL, self.market.get_market_data(symbols))
            .await?;

        debug!(quotes = quotes.len(), "market quotes fetched");
        Ok(quotes)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_portfolio(&self) -> Result<PortfolioSnapshot, FetchError> {
        let snapshot =
            warn_if_slow("portfolio_snapshot", SLOW_CALL, self.portfolio.get_portfolio_snapshot())
                .await?;

        debug!(total_value_usd = snapshot.total_value_usd, "portfolio snapshot fetched");
        Ok(snapshot)
    }

    /// Analyses the latest cached quotes, expired ones included. Never calls
    /// the market provider.
    #[instrument(skip(self, cache), level = "debug")]
    async fn fetch_insight(&self, cache: &CacheStore<CategoryData>) -> Result<MarketInsight, FetchError> {
        let quotes = cache
            .get_stale(Category::Market.cache_key())
            .and_then(|read| read.value.as_quotes().map(<[NormalizedQuote]>::to_vec))
            .filter(|q| !q.is_empty())
            .ok_or(FetchError::NoMarketData)?;

        let insight =
            warn_if_slow("ai_insight", SLOW_CALL, self.insights.analyze_market(&quotes)).await?;

        debug!(title = %insight.title, confidence = insight.confidence, "insight generated");
        Ok(insight)
    }
}
