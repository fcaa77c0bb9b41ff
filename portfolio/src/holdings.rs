use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use market::normalize::normalize_symbol;
use market::types::find_quote;
use market::{MarketDataProvider, NormalizedQuote};
use tracing::{debug, instrument, warn};

use crate::errors::PortfolioError;
use crate::service::PortfolioService;
use crate::types::{AssetPosition, PortfolioSnapshot};

/// A fixed amount of one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub amount: f64,
}

impl Holding {
    /// Parses `SYMBOL:AMOUNT`, e.g. `eth:1.5`.
    pub fn parse(raw: &str) -> Result<Self, PortfolioError> {
        let invalid = || PortfolioError::InvalidHolding(raw.trim().to_string());

        let (sym, amount) = raw.split_once(':').ok_or_else(invalid)?;
        let symbol = normalize_symbol(sym).ok_or_else(invalid)?;
        let amount: f64 = amount.trim().parse().map_err(|_| invalid())?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(invalid());
        }

        Ok(Self { symbol, amount })
    }

    /// Parses a comma separated list; blank entries are skipped.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, PortfolioError> {
        raw.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Values a configured set of holdings with live quotes.
pub struct HoldingsPortfolio<M> {
    holdings: Vec<Holding>,
    market: Arc<M>,
}

impl<M: MarketDataProvider> HoldingsPortfolio<M> {
    pub fn new(holdings: Vec<Holding>, market: Arc<M>) -> Self {
        Self { holdings, market }
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.holdings.len());
        for h in &self.holdings {
            if !out.contains(&h.symbol) {
                out.push(h.symbol.clone());
            }
        }
        out
    }
}

/// Builds a snapshot from holdings and quotes. Unpriced holdings are listed
/// with zero value and do not count towards the total.
pub fn value_holdings(holdings: &[Holding], quotes: &[NormalizedQuote]) -> PortfolioSnapshot {
    let mut assets: Vec<AssetPosition> = holdings
        .iter()
        .map(|h| {
            let quote = find_quote(quotes, &h.symbol);
            AssetPosition {
                symbol: h.symbol.clone(),
                amount: h.amount,
                price_usd: quote.map(|q| q.price_usd),
                value_usd: quote.map(|q| q.price_usd * h.amount).unwrap_or(0.0),
                change_24h_pct: quote.map(|q| q.change_24h_pct).unwrap_or(0.0),
                allocation_pct: 0.0,
            }
        })
        .collect();

    let total_value_usd: f64 = assets.iter().map(|a| a.value_usd).sum();

    if total_value_usd > 0.0 {
        for a in &mut assets {
            a.allocation_pct = a.value_usd / total_value_usd * 100.0;
        }
    }

    assets.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));

    PortfolioSnapshot {
        total_value_usd,
        assets,
        valued_at: Utc::now(),
    }
}

#[async_trait]
impl<M: MarketDataProvider> PortfolioService for HoldingsPortfolio<M> {
    #[instrument(skip(self), fields(holdings = self.holdings.len()), level = "debug")]
    async fn get_portfolio_snapshot(&self) -> Result<PortfolioSnapshot, PortfolioError> {
        if self.holdings.is_empty() {
            return Ok(value_holdings(&[], &[]));
        }

        let quotes = self.market.get_market_data(&self.symbols()).await?;
        let snapshot = value_holdings(&self.holdings, &quotes);

        let unpriced = snapshot.unpriced().count();
        if unpriced > 0 {
            warn!(unpriced, "some holdings have no market quote");
        }
        debug!(total_value_usd = snapshot.total_value_usd, "portfolio valued");

        Ok(snapshot)
    }
}
