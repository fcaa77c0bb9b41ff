use std::time::Duration;

use insights::InsightError;
use market::MarketError;
use portfolio::PortfolioError;
use thiserror::Error;

/// Programmer or lifecycle errors raised at the facade call site.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("unknown category `{0}` (expected market, portfolio or ai)")]
    UnknownCategory(String),

    #[error("invalid coordinator config: {0}")]
    InvalidConfig(String),

    #[error("coordinator has been destroyed")]
    Destroyed,
}

/// Outcome of a single fetch, shared with every waiter of the request.
///
/// Collaborator errors are flattened to strings so the value can be cloned
/// to all deduplicated callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("market data fetch failed: {0}")]
    Market(String),

    #[error("ai insight fetch failed: {0}")]
    Insight(String),

    #[error("portfolio fetch failed: {0}")]
    Portfolio(String),

    /// The AI fetcher found no quotes to analyse. The coordinator retries
    /// the insight once a market fetch commits.
    #[error("no market quotes cached yet")]
    NoMarketData,

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled before completion")]
    Cancelled,
}

impl From<MarketError> for FetchError {
    fn from(e: MarketError) -> Self {
        FetchError::Market(e.to_string())
    }
}

impl From<InsightError> for FetchError {
    fn from(e: InsightError) -> Self {
        FetchError::Insight(e.to_string())
    }
}

impl From<PortfolioError> for FetchError {
    fn from(e: PortfolioError) -> Self {
        FetchError::Portfolio(e.to_string())
    }
}
