use async_trait::async_trait;

use crate::errors::PortfolioError;
use crate::types::PortfolioSnapshot;

/// Source of the user's current holdings valuation.
#[async_trait]
pub trait PortfolioService: Send + Sync + 'static {
    async fn get_portfolio_snapshot(&self) -> Result<PortfolioSnapshot, PortfolioError>;
}
