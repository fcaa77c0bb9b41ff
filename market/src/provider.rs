use async_trait::async_trait;

use crate::errors::MarketError;
use crate::types::NormalizedQuote;

/// Abstraction over a market-data source.
///
/// Implementations return at most one quote per requested symbol and must
/// normalise symbols to upper case. Symbols the provider does not know are
/// omitted rather than reported as errors.
#[async_trait]
pub trait MarketDataProvider: Send + Sync + 'static {
    async fn get_market_data(&self, symbols: &[String]) -> Result<Vec<NormalizedQuote>, MarketError>;
}
