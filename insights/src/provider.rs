use async_trait::async_trait;
use market::NormalizedQuote;

use crate::errors::InsightError;
use crate::types::MarketInsight;

/// Produces one structured insight from the current market snapshot.
#[async_trait]
pub trait InsightProvider: Send + Sync + 'static {
    async fn analyze_market(&self, quotes: &[NormalizedQuote]) -> Result<MarketInsight, InsightError>;
}
