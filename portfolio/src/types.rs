use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One asset line of the portfolio card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPosition {
    pub symbol: String,
    pub amount: f64,
    /// `None` when the market provider had no quote for the symbol.
    pub price_usd: Option<f64>,
    pub value_usd: f64,
    pub change_24h_pct: f64,
    /// Share of `total_value_usd`, in percent.
    pub allocation_pct: f64,
}

/// Current holdings valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value_usd: f64,
    /// Sorted by value, largest first.
    pub assets: Vec<AssetPosition>,
    pub valued_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// Value-weighted 24h change of the priced positions.
    pub fn change_24h_pct(&self) -> f64 {
        if self.total_value_usd <= 0.0 {
            return 0.0;
        }
        self.assets
            .iter()
            .map(|a| a.value_usd * a.change_24h_pct)
            .sum::<f64>()
            / self.total_value_usd
    }

    pub fn unpriced(&self) -> impl Iterator<Item = &AssetPosition> {
        self.assets.iter().filter(|a| a.price_usd.is_none())
    }
}
