use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::normalize::normalize_symbol;
use crate::types::NormalizedQuote;

/// One row of `GET /coins/markets`. Numeric fields are nullable upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub id: String,
    pub symbol: String,
    pub name: String,

    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,

    pub last_updated: Option<DateTime<Utc>>,
}

impl MarketRow {
    /// Renames provider fields into a `NormalizedQuote`. Rows without a
    /// price or with a blank symbol carry no usable data.
    pub fn normalize(&self) -> Option<NormalizedQuote> {
        let symbol = normalize_symbol(&self.symbol)?;
        let price_usd = self.current_price?;

        Some(NormalizedQuote {
            symbol,
            name: self.name.clone(),
            price_usd,
            volume_24h_usd: self.total_volume.unwrap_or(0.0),
            market_cap_usd: self.market_cap.unwrap_or(0.0),
            change_24h_pct: self.price_change_percentage_24h.unwrap_or(0.0),
            last_updated: self.last_updated,
        })
    }
}

/// Converts raw rows into one quote per requested symbol, in request order.
///
/// CoinGecko returns every coin sharing a ticker; the one with the largest
/// market cap wins.
pub fn quotes_from_rows(rows: &[MarketRow], requested: &[String]) -> Vec<NormalizedQuote> {
    let mut out = Vec::with_capacity(requested.len());

    for want in requested {
        let best = rows
            .iter()
            .filter_map(MarketRow::normalize)
            .filter(|q| q.symbol == *want)
            .max_by(|a, b| a.market_cap_usd.total_cmp(&b.market_cap_usd));

        if let Some(q) = best {
            out.push(q);
        }
    }

    out
}
