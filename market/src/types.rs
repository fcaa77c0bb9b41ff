use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-agnostic quote for one asset, priced in USD.
///
/// Produced by every `MarketDataProvider`; consumed by the AI insight
/// fetcher, the portfolio valuation and the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuote {
    /// Upper-case ticker, e.g. `ETH`.
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub volume_24h_usd: f64,
    pub market_cap_usd: f64,
    /// Percent change over the last 24h (`-2.5` = down 2.5%).
    pub change_24h_pct: f64,
    /// Provider-side timestamp of the quote, when reported.
    pub last_updated: Option<DateTime<Utc>>,
}

impl NormalizedQuote {
    /// Whether the 24h move exceeds `threshold_pct` in either direction.
    pub fn is_volatile(&self, threshold_pct: f64) -> bool {
        self.change_24h_pct.abs() >= threshold_pct
    }
}

/// Looks up the quote for `symbol` (case-insensitive).
pub fn find_quote<'a>(quotes: &'a [NormalizedQuote], symbol: &str) -> Option<&'a NormalizedQuote> {
    quotes
        .iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(symbol.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, change: f64) -> NormalizedQuote {
        NormalizedQuote {
            symbol: symbol.into(),
            name: symbol.into(),
            price_usd: 1.0,
            volume_24h_usd: 0.0,
            market_cap_usd: 0.0,
            change_24h_pct: change,
            last_updated: None,
        }
    }

    #[test]
    fn find_quote_ignores_case_and_whitespace() {
        let quotes = vec![quote("ETH", 0.0), quote("BTC", 0.0)];

        assert_eq!(find_quote(&quotes, " eth ").map(|q| q.symbol.as_str()), Some("ETH"));
        assert!(find_quote(&quotes, "SOL").is_none());
    }

    #[test]
    fn volatility_is_symmetric() {
        assert!(quote("ETH", -6.0).is_volatile(5.0));
        assert!(quote("ETH", 5.0).is_volatile(5.0));
        assert!(!quote("ETH", 4.9).is_volatile(5.0));
    }
}
