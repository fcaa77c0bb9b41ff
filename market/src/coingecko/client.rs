use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::coingecko::types::{MarketRow, quotes_from_rows};
use crate::errors::MarketError;
use crate::normalize::normalize_symbols;
use crate::provider::MarketDataProvider;
use crate::types::NormalizedQuote;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(url: String, api_key: Option<String>) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `/coins/markets` URL for the given (already normalised) symbols.
    pub fn markets_url(&self, symbols: &[String]) -> String {
        let list = symbols
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/coins/markets?vs_currency=usd&symbols={}&price_change_percentage=24h",
            self.url, list
        )
    }

    #[instrument(skip(self), fields(count = symbols.len()), level = "debug")]
    async fn fetch_rows(&self, symbols: &[String]) -> Result<Vec<MarketRow>, MarketError> {
        let url = self.markets_url(symbols);

        let mut req = self.http.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req.send().await?.error_for_status()?;
        let rows: Vec<MarketRow> = resp.json().await?;

        debug!(rows = rows.len(), "coingecko markets fetched");

        Ok(rows)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn get_market_data(&self, symbols: &[String]) -> Result<Vec<NormalizedQuote>, MarketError> {
        let wanted = normalize_symbols(symbols);
        if wanted.is_empty() {
            return Err(MarketError::NoSymbols);
        }

        let rows = self.fetch_rows(&wanted).await?;
        if rows.is_empty() {
            return Err(MarketError::InvalidResponse(
                "no market rows for requested symbols".into(),
            ));
        }

        Ok(quotes_from_rows(&rows, &wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markets_url_lowercases_symbols_and_trims_base() {
        let client = CoinGeckoClient::new("https://example.test/api/v3/".into(), None)
            .expect("client builds");

        let url = client.markets_url(&["ETH".to_string(), "BTC".to_string()]);

        assert_eq!(
            url,
            "https://example.test/api/v3/coins/markets?vs_currency=usd&symbols=eth,btc&price_change_percentage=24h"
        );
    }

    #[tokio::test]
    async fn empty_watch_list_fails_without_network() {
        let client = CoinGeckoClient::new(DEFAULT_BASE_URL.into(), None).expect("client builds");

        let err = client
            .get_market_data(&["  ".to_string()])
            .await
            .expect_err("blank symbols rejected");

        assert!(matches!(err, MarketError::NoSymbols));
    }
}
